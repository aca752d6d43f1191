//! Driver layer for browser automation.
//!
//! This crate exposes the browser capability the verification flow is
//! written against, and a WebDriver implementation of it.
//!
//! - [`BrowserDriver`]: navigate, click, select, probe values, capture screenshots
//! - [`Target`]: role / label / CSS element descriptors, compiled to locators
//! - [`WebDriverSession`]: `fantoccini` client wrapper (chromedriver or geckodriver)
//! - [`capabilities`]: session capabilities and browser arguments
pub mod capabilities;
pub mod driver;
pub mod session;
pub mod target;

pub use capabilities::SessionOptions;
pub use driver::BrowserDriver;
pub use session::WebDriverSession;
pub use target::Target;
