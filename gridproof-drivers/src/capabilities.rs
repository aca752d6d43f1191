use gridproof_common::BrowserKind;
use serde_json::json;
use webdriver::capabilities::Capabilities;

/// How to launch the browser behind a WebDriver session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub browser: BrowserKind,
    pub headless: bool,
    /// Initial window size in CSS pixels.
    pub window: (u32, u32),
    /// Appended verbatim after the built-in arguments.
    pub extra_args: Vec<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            headless: true,
            window: (1280, 900),
            extra_args: Vec::new(),
        }
    }
}

/// Construct browser command-line arguments for the session.
pub fn build_browser_arguments(options: &SessionOptions) -> Vec<String> {
    let (width, height) = options.window;
    let mut args = match options.browser {
        BrowserKind::Chrome => {
            let mut args = vec![
                "--disable-dev-shm-usage".to_string(),
                "--no-sandbox".to_string(),
                "--disable-extensions".to_string(),
                "--disable-infobars".to_string(),
                // local documents load sibling scripts over file://
                "--allow-file-access-from-files".to_string(),
                format!("--window-size={width},{height}"),
            ];
            if options.headless {
                args.push("--headless=new".to_string());
                args.push("--disable-gpu".to_string());
                args.push("--hide-scrollbars".to_string());
            }
            args
        }
        BrowserKind::Firefox => {
            let mut args = vec![format!("--width={width}"), format!("--height={height}")];
            if options.headless {
                args.push("-headless".to_string());
            }
            args
        }
    };
    args.extend(options.extra_args.iter().cloned());
    args
}

/// W3C capabilities for a new session.
pub fn build_capabilities(options: &SessionOptions) -> Capabilities {
    let mut caps = Capabilities::new();
    let args = build_browser_arguments(options);
    match options.browser {
        BrowserKind::Chrome => {
            caps.insert("browserName".to_string(), json!("chrome"));
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
        BrowserKind::Firefox => {
            caps.insert("browserName".to_string(), json!("firefox"));
            caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
        }
    }
    caps
}
