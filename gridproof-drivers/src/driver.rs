use async_trait::async_trait;
use gridproof_common::wait::WaitConfig;
use gridproof_common::Result;
use url::Url;

use crate::target::Target;

/// Browser capability the verification flow runs against.
///
/// Every element-addressing call takes a [`Target`] and resolves it anew, so
/// implementations never hand out element handles that could go stale after
/// the page re-renders.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Load `url` in the current browsing context.
    async fn navigate(&self, url: &Url) -> Result<()>;

    /// Wait for the first displayed match of `target` and click it.
    ///
    /// Fails with `ElementNotFound` when nothing displayed matches within `wait`.
    async fn click(&self, target: &Target, wait: WaitConfig) -> Result<()>;

    /// Wait for the control matched by `target` and select the option whose
    /// visible text or `value` equals `option`.
    ///
    /// Fails with `ElementNotFound` when the control never appears and with
    /// `OptionNotFound` when it appears without the option.
    async fn select_option(&self, target: &Target, option: &str, wait: WaitConfig) -> Result<()>;

    /// Read the `value` property of the first match without waiting.
    ///
    /// Returns `Ok(None)` when nothing matches yet.
    async fn read_value(&self, target: &Target) -> Result<Option<String>>;

    /// Capture the whole document as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// End the browser session. Further calls are invalid.
    async fn close(&self) -> Result<()>;
}
