use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder};
use gridproof_common::wait::{poll_until, WaitConfig};
use gridproof_common::{GridproofError, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::capabilities::{build_capabilities, SessionOptions};
use crate::driver::BrowserDriver;
use crate::target::{xpath_literal, Locator, Target};

/// Largest window edge we grow to for a full-page capture.
const MAX_CAPTURE_EDGE: u32 = 16_384;

const PAGE_METRICS_JS: &str = r#"
    const root = document.documentElement;
    const body = document.body || root;
    return {
        scroll_width: Math.ceil(Math.max(root.scrollWidth, body.scrollWidth)),
        scroll_height: Math.ceil(Math.max(root.scrollHeight, body.scrollHeight)),
        frame_width: Math.max(0, window.outerWidth - window.innerWidth),
        frame_height: Math.max(0, window.outerHeight - window.innerHeight)
    };
"#;

/// Document extent plus the browser frame around the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageMetrics {
    pub scroll_width: u32,
    pub scroll_height: u32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl PageMetrics {
    /// Window size that shows the whole document, never smaller than `current`.
    pub fn full_page_window(&self, current: (u32, u32)) -> (u32, u32) {
        let width = (self.scroll_width + self.frame_width)
            .max(current.0)
            .min(MAX_CAPTURE_EDGE);
        let height = (self.scroll_height + self.frame_height)
            .max(current.1)
            .min(MAX_CAPTURE_EDGE);
        (width, height)
    }
}

/// [`BrowserDriver`] backed by a `fantoccini` WebDriver client.
pub struct WebDriverSession {
    client: Client,
    options: SessionOptions,
}

impl WebDriverSession {
    /// Open a new session on a running WebDriver service (chromedriver
    /// defaults to `http://localhost:9515`, geckodriver to `:4444`).
    pub async fn connect(webdriver_url: &str, options: SessionOptions) -> Result<Self> {
        let caps = build_capabilities(&options);
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .map_err(|e| {
                GridproofError::Session(format!("cannot open session at {webdriver_url}: {e}"))
            })?;

        let (width, height) = options.window;
        if let Err(e) = client.set_window_size(width, height).await {
            warn!(target: "gridproof.driver", error = %e, "could not apply initial window size");
        }

        info!(
            target: "gridproof.driver",
            browser = %options.browser,
            headless = options.headless,
            %webdriver_url,
            "webdriver session opened"
        );
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// First displayed element matching `locator`, in document order.
    async fn find_displayed(&self, locator: &Locator) -> anyhow::Result<Option<Element>> {
        let elements = self.client.find_all(locator.as_fantoccini()).await?;
        for element in elements {
            // an element detached mid-probe counts as not displayed
            if element.is_displayed().await.unwrap_or(false) {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    async fn wait_for_displayed(&self, target: &Target, wait: WaitConfig) -> Result<Element> {
        let locator = target.locator();
        let locator = &locator;
        let found = poll_until(wait, || self.find_displayed(locator)).await?;
        found.ok_or_else(|| GridproofError::ElementNotFound {
            target: target.to_string(),
            timeout_ms: wait.timeout_ms(),
        })
    }

    async fn page_metrics(&self) -> anyhow::Result<PageMetrics> {
        let raw = self.client.execute(PAGE_METRICS_JS, vec![]).await?;
        serde_json::from_value(raw).context("unexpected page metrics shape")
    }
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    async fn navigate(&self, url: &Url) -> Result<()> {
        debug!(target: "gridproof.driver", %url, "navigating");
        self.client
            .goto(url.as_str())
            .await
            .map_err(|e| GridproofError::Navigation(format!("{url}: {e}")))
    }

    async fn click(&self, target: &Target, wait: WaitConfig) -> Result<()> {
        let element = self.wait_for_displayed(target, wait).await?;
        debug!(target: "gridproof.driver", element = %target, "clicking");
        element
            .click()
            .await
            .with_context(|| format!("click on {target} failed"))?;
        Ok(())
    }

    async fn select_option(&self, target: &Target, option: &str, wait: WaitConfig) -> Result<()> {
        let locator = target.locator();
        let option_lit = xpath_literal(option);
        let option_xpath =
            format!(".//option[normalize-space(.)={option_lit} or @value={option_lit}]");
        let saw_control = AtomicBool::new(false);
        let (locator, option_xpath, saw) = (&locator, &option_xpath, &saw_control);

        let found = poll_until(wait, || async move {
            let Some(control) = self.find_displayed(locator).await? else {
                return Ok::<_, anyhow::Error>(None);
            };
            saw.store(true, Ordering::Relaxed);
            let options = control
                .find_all(fantoccini::Locator::XPath(option_xpath))
                .await?;
            Ok(options.into_iter().next())
        })
        .await?;

        let Some(option_element) = found else {
            return Err(if saw_control.load(Ordering::Relaxed) {
                GridproofError::OptionNotFound {
                    target: target.to_string(),
                    option: option.to_string(),
                }
            } else {
                GridproofError::ElementNotFound {
                    target: target.to_string(),
                    timeout_ms: wait.timeout_ms(),
                }
            });
        };

        debug!(target: "gridproof.driver", element = %target, option, "selecting option");
        option_element
            .click()
            .await
            .with_context(|| format!("selecting {option:?} in {target} failed"))?;
        Ok(())
    }

    async fn read_value(&self, target: &Target) -> Result<Option<String>> {
        let elements = self
            .client
            .find_all(target.locator().as_fantoccini())
            .await
            .with_context(|| format!("lookup of {target} failed"))?;
        let Some(element) = elements.into_iter().next() else {
            return Ok(None);
        };
        match element.prop("value").await {
            Ok(value) => Ok(Some(value.unwrap_or_default())),
            Err(e) => {
                // the board re-renders while a puzzle is generated
                debug!(target: "gridproof.driver", element = %target, error = %e, "value probe failed");
                Ok(None)
            }
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let (cur_w, cur_h) = self
            .client
            .get_window_size()
            .await
            .context("reading window size failed")?;
        let current = (
            u32::try_from(cur_w).unwrap_or(u32::MAX),
            u32::try_from(cur_h).unwrap_or(u32::MAX),
        );
        let metrics = self.page_metrics().await?;
        let wanted = metrics.full_page_window(current);
        let resized = wanted != current;

        if resized {
            debug!(
                target: "gridproof.driver",
                width = wanted.0,
                height = wanted.1,
                "growing window for full-page capture"
            );
            self.client
                .set_window_size(wanted.0, wanted.1)
                .await
                .context("resizing window for capture failed")?;
        }

        let png = self.client.screenshot().await.context("screenshot failed");

        if resized {
            if let Err(e) = self.client.set_window_size(current.0, current.1).await {
                warn!(target: "gridproof.driver", error = %e, "could not restore window size");
            }
        }
        Ok(png?)
    }

    async fn close(&self) -> Result<()> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| GridproofError::Session(format!("closing session failed: {e}")))
    }
}
