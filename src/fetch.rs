//! Listing page retrieval.
//!
//! # Architecture
//!
//! - [`PageFetcher`]: fetch one URL, return the rendered HTML
//! - [`ChromeFetcher`]: renders pages in a headless Chrome session that lives
//!   for the whole run
//! - [`HttpFetcher`]: plain GET, for listings that are rendered server side
//! - [`RetryFetch`]: decorator adding a small, bounded number of retries to
//!   any fetcher
//!
//! The Chrome session is held by [`BrowserSession`]; dropping it shuts the
//! browser down, and every tab is closed by a guard whether the page loaded,
//! timed out, or failed.

use crate::config::{BrowserConfig, Config, FetcherKind};
use crate::error::FetchError;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::{Rng, rng};
use std::ffi::OsStr;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Retrieves the HTML of a listing page.
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// A running headless Chrome, shut down on drop.
pub struct BrowserSession {
    browser: Arc<Browser>,
}

impl BrowserSession {
    #[instrument(level = "info", skip_all, fields(headless = config.headless))]
    pub fn launch(config: &BrowserConfig) -> Result<Self, FetchError> {
        let args = vec![
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-dev-shm-usage"),
        ];
        // Chrome exits on its own if the session sits idle past one full page budget.
        let idle = Duration::from_secs(config.page_load_timeout_secs + config.render_wait_secs + 60);

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .path(config.chrome_path.clone())
            .idle_browser_timeout(idle)
            .args(args)
            .build()
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| FetchError::Launch(e.to_string()))?;
        info!("Browser session started");
        Ok(Self {
            browser: Arc::new(browser),
        })
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        info!("Closing browser session");
    }
}

impl fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserSession").finish_non_exhaustive()
    }
}

/// The tab operations a page render needs.
trait BrowserTab {
    fn apply_user_agent(&self, user_agent: &str) -> anyhow::Result<()>;
    fn load(&self, url: &str) -> anyhow::Result<()>;
    fn await_selector(&self, selector: &str, timeout: Duration) -> anyhow::Result<()>;
    fn html(&self) -> anyhow::Result<String>;
    fn close_tab(&self) -> anyhow::Result<()>;
}

impl BrowserTab for Tab {
    fn apply_user_agent(&self, user_agent: &str) -> anyhow::Result<()> {
        self.set_user_agent(user_agent, None, None)
    }

    fn load(&self, url: &str) -> anyhow::Result<()> {
        self.navigate_to(url)?.wait_until_navigated()?;
        Ok(())
    }

    fn await_selector(&self, selector: &str, timeout: Duration) -> anyhow::Result<()> {
        self.wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
    }

    fn html(&self) -> anyhow::Result<String> {
        self.get_content()
    }

    fn close_tab(&self) -> anyhow::Result<()> {
        self.close(false).map(|_| ())
    }
}

/// Closes its tab when dropped.
struct TabGuard<T: BrowserTab>(Arc<T>);

impl<T: BrowserTab> Drop for TabGuard<T> {
    fn drop(&mut self) {
        if let Err(e) = self.0.close_tab() {
            warn!(error = %e, "Failed to close browser tab");
        }
    }
}

/// Renders listing pages in a shared headless Chrome session.
#[derive(Debug)]
pub struct ChromeFetcher {
    session: BrowserSession,
    page_load_timeout: Duration,
    render_wait: Duration,
    user_agent: String,
    ready_selector: String,
}

impl ChromeFetcher {
    /// Launch Chrome. `ready_selector` is waited for after navigation so
    /// that script-built teaser lists are in the DOM before it is read.
    pub fn launch(config: &BrowserConfig, ready_selector: &str) -> Result<Self, FetchError> {
        Ok(Self {
            session: BrowserSession::launch(config)?,
            page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
            render_wait: Duration::from_secs(config.render_wait_secs),
            user_agent: config.user_agent.clone(),
            ready_selector: ready_selector.to_string(),
        })
    }
}

impl PageFetcher for ChromeFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let browser = Arc::clone(&self.session.browser);
        let url = url.to_string();
        let page_load_timeout = self.page_load_timeout;
        let render_wait = self.render_wait;
        let user_agent = self.user_agent.clone();
        let ready_selector = self.ready_selector.clone();

        // The DevTools client blocks; keep it off the async workers.
        tokio::task::spawn_blocking(move || {
            render(
                &browser,
                &url,
                page_load_timeout,
                render_wait,
                &user_agent,
                &ready_selector,
            )
        })
        .await?
    }
}

fn render(
    browser: &Browser,
    url: &str,
    page_load_timeout: Duration,
    render_wait: Duration,
    user_agent: &str,
    ready_selector: &str,
) -> Result<String, FetchError> {
    let tab = browser.new_tab().map_err(|e| FetchError::Navigation {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    tab.set_default_timeout(page_load_timeout);
    render_in(TabGuard(tab), url, render_wait, user_agent, ready_selector)
}

/// Load `url` in `tab` and read back the rendered DOM. The tab is closed
/// when this returns, whatever the outcome.
fn render_in<T: BrowserTab>(
    tab: TabGuard<T>,
    url: &str,
    render_wait: Duration,
    user_agent: &str,
    ready_selector: &str,
) -> Result<String, FetchError> {
    let navigation = |e: anyhow::Error| FetchError::Navigation {
        url: url.to_string(),
        reason: e.to_string(),
    };

    let t0 = Instant::now();
    tab.0.apply_user_agent(user_agent).map_err(navigation)?;
    tab.0.load(url).map_err(navigation)?;
    tab.0
        .await_selector(ready_selector, render_wait)
        .map_err(|_| FetchError::Timeout {
            url: url.to_string(),
        })?;

    let html = tab.0.html().map_err(navigation)?;
    debug!(
        bytes = html.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Rendered page"
    );
    Ok(html)
}

/// Fetches listing pages with a plain HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &BrowserConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.page_load_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(bytes = html.len(), "Fetched page");
        Ok(html)
    }
}

/// Whichever fetcher the configuration asks for.
#[derive(Debug)]
pub enum AnyFetcher {
    Chrome(ChromeFetcher),
    Http(HttpFetcher),
}

impl AnyFetcher {
    /// Build the configured fetcher wrapped in the configured retry policy.
    pub fn from_config(config: &Config, ready_selector: &str) -> Result<RetryFetch<Self>, FetchError> {
        let inner = match config.fetcher {
            FetcherKind::Chrome => Self::Chrome(ChromeFetcher::launch(&config.browser, ready_selector)?),
            FetcherKind::Http => Self::Http(HttpFetcher::new(&config.browser)?),
        };
        Ok(RetryFetch::new(
            inner,
            config.retry.attempts,
            Duration::from_millis(config.retry.base_delay_ms),
        ))
    }
}

impl PageFetcher for AnyFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        match self {
            Self::Chrome(f) => f.fetch(url).await,
            Self::Http(f) => f.fetch(url).await,
        }
    }
}

/// Adds bounded retries with exponential backoff and jitter to a fetcher.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    /// Total tries, including the first.
    attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl<T> RetryFetch<T>
where
    T: PageFetcher,
{
    pub fn new(inner: T, attempts: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(10),
            max_jitter: Duration::from_millis(250),
        }
    }

    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("attempts", &self.attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PageFetcher for RetryFetch<T>
where
    T: PageFetcher,
{
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            match self.inner.fetch(url).await {
                Ok(html) => return Ok(html),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt >= self.attempts {
                        error!(
                            attempt,
                            max = self.attempts,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch exhausted attempts"
                        );
                        return Err(e);
                    }

                    let delay = self
                        .base_delay
                        .saturating_mul(1 << (attempt - 1))
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.attempts,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
