// spider_chrome re-exports chromiumoxide API
use crate::error::{HelperError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use chromiumoxide_fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOAD_EVENT_TIMEOUT: Duration = Duration::from_secs(30);

/// A live Chrome session driving one page of the target application.
///
/// Owns the browser connection plus the throwaway profile directory used by
/// launched (non-attached) instances. The profile directory is removed when
/// the session is dropped.
pub struct ChromeSession {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for the Chrome session
pub enum ConnectionMode {
    /// Launch a Chrome instance with its own profile directory
    Launch {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Attach to an existing Chrome on a remote-debugging port
    DebugPort(u16),
}

impl ChromeSession {
    /// Launch Chrome with settings appropriate for the current environment.
    ///
    /// CI environments get `--no-sandbox` and headless mode; everywhere else
    /// a headed browser comes up so a failing flow can be watched.
    pub async fn launch_auto() -> Result<Self> {
        let is_ci = std::env::var("CI").is_ok()
            || std::env::var("GITHUB_ACTIONS").is_ok()
            || std::env::var("GITLAB_CI").is_ok()
            || std::env::var("JENKINS_HOME").is_ok()
            || std::env::var("CIRCLECI").is_ok();

        Self::new(ConnectionMode::Launch {
            chrome_path: None,
            no_sandbox: is_ci,
            headless: is_ci,
        })
        .await
    }

    /// Launch a headless Chrome with `--no-sandbox`
    pub async fn launch_headless() -> Result<Self> {
        Self::new(ConnectionMode::Launch {
            chrome_path: None,
            no_sandbox: true,
            headless: true,
        })
        .await
    }

    /// Attach to an existing Chrome on a debug port
    pub async fn connect_debug_port(port: u16) -> Result<Self> {
        Self::new(ConnectionMode::DebugPort(port)).await
    }

    /// Create a new session with the given connection mode
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Launch {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile directory so parallel sessions never share
                // state; nanosecond timestamp avoids collisions across threads
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map_err(|e| HelperError::LaunchFailed(e.to_string()))?
                    .as_nanos();
                let temp_dir = std::env::temp_dir().join(format!("tutor-helper-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    HelperError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };
                config = config.user_data_dir(&temp_dir).window_size(1300, 768);

                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }

                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                } else {
                    // Fall back to a cached Chrome for Testing download; if
                    // that fails let chromiumoxide probe for a system install
                    match Self::ensure_chrome_installed().await {
                        Ok(path) => {
                            config = config.chrome_executable(path);
                        }
                        Err(e) => {
                            log::warn!("Chrome auto-download failed ({}), trying system Chrome", e);
                        }
                    }
                }

                let built = config
                    .build()
                    .map_err(|e| HelperError::LaunchFailed(format!("{}. Chrome not found; install Chrome or pass --chrome-path", e)))?;
                let (browser, mut handler) = Browser::launch(built).await.map_err(|e| {
                    HelperError::LaunchFailed(format!(
                        "{}. Chrome not found; install Chrome or pass --chrome-path \
                         (Linux sandbox issue? try --no-sandbox)",
                        e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Drain browser events
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    HelperError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                         Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Drain browser events
                    }
                });

                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// The current active page, excluding Chrome's own chrome:// pages.
    /// Creates a blank page when the browser has none.
    pub async fn page(&self) -> Result<Page> {
        let pages = self.browser.pages().await?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| HelperError::Other(format!("Failed to create page: {}", e)))
    }

    /// Navigate to a URL and wait for the page load event.
    ///
    /// Scheme-less URLs are normalized to https, matching how test site
    /// addresses come out of the environment.
    pub async fn goto(&self, url: &str) -> Result<()> {
        use chromiumoxide::cdp::browser_protocol::page::{EventLoadEventFired, NavigateParams};

        let normalized_url = if !url.starts_with("http://")
            && !url.starts_with("https://")
            && !url.starts_with("file://")
            && !url.starts_with("about:")
            && !url.starts_with("data:")
        {
            format!("https://{}", url)
        } else {
            url.to_string()
        };

        log::debug!("Navigating to {}", normalized_url);

        // Work against a single page: close any extras so element lookups
        // cannot land in a stale tab
        let mut pages = self.browser.pages().await?;
        for (i, p) in pages.iter().enumerate() {
            if i > 0 {
                let _ = p
                    .execute(
                        chromiumoxide::cdp::browser_protocol::target::CloseTargetParams::new(
                            p.target_id().clone(),
                        ),
                    )
                    .await;
            }
        }
        pages = self.browser.pages().await?;

        let page = if let Some(page) = pages.first() {
            page.clone()
        } else {
            self.browser
                .new_page("about:blank")
                .await
                .map_err(|e| HelperError::NavigationFailed(e.to_string()))?
        };

        // Register the load listener before issuing the navigation so a fast
        // load cannot slip past it
        let mut load_events = page
            .event_listener::<EventLoadEventFired>()
            .await
            .map_err(|e| HelperError::NavigationFailed(e.to_string()))?;

        let params = NavigateParams::builder()
            .url(&normalized_url)
            .build()
            .map_err(|e| {
                HelperError::NavigationFailed(format!("Invalid URL {}: {}", normalized_url, e))
            })?;

        let response = page.execute(params).await.map_err(|e| {
            let error_str = e.to_string();
            if error_str.contains("oneshot canceled") {
                HelperError::NavigationFailed(
                    "Browser connection lost; the browser may have been closed or crashed"
                        .to_string(),
                )
            } else {
                HelperError::NavigationFailed(format!(
                    "Failed to navigate to {}: {}",
                    normalized_url, e
                ))
            }
        })?;

        if let Some(error_text) = response.result.error_text.clone() {
            return Err(HelperError::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        match tokio::time::timeout(LOAD_EVENT_TIMEOUT, load_events.next()).await {
            Ok(Some(_)) => log::debug!("Load event fired for {}", normalized_url),
            Ok(None) => log::debug!("Load event stream closed for {}", normalized_url),
            Err(_) => {
                return Err(HelperError::NavigationFailed(format!(
                    "Timed out waiting for {} to load",
                    normalized_url
                )));
            }
        }

        // Small settle delay for client-side rendering to catch up
        tokio::time::sleep(Duration::from_millis(500)).await;

        Ok(())
    }

    /// Get current URL
    pub async fn current_url(&self) -> Result<String> {
        let page = self.page().await?;
        let url = page
            .url()
            .await
            .map_err(|e| HelperError::Other(e.to_string()))?
            .ok_or(HelperError::NoPage)?;
        Ok(url)
    }

    /// Get page title
    pub async fn title(&self) -> Result<String> {
        let page = self.page().await?;
        let title = page
            .get_title()
            .await
            .map_err(|e| HelperError::Other(e.to_string()))?
            .ok_or(HelperError::NoPage)?;
        Ok(title)
    }

    /// Get page HTML source
    pub async fn page_source(&self) -> Result<String> {
        let page = self.page().await?;
        page.content()
            .await
            .map_err(|e| HelperError::Other(e.to_string()))
    }

    /// Execute JavaScript in the page context, discarding type information
    pub async fn execute_script(&self, script: &str) -> Result<serde_json::Value> {
        let page = self.page().await?;
        let result = page
            .evaluate(script)
            .await
            .map_err(|e| HelperError::Other(format!("Script execution failed: {}", e)))?;
        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    /// Execute JavaScript and deserialize the result
    pub async fn execute_script_typed<T: serde::de::DeserializeOwned>(
        &self,
        script: &str,
    ) -> Result<T> {
        let page = self.page().await?;
        let result = page
            .evaluate(script)
            .await
            .map_err(|e| HelperError::Other(format!("Script execution failed: {}", e)))?;
        result
            .into_value()
            .map_err(|e| HelperError::Other(format!("Failed to deserialize result: {}", e)))
    }

    /// Take a screenshot and save it, for post-mortem inspection of a failed flow
    pub async fn screenshot_to_file(&self, path: &Path) -> Result<()> {
        let page = self.page().await?;
        let data = page
            .screenshot(chromiumoxide::page::ScreenshotParams::default())
            .await
            .map_err(|e| HelperError::Other(format!("Failed to take screenshot: {}", e)))?;
        tokio::fs::write(path, data)
            .await
            .map_err(|e| HelperError::Other(format!("Failed to write screenshot: {}", e)))?;
        Ok(())
    }

    /// Resize the browser window
    pub async fn set_window_size(&self, width: u32, height: u32) -> Result<()> {
        use chromiumoxide::cdp::browser_protocol::browser::{
            Bounds, GetWindowForTargetParams, SetWindowBoundsParams, WindowState,
        };

        let page = self.page().await?;
        let target_id = page.target_id();

        let window_result = page
            .execute(GetWindowForTargetParams {
                target_id: Some(target_id.clone()),
            })
            .await
            .map_err(|e| HelperError::Other(format!("Failed to get window: {}", e)))?;

        let bounds = Bounds {
            left: None,
            top: None,
            width: Some(width as i64),
            height: Some(height as i64),
            window_state: Some(WindowState::Normal),
        };

        page.execute(SetWindowBoundsParams {
            window_id: window_result.window_id,
            bounds,
        })
        .await
        .map_err(|e| HelperError::Other(format!("Failed to set window bounds: {}", e)))?;

        Ok(())
    }

    /// Viewport width in CSS pixels, for the condensed-layout branches
    pub async fn window_width(&self) -> Result<u32> {
        self.execute_script_typed("window.innerWidth").await
    }

    /// Check whether the browser is still alive and responsive
    pub async fn is_alive(&self) -> bool {
        match self.browser.pages().await {
            Ok(pages) => {
                if let Some(page) = pages.first() {
                    matches!(
                        tokio::time::timeout(Duration::from_secs(2), page.url()).await,
                        Ok(Ok(_))
                    )
                } else {
                    true
                }
            }
            Err(_) => false,
        }
    }

    /// Close the browser connection
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| HelperError::Other(e.to_string()))?;
        Ok(())
    }

    /// Ensure Chrome is installed, downloading Chrome for Testing if necessary
    async fn ensure_chrome_installed() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| HelperError::Other("Cannot determine cache directory".to_string()))?
            .join("tutor-helper")
            .join("chrome");

        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| HelperError::Other(format!("Failed to create cache dir: {}", e)))?;

        let marker_path = cache_dir.join(".downloaded");
        if marker_path.exists() {
            if let Some(executable) = Self::find_chrome_in_cache(&cache_dir).await {
                return Ok(executable);
            }
        }

        log::info!("Downloading Chrome for Testing (first run only, ~150MB)");
        let fetcher = BrowserFetcher::new(
            BrowserFetcherOptions::builder()
                .with_path(&cache_dir)
                .build()
                .map_err(|e| HelperError::Other(format!("Fetcher config failed: {}", e)))?,
        );

        let info = fetcher
            .fetch()
            .await
            .map_err(|e| HelperError::Other(format!("Chrome download failed: {}", e)))?;

        tokio::fs::write(&marker_path, "downloaded")
            .await
            .map_err(|e| HelperError::Other(format!("Failed to write marker: {}", e)))?;

        Ok(info.executable_path)
    }

    /// Find the Chrome executable in the cache directory
    async fn find_chrome_in_cache(cache_dir: &Path) -> Option<PathBuf> {
        let possible_paths = vec![
            cache_dir.join("chrome"),
            cache_dir.join("chrome.exe"),
            cache_dir.join("Google Chrome.app/Contents/MacOS/Google Chrome"),
            cache_dir.join("chrome-linux/chrome"),
            cache_dir.join("chrome-mac/Chromium.app/Contents/MacOS/Chromium"),
            cache_dir.join("chrome-win/chrome.exe"),
        ];

        possible_paths.into_iter().find(|path| path.exists())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}
