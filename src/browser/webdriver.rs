use anyhow::{Result, Context};
use async_trait::async_trait;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::browser::engine::{PageSession, RenderEngine};
use crate::browser::fingerprint::Identity;
use crate::cli::config::BrowserSettings;
use crate::error::AttemptError;
use crate::extractor::document::{Document, RowCells};

/// Rendering engine backed by a WebDriver endpoint (chromedriver or a Selenium grid)
pub struct WebDriverEngine {
    /// Browser settings
    config: BrowserSettings,
}

impl WebDriverEngine {
    /// Connect to the WebDriver endpoint and verify a session can be created
    pub async fn start(config: BrowserSettings) -> Result<Self> {
        let engine = Self { config };

        let mut probe = engine.open_session().await
            .context(format!("Failed to start browser via WebDriver at {}", engine.config.webdriver_url))?;
        probe.close().await?;

        info!("Rendering engine ready at {}", engine.config.webdriver_url);
        Ok(engine)
    }

    fn capabilities(&self) -> Result<ChromeCapabilities> {
        let mut caps = DesiredCapabilities::chrome();

        // Fixed viewport
        caps.add_chrome_arg(&format!(
            "--window-size={},{}",
            self.config.viewport.width, self.config.viewport.height
        ))?;

        // Locale
        let lang = self.config.accept_language.split(',').next().unwrap_or("en-US");
        caps.add_chrome_arg(&format!("--lang={}", lang))?;

        if self.config.headless {
            caps.set_headless()?;
        }

        caps.add_chrome_arg("--no-sandbox")?;
        caps.add_chrome_arg("--disable-dev-shm-usage")?;
        caps.add_chrome_arg("--disable-blink-features=AutomationControlled")?;

        Ok(caps)
    }

    async fn open_session(&self) -> Result<WebDriverSession> {
        let caps = self.capabilities()?;

        let driver = WebDriver::new(&self.config.webdriver_url, caps).await
            .context("Failed to connect to WebDriver")?;

        debug!("Browser session opened");

        Ok(WebDriverSession {
            driver: Some(driver),
        })
    }
}

#[async_trait]
impl RenderEngine for WebDriverEngine {
    async fn acquire_session(&self) -> Result<Box<dyn PageSession>> {
        Ok(Box::new(self.open_session().await?))
    }

    async fn release_session(&self, mut session: Box<dyn PageSession>) -> Result<()> {
        session.close().await
    }
}

/// One WebDriver session, i.e. one browser page
pub struct WebDriverSession {
    /// WebDriver instance; taken on close
    driver: Option<WebDriver>,
}

impl WebDriverSession {
    fn driver(&self) -> Result<&WebDriver> {
        self.driver.as_ref()
            .context("Browser session already closed")
    }

    async fn first(&self, selector: &str) -> Result<Option<WebElement>> {
        let mut elements = self.driver()?.find_all(By::Css(selector)).await
            .context(format!("Failed to query: {}", selector))?;

        if elements.is_empty() {
            Ok(None)
        } else {
            Ok(Some(elements.swap_remove(0)))
        }
    }
}

async fn text_content(element: &WebElement) -> Result<String> {
    Ok(element.prop("textContent").await?.unwrap_or_default())
}

async fn first_text_within(element: &WebElement, selector: &str) -> Result<Option<String>> {
    let found = element.find_all(By::Css(selector)).await?;
    match found.first() {
        Some(child) => Ok(Some(text_content(child).await?)),
        None => Ok(None),
    }
}

#[async_trait]
impl Document for WebDriverSession {
    async fn text(&self, selector: &str) -> Result<Option<String>> {
        match self.first(selector).await? {
            Some(element) => Ok(Some(text_content(&element).await?)),
            None => Ok(None),
        }
    }

    async fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        match self.first(selector).await? {
            Some(element) => Ok(element.attr(name).await?),
            None => Ok(None),
        }
    }

    async fn all_texts(&self, selector: &str) -> Result<Vec<String>> {
        let elements = self.driver()?.find_all(By::Css(selector)).await?;

        let mut texts = Vec::with_capacity(elements.len());
        for element in &elements {
            texts.push(text_content(element).await?);
        }
        Ok(texts)
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.first(selector).await?.is_some())
    }

    async fn rows(&self, row: &str, key: &str, value: &str) -> Result<Vec<RowCells>> {
        let elements = self.driver()?.find_all(By::Css(row)).await?;

        let mut rows = Vec::with_capacity(elements.len());
        for element in &elements {
            rows.push(RowCells {
                key: first_text_within(element, key).await?,
                value: first_text_within(element, value).await?,
                text: text_content(element).await?,
            });
        }
        Ok(rows)
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        match self.first(selector).await? {
            Some(element) => {
                element.click().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn scroll_viewport(&self) -> Result<()> {
        self.driver()?
            .execute("window.scrollBy(0, window.innerHeight);", Vec::new())
            .await
            .context("Failed to scroll")?;
        Ok(())
    }
}

#[async_trait]
impl PageSession for WebDriverSession {
    fn document(&self) -> &dyn Document {
        self
    }

    async fn apply_identity(&self, identity: &Identity) -> Result<(), AttemptError> {
        let driver = self.driver()
            .map_err(|e| AttemptError::SessionUnavailable(e.to_string()))?;

        let dev_tools = ChromeDevTools::new(driver.handle.clone());
        dev_tools
            .execute_cdp_with_params(
                "Network.setUserAgentOverride",
                serde_json::json!({
                    "userAgent": identity.user_agent,
                    "acceptLanguage": identity.accept_language,
                }),
            )
            .await
            .map_err(|e| AttemptError::Identity(e.to_string()))?;

        Ok(())
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AttemptError> {
        let driver = self.driver()
            .map_err(|e| AttemptError::SessionUnavailable(e.to_string()))?;

        driver.set_page_load_timeout(timeout).await
            .map_err(|e| AttemptError::SessionUnavailable(e.to_string()))?;

        debug!("Navigating to: {}", url);
        let timed_out = || AttemptError::NavigationTimeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        };

        match tokio::time::timeout(timeout, driver.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.to_string().to_lowercase().contains("timeout") => Err(timed_out()),
            Ok(Err(e)) => Err(AttemptError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(timed_out()),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.quit().await {
                error!("Error closing browser session: {}", e);
            }
            debug!("Browser session closed");
        }

        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            // Spawn a task to quit the driver
            tokio::spawn(async move {
                if let Err(e) = driver.quit().await {
                    error!("Error closing browser session during drop: {}", e);
                }
            });
        }
    }
}
