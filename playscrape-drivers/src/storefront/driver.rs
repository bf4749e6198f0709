use crate::storefront::page::StorefrontPage;
use crate::storefront::url::storefront_url;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fantoccini::ClientBuilder;
use playscrape_common::{AppTarget, SessionFailure, SessionOp};
use playscrape_reviews::{Navigator, SessionOpener};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use webdriver::capabilities::Capabilities;

const READY_POLL: Duration = Duration::from_millis(100);

/// A chromedriver process owned by the crawler. Killed on drop.
pub struct ChromeDriverService {
    child: Child,
    port: u16,
}

impl ChromeDriverService {
    /// Spawn the driver binary at `location` on `port` and wait until it
    /// accepts connections.
    pub async fn start(location: &Path, port: u16, startup_timeout: Duration) -> Result<Self> {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Err(anyhow!("port {port} is already in use; pick another driver.port"));
        }
        let child = Command::new(location)
            .arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to launch webdriver at {}", location.display()))?;
        let mut service = Self { child, port };
        service.wait_until_ready(startup_timeout).await?;
        info!(target: "drivers", port, location = %location.display(), "webdriver.started");
        Ok(service)
    }

    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Err(anyhow!("webdriver exited during startup: {status}"));
            }
            if TcpStream::connect(("127.0.0.1", self.port)).await.is_ok() {
                // The listener only counts if our child is still the one alive.
                tokio::time::sleep(READY_POLL).await;
                if let Some(status) = self.child.try_wait()? {
                    return Err(anyhow!(
                        "webdriver exited during startup: {status}; port {} is held by another process",
                        self.port
                    ));
                }
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(anyhow!(
                    "webdriver did not listen on port {} within {:?}",
                    self.port,
                    timeout
                ));
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    /// Terminate the process and reap it.
    pub async fn stop(mut self) -> Result<()> {
        self.child.kill().await?;
        debug!(target: "drivers", port = self.port, "webdriver.stopped");
        Ok(())
    }
}

/// Opens a fresh, visible Chrome session per app.
pub struct PlayDriver {
    webdriver_url: String,
    navigation_delay: Duration,
    service: Option<ChromeDriverService>,
}

impl PlayDriver {
    /// Launch the webdriver binary and build a driver on top of it.
    pub async fn launch(
        location: &Path,
        port: u16,
        startup_timeout: Duration,
        navigation_delay: Duration,
    ) -> Result<Self> {
        let service = ChromeDriverService::start(location, port, startup_timeout).await?;
        Ok(Self {
            webdriver_url: service.url(),
            navigation_delay,
            service: Some(service),
        })
    }

    /// Use a webdriver that is already running at `webdriver_url`.
    pub fn attach(webdriver_url: impl Into<String>, navigation_delay: Duration) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            navigation_delay,
            service: None,
        }
    }

    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }

    /// Stop the owned webdriver process, if any.
    pub async fn shutdown(self) -> Result<()> {
        match self.service {
            Some(service) => service.stop().await,
            None => Ok(()),
        }
    }
}

/// Chrome arguments for a visible session that renders English storefront text.
pub fn chrome_arguments() -> Vec<String> {
    vec![
        "--lang=en-US".to_string(),
        "--window-size=1366,900".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-notifications".to_string(),
        "--no-first-run".to_string(),
    ]
}

fn capabilities() -> Capabilities {
    let mut caps = Capabilities::new();
    let mut chrome_opts = HashMap::new();
    chrome_opts.insert("args".to_string(), json!(chrome_arguments()));
    chrome_opts.insert(
        "prefs".to_string(),
        json!({ "intl.accept_languages": "en-US,en" }),
    );
    caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));
    caps
}

#[async_trait]
impl SessionOpener for PlayDriver {
    type Session = StorefrontPage;

    async fn open(&self, target: &AppTarget) -> Result<StorefrontPage, SessionFailure> {
        let url = storefront_url(target).map_err(|e| SessionFailure::new(SessionOp::Navigate, e))?;

        let client = ClientBuilder::native()
            .capabilities(capabilities())
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| SessionFailure::new(SessionOp::Open, e))?;

        let mut page = StorefrontPage::new(client);
        if let Err(failure) = page.goto(&url, self.navigation_delay).await {
            if let Err(close_err) = page.close().await {
                warn!(target: "drivers", app = %target, error = %close_err, "storefront.close_failed");
            }
            return Err(failure);
        }
        debug!(target: "drivers", app = %target, url = %url, "storefront.opened");
        Ok(page)
    }
}
