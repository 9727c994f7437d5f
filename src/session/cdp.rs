use super::{BrowserSession, CaptureOptions, MainResponse, NavigationOutcome, SessionFactory, WaitUntil};
use crate::{
    Config, RenderError, Result,
    timeouts::{ms, secs},
    utils,
};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventResponseReceived,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, CaptureScreenshotParams,
    NavigateParams, Viewport,
};
use chromiumoxide::cdp::browser_protocol::target::CloseTargetParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Creates isolated pages inside one running browser. The browser itself is
/// launched or connected to once; each render request gets its own page.
pub struct CdpSessionFactory {
    browser: Arc<Browser>,
    network_idle_ms: u64,
}

impl CdpSessionFactory {
    pub fn new(browser: Arc<Browser>) -> Self {
        Self {
            browser,
            network_idle_ms: ms::NETWORK_IDLE,
        }
    }

    /// Launches a headless Chrome and drives its event handler on a
    /// background task.
    pub async fn launch(config: &Config) -> Result<Self> {
        let chrome_path = config
            .browser
            .chrome_path
            .clone()
            .map(Ok)
            .unwrap_or_else(utils::find_chrome_executable)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .port(config.browser.port)
            .request_timeout(Duration::from_secs(secs::REQUEST));

        if config.browser.headless {
            builder = builder.arg("--headless");
        }

        let browser_config = builder.build().map_err(RenderError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| RenderError::LaunchFailed(e.to_string()))?;

        tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser: Arc::new(browser),
            network_idle_ms: config.render.network_idle_ms,
        })
    }

    /// Connects to an already-running Chrome via its debugging port.
    pub async fn connect(port: u16, config: &Config) -> Result<Self> {
        use chromiumoxide::handler::HandlerConfig;

        let url = format!("http://127.0.0.1:{}/json/version", port);

        let response: serde_json::Value = reqwest::Client::new()
            .get(&url)
            .send()
            .await
            .map_err(|_| RenderError::ConnectionLost)?
            .json()
            .await
            .map_err(|_| RenderError::ConnectionLost)?;

        let ws_url = response
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or(RenderError::ConnectionLost)?;

        let handler_config = HandlerConfig {
            request_timeout: Duration::from_secs(secs::REQUEST),
            ..Default::default()
        };

        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|_| RenderError::ConnectionLost)?;

        tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser: Arc::new(browser),
            network_idle_ms: config.render.network_idle_ms,
        })
    }
}

#[async_trait]
impl SessionFactory for CdpSessionFactory {
    type Session = CdpSession;

    async fn new_session(&self) -> Result<CdpSession> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::SessionUnavailable(e.to_string()))?;

        CdpSession::attach(Arc::new(page), self.network_idle_ms).await
    }
}

pub struct CdpSession {
    page: Arc<Page>,
    first_response: Arc<RwLock<Option<MainResponse>>>,
    network_idle_ms: u64,
    closed: AtomicBool,
}

impl CdpSession {
    /// Wires the first-response capture before any navigation can start, so
    /// a response arriving while the navigate call is still in flight is
    /// never missed.
    async fn attach(page: Arc<Page>, network_idle_ms: u64) -> Result<Self> {
        let first_response = Arc::new(RwLock::new(None));

        let mut response_stream = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| RenderError::SessionUnavailable(format!("response listener: {}", e)))?;

        let captured = first_response.clone();
        tokio::spawn(async move {
            while let Some(event) = response_stream.next().await {
                let mut slot = captured.write().await;
                if slot.is_none() {
                    let status = event.response.status.clamp(0, u16::MAX as i64) as u16;
                    *slot = Some(MainResponse::new(status, headers_map(event.response.headers.inner())));
                }
            }
        });

        page.execute(NetworkEnableParams::default())
            .await
            .map_err(|e| RenderError::SessionUnavailable(format!("network domain: {}", e)))?;

        Ok(Self {
            page,
            first_response,
            network_idle_ms,
            closed: AtomicBool::new(false),
        })
    }

    async fn drive(&self, url: &str, wait_until: WaitUntil) -> Result<()> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(RenderError::NavigationFailed)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| RenderError::NavigationFailed(e.to_string()))?;

        match wait_until {
            WaitUntil::Load => self.wait_for_load().await,
            WaitUntil::NetworkIdle => self.wait_for_network_idle().await,
        }
    }

    async fn wait_for_load(&self) -> Result<()> {
        loop {
            if self.ready_state_complete().await {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
        }
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        loop {
            if self.ready_state_complete().await {
                // settle window with no further document activity
                tokio::time::sleep(Duration::from_millis(self.network_idle_ms)).await;
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
        }
    }

    async fn ready_state_complete(&self) -> bool {
        match tokio::time::timeout(
            Duration::from_secs(secs::READY_STATE),
            self.page.evaluate("document.readyState"),
        )
        .await
        {
            Ok(Ok(result)) => result
                .into_value::<String>()
                .map(|state| state == "complete")
                .unwrap_or(false),
            Ok(Err(_)) | Err(_) => false,
        }
    }
}

fn headers_map(raw: &serde_json::Value) -> HashMap<String, String> {
    raw.as_object()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn set_viewport(&self, width: u32, height: u32, is_mobile: bool) -> Result<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(width as i64)
            .height(height as i64)
            .device_scale_factor(1.0)
            .mobile(is_mobile)
            .build()
            .map_err(RenderError::ConfigError)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| RenderError::SessionUnavailable(format!("set viewport: {}", e)))?;

        tokio::time::sleep(Duration::from_millis(ms::VIEWPORT_SETTLE)).await;
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        let params = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent)
            .build()
            .map_err(RenderError::ConfigError)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| RenderError::SessionUnavailable(format!("set user agent: {}", e)))?;

        Ok(())
    }

    async fn evaluate_on_new_document(&self, script: &str) -> Result<()> {
        let params = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(script)
            .build()
            .map_err(RenderError::EvaluationError)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| RenderError::EvaluationError(e.to_string()))?;

        Ok(())
    }

    async fn navigate(
        &self,
        url: &str,
        timeout: Duration,
        wait_until: WaitUntil,
    ) -> NavigationOutcome {
        let timeout_secs = timeout.as_secs();
        let driven = tokio::time::timeout(timeout, self.drive(url, wait_until)).await;

        let response = self.first_response.read().await.clone();

        match driven {
            Ok(Ok(())) => NavigationOutcome::Loaded(response),
            Ok(Err(error)) => NavigationOutcome::Failed { error, response },
            Err(_) => NavigationOutcome::Failed {
                error: RenderError::NavigationTimeout(timeout_secs),
                response,
            },
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(RenderError::EvaluationError)?;

        let result = self
            .page
            .evaluate(params)
            .await
            .map_err(|e| RenderError::EvaluationError(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn capture_image(&self, options: &CaptureOptions) -> Result<Vec<u8>> {
        let mut params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .build();

        params.quality = Some(options.quality as i64);

        if options.full_page {
            params.capture_beyond_viewport = Some(true);
        }

        if let Some(clip) = options.clip {
            params.clip = Some(Viewport {
                x: clip.x,
                y: clip.y,
                width: clip.width,
                height: clip.height,
                scale: 1.0,
            });
        }

        self.page
            .screenshot(params)
            .await
            .map_err(|e| RenderError::CaptureFailed(e.to_string()))
    }

    async fn wait_for_condition(&self, predicate: &str, timeout: Duration) -> Result<()> {
        let timeout_secs = timeout.as_secs();

        tokio::time::timeout(timeout, async {
            loop {
                if let Ok(value) = self.evaluate(predicate).await
                    && value.as_bool() == Some(true)
                {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
            }
        })
        .await
        .map_err(|_| RenderError::ConditionTimeout(timeout_secs))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let params = CloseTargetParams::new(self.page.target_id().clone());
        if let Err(e) = self.page.execute(params).await {
            tracing::debug!("failed to close page target: {}", e);
        }
    }
}
