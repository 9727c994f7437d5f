pub mod animation;
pub mod screenshot;
pub mod serialize;
pub mod status;

use crate::{
    Config, RenderError, Result, devices,
    encoder::{FfmpegEncoder, FrameEncoder},
    js_templates,
    session::{BrowserSession, Clip, MainResponse, NavigationOutcome, SessionFactory, WaitUntil},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// One render request. Immutable once created; exactly one browser session
/// serves it.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: Url,
    pub mobile: bool,
    pub width: u32,
    pub height: u32,
}

impl RenderRequest {
    pub fn new(url: &str, mobile: bool, width: u32, height: u32) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| RenderError::InvalidUrl(format!("{}: {}", url, e)))?;

        if width == 0 || height == 0 {
            return Err(RenderError::ConfigError(
                "viewport dimensions must be positive".into(),
            ));
        }

        Ok(Self {
            url,
            mobile,
            width,
            height,
        })
    }

    /// Scheme + host (+ non-default port), used for base-href injection.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }
}

/// Serialized render result handed to script-less crawlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPage {
    pub status: u16,
    pub content: String,
}

/// Caller-overridable screenshot options, merged over fixed defaults.
/// The image format is always JPEG and cannot be overridden.
#[derive(Debug, Clone, Default)]
pub struct ScreenshotOptions {
    pub quality: Option<u8>,
    pub full_page: bool,
    pub clip: Option<Clip>,
}

/// Animation capture options and their documented defaults.
#[derive(Debug, Clone)]
pub struct AnimationOptions {
    /// In-page variable polled until `true` before the first frame.
    pub ready_var_name: String,
    /// In-page function awaited between frames; the page controls pacing.
    pub next_func_name: String,
    pub frames: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            ready_var_name: "cxReady".to_string(),
            next_func_name: "nextFrame".to_string(),
            frames: 10,
            width: 512,
            height: 512,
            fps: 10,
        }
    }
}

impl AnimationOptions {
    pub fn validate(&self) -> Result<()> {
        if self.frames == 0 || self.fps == 0 {
            return Err(RenderError::ConfigError(
                "animation frames and fps must be greater than 0".into(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::ConfigError(
                "viewport dimensions must be positive".into(),
            ));
        }
        if self.ready_var_name.is_empty() || self.next_func_name.is_empty() {
            return Err(RenderError::ConfigError(
                "ready variable and next-frame function names cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Drives one browser session per request through navigation, status
/// resolution, and artifact extraction.
pub struct Renderer<F: SessionFactory> {
    config: Arc<Config>,
    factory: F,
    encoder: Option<Arc<dyn FrameEncoder>>,
}

impl<F: SessionFactory> Renderer<F> {
    pub fn new(config: Arc<Config>, factory: F) -> Self {
        Self {
            config,
            factory,
            encoder: None,
        }
    }

    /// Replaces the lazily-discovered ffmpeg encoder.
    pub fn with_encoder(mut self, encoder: Arc<dyn FrameEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub(crate) fn frame_encoder(&self) -> Result<Arc<dyn FrameEncoder>> {
        match &self.encoder {
            Some(encoder) => Ok(encoder.clone()),
            None => {
                let encoder = match &self.config.animation.ffmpeg_path {
                    Some(path) => FfmpegEncoder::new(path.clone()),
                    None => FfmpegEncoder::discover()?,
                };
                Ok(Arc::new(encoder))
            }
        }
    }

    pub(crate) fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.config.render.navigation_timeout_secs)
    }
}

/// Applies viewport and mobile emulation, and marks new documents so pages
/// can detect the pipeline.
pub(crate) async fn prepare_session<S: BrowserSession>(
    session: &S,
    request: &RenderRequest,
) -> Result<()> {
    session
        .set_viewport(request.width, request.height, request.mobile)
        .await?;

    if request.mobile {
        session
            .set_user_agent(&devices::mobile_profile().user_agent)
            .await?;
    }

    session
        .evaluate_on_new_document(js_templates::PRERENDER_MARKER)
        .await?;

    Ok(())
}

/// Navigates and folds the outcome into the best-known response. Navigation
/// errors and timeouts are recoverable here: a page that got far enough to
/// emit a response still yields a partial result.
pub(crate) async fn navigate_for_response<S: BrowserSession>(
    session: &S,
    url: &str,
    timeout: Duration,
    wait_until: WaitUntil,
) -> Option<MainResponse> {
    match session.navigate(url, timeout, wait_until).await {
        NavigationOutcome::Loaded(response) => response,
        NavigationOutcome::Failed { error, response } => {
            tracing::warn!(
                "navigation to {} did not complete: {}; continuing with captured response",
                url,
                error
            );
            response
        }
    }
}
