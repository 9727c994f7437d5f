//! End-to-end pipeline tests against a scripted in-memory browser session.
//!
//! These exercise the full render pipeline (navigation recovery, status
//! resolution, DOM post-processing ordering, artifact extraction, resource
//! release) without a real browser.

use async_trait::async_trait;
use prerender::{
    AnimationOptions, Config, FrameEncoder, MainResponse, NavigationOutcome, RenderError,
    RenderedPage, Renderer, Result, ScreenshotOptions,
    session::{BrowserSession, CaptureOptions, SessionFactory, WaitUntil},
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const JPEG_STUB: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

#[derive(Clone, Default)]
struct Behavior {
    response: Option<MainResponse>,
    navigation_fails: bool,
    override_content: Option<String>,
    override_lookup_fails: bool,
    strip_fails: bool,
    markup: String,
    capture_fail_at: Option<usize>,
    ready_wait_fails: bool,
}

fn ok_response(status: u16) -> Option<MainResponse> {
    Some(MainResponse::new(status, HashMap::new()))
}

fn metadata_response() -> Option<MainResponse> {
    let mut headers = HashMap::new();
    headers.insert("Metadata-Flavor".to_string(), "Google".to_string());
    Some(MainResponse::new(200, headers))
}

struct MockSession {
    behavior: Behavior,
    calls: Arc<Mutex<Vec<String>>>,
    captures: Arc<Mutex<Vec<CaptureOptions>>>,
    closed: Arc<AtomicUsize>,
    capture_count: AtomicUsize,
}

impl MockSession {
    fn log(&self, entry: impl Into<String>) {
        self.calls.lock().unwrap().push(entry.into());
    }

    fn classify(expression: &str) -> &'static str {
        if expression.contains("render:status_code") {
            "override"
        } else if expression.contains("script:not([type])") {
            "strip"
        } else if expression.contains("insertAdjacentElement") {
            "base"
        } else if expression.contains("outerHTML") {
            "serialize"
        } else if expression.ends_with("']()") {
            "advance"
        } else {
            "other"
        }
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn set_viewport(&self, width: u32, height: u32, is_mobile: bool) -> Result<()> {
        self.log(format!("set_viewport:{}x{}:mobile={}", width, height, is_mobile));
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.log(format!("set_user_agent:{}", user_agent));
        Ok(())
    }

    async fn evaluate_on_new_document(&self, script: &str) -> Result<()> {
        self.log(format!("on_new_document:{}", script));
        Ok(())
    }

    async fn navigate(
        &self,
        url: &str,
        _timeout: Duration,
        wait_until: WaitUntil,
    ) -> NavigationOutcome {
        self.log(format!("navigate:{}:{:?}", url, wait_until));

        if self.behavior.navigation_fails {
            NavigationOutcome::Failed {
                error: RenderError::NavigationTimeout(10),
                response: self.behavior.response.clone(),
            }
        } else {
            NavigationOutcome::Loaded(self.behavior.response.clone())
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
        let kind = Self::classify(expression);
        self.log(format!("evaluate:{}", kind));

        match kind {
            "override" => {
                if self.behavior.override_lookup_fails {
                    Err(RenderError::EvaluationError("meta lookup blew up".into()))
                } else {
                    Ok(self
                        .behavior
                        .override_content
                        .clone()
                        .map(serde_json::Value::String)
                        .unwrap_or(serde_json::Value::Null))
                }
            }
            "strip" => {
                if self.behavior.strip_fails {
                    Err(RenderError::EvaluationError("malformed document".into()))
                } else {
                    Ok(serde_json::json!(2))
                }
            }
            "base" => Ok(serde_json::json!("inserted")),
            "serialize" => Ok(serde_json::Value::String(self.behavior.markup.clone())),
            _ => Ok(serde_json::Value::Null),
        }
    }

    async fn capture_image(&self, options: &CaptureOptions) -> Result<Vec<u8>> {
        let index = self.capture_count.fetch_add(1, Ordering::SeqCst);
        self.log(format!("capture:{}", index));
        self.captures.lock().unwrap().push(options.clone());

        if self.behavior.capture_fail_at == Some(index) {
            return Err(RenderError::CaptureFailed("target crashed".into()));
        }

        Ok(JPEG_STUB.to_vec())
    }

    async fn wait_for_condition(&self, predicate: &str, _timeout: Duration) -> Result<()> {
        self.log(format!("wait_for:{}", predicate));

        if self.behavior.ready_wait_fails {
            Err(RenderError::ConditionTimeout(30))
        } else {
            Ok(())
        }
    }

    async fn close(&self) {
        self.log("close");
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MockFactory {
    behavior: Behavior,
    calls: Arc<Mutex<Vec<String>>>,
    captures: Arc<Mutex<Vec<CaptureOptions>>>,
    closed: Arc<AtomicUsize>,
    sessions_opened: Arc<AtomicUsize>,
}

impl MockFactory {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    type Session = MockSession;

    async fn new_session(&self) -> Result<MockSession> {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            behavior: self.behavior.clone(),
            calls: self.calls.clone(),
            captures: self.captures.clone(),
            closed: self.closed.clone(),
            capture_count: AtomicUsize::new(0),
        })
    }
}

struct RecordingEncoder {
    invocations: Arc<Mutex<Vec<(PathBuf, u32, PathBuf)>>>,
    frames_seen: Arc<Mutex<Vec<usize>>>,
    fail_with: Option<String>,
}

impl RecordingEncoder {
    fn new() -> Self {
        Self {
            invocations: Arc::new(Mutex::new(Vec::new())),
            frames_seen: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    fn matching_frame_count(pattern: &Path) -> usize {
        let dir = pattern.parent().expect("pattern has a parent dir");
        let prefix = pattern
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.split("-%04d").next())
            .expect("printf-style pattern")
            .to_string();

        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| {
                        e.file_name()
                            .to_str()
                            .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".jpg"))
                    })
                    .count()
            })
            .unwrap_or(0)
    }
}

impl FrameEncoder for RecordingEncoder {
    fn encode(&self, pattern: &Path, fps: u32, output: &Path) -> Result<()> {
        self.frames_seen
            .lock()
            .unwrap()
            .push(Self::matching_frame_count(pattern));
        self.invocations
            .lock()
            .unwrap()
            .push((pattern.to_path_buf(), fps, output.to_path_buf()));

        if let Some(message) = &self.fail_with {
            return Err(RenderError::EncoderFailed(message.clone()));
        }

        std::fs::write(output, b"video")?;
        Ok(())
    }
}

fn renderer_with(behavior: Behavior) -> Renderer<MockFactory> {
    Renderer::new(
        Arc::new(Config::default()),
        MockFactory::with_behavior(behavior),
    )
}

fn animation_renderer(
    behavior: Behavior,
    frames_dir: &Path,
    encoder: Arc<RecordingEncoder>,
) -> Renderer<MockFactory> {
    let mut config = Config::default();
    config.animation.frames_dir = Some(frames_dir.to_path_buf());
    Renderer::new(Arc::new(config), MockFactory::with_behavior(behavior)).with_encoder(encoder)
}

// --- serialize ---

#[tokio::test]
async fn serialize_returns_400_when_no_response() {
    let renderer = renderer_with(Behavior {
        response: None,
        ..Default::default()
    });

    let page = renderer.serialize("http://invalid./", false).await.unwrap();

    assert_eq!(
        page,
        RenderedPage {
            status: 400,
            content: String::new()
        }
    );
    assert_eq!(renderer.factory().closed_count(), 1);
}

#[tokio::test]
async fn serialize_returns_403_for_metadata_endpoint_even_with_override() {
    let renderer = renderer_with(Behavior {
        response: metadata_response(),
        override_content: Some("201".into()),
        markup: "<html></html>".into(),
        ..Default::default()
    });

    let page = renderer
        .serialize("http://169.254.169.254/", false)
        .await
        .unwrap();

    assert_eq!(
        page,
        RenderedPage {
            status: 403,
            content: String::new()
        }
    );
    assert_eq!(renderer.factory().closed_count(), 1);
}

#[tokio::test]
async fn serialize_normalizes_304_to_200() {
    let renderer = renderer_with(Behavior {
        response: ok_response(304),
        markup: "<html><head></head></html>".into(),
        ..Default::default()
    });

    let page = renderer.serialize("http://example.com/", false).await.unwrap();
    assert_eq!(page.status, 200);
}

#[tokio::test]
async fn serialize_applies_override_only_on_200() {
    let renderer = renderer_with(Behavior {
        response: ok_response(200),
        override_content: Some("503".into()),
        markup: "<html></html>".into(),
        ..Default::default()
    });
    assert_eq!(
        renderer.serialize("http://example.com/", false).await.unwrap().status,
        503
    );

    let renderer = renderer_with(Behavior {
        response: ok_response(500),
        override_content: Some("503".into()),
        markup: "<html></html>".into(),
        ..Default::default()
    });
    assert_eq!(
        renderer.serialize("http://example.com/", false).await.unwrap().status,
        500
    );
}

#[tokio::test]
async fn serialize_treats_failed_override_lookup_as_absent() {
    let renderer = renderer_with(Behavior {
        response: ok_response(200),
        override_lookup_fails: true,
        markup: "<html></html>".into(),
        ..Default::default()
    });

    let page = renderer.serialize("http://example.com/", false).await.unwrap();
    assert_eq!(page.status, 200);
    assert_eq!(page.content, "<html></html>");
}

#[tokio::test]
async fn serialize_recovers_partial_response_after_navigation_failure() {
    let renderer = renderer_with(Behavior {
        response: ok_response(200),
        navigation_fails: true,
        markup: "<html><body>partial</body></html>".into(),
        ..Default::default()
    });

    let page = renderer.serialize("http://slow.example.com/", false).await.unwrap();

    assert_eq!(page.status, 200);
    assert!(page.content.contains("partial"));
    assert_eq!(renderer.factory().closed_count(), 1);
}

#[tokio::test]
async fn serialize_propagates_post_processing_failure_and_closes_session() {
    let renderer = renderer_with(Behavior {
        response: ok_response(200),
        strip_fails: true,
        markup: "<html></html>".into(),
        ..Default::default()
    });

    let err = renderer.serialize("http://example.com/", false).await.unwrap_err();

    assert!(matches!(err, RenderError::EvaluationError(_)));
    assert_eq!(renderer.factory().closed_count(), 1);
}

#[tokio::test]
async fn serialize_orders_session_commands() {
    let renderer = renderer_with(Behavior {
        response: ok_response(200),
        markup: "<html></html>".into(),
        ..Default::default()
    });

    renderer.serialize("http://example.com/", true).await.unwrap();

    let calls = renderer.factory().calls();
    let position = |needle: &str| {
        calls
            .iter()
            .position(|c| c.starts_with(needle))
            .unwrap_or_else(|| panic!("missing call {needle}: {calls:?}"))
    };

    // emulation and the new-document marker are in place before navigation
    assert!(position("set_viewport") < position("navigate"));
    assert!(position("set_user_agent") < position("navigate"));
    assert!(position("on_new_document") < position("navigate"));
    // mutations run strip -> base -> serialize, after navigation
    assert!(position("navigate") < position("evaluate:strip"));
    assert!(position("evaluate:strip") < position("evaluate:base"));
    assert!(position("evaluate:base") < position("evaluate:serialize"));
    assert_eq!(calls.last().unwrap(), "close");
}

#[tokio::test]
async fn serialize_skips_user_agent_for_desktop() {
    let renderer = renderer_with(Behavior {
        response: ok_response(200),
        markup: "<html></html>".into(),
        ..Default::default()
    });

    renderer.serialize("http://example.com/", false).await.unwrap();

    assert!(
        !renderer
            .factory()
            .calls()
            .iter()
            .any(|c| c.starts_with("set_user_agent"))
    );
}

#[tokio::test]
async fn serialize_is_idempotent_for_stable_content() {
    let behavior = Behavior {
        response: ok_response(200),
        override_content: Some("201".into()),
        markup: "<html><head><base href=\"http://example.com\"></head></html>".into(),
        ..Default::default()
    };

    let first = renderer_with(behavior.clone())
        .serialize("http://example.com/", false)
        .await
        .unwrap();
    let second = renderer_with(behavior)
        .serialize("http://example.com/", false)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.status, 201);
}

#[tokio::test]
async fn serialize_rejects_unparseable_url() {
    let renderer = renderer_with(Behavior::default());
    let err = renderer.serialize("not a url", false).await.unwrap_err();
    assert!(matches!(err, RenderError::InvalidUrl(_)));
}

// --- screenshot ---

#[tokio::test]
async fn screenshot_fails_with_no_response() {
    let renderer = renderer_with(Behavior::default());

    let err = renderer
        .screenshot(
            "http://example.com/",
            false,
            800,
            600,
            &ScreenshotOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::NoResponse));
    assert_eq!(renderer.factory().closed_count(), 1);
}

#[tokio::test]
async fn screenshot_fails_with_forbidden_for_metadata_endpoint() {
    let renderer = renderer_with(Behavior {
        response: metadata_response(),
        ..Default::default()
    });

    let err = renderer
        .screenshot(
            "http://169.254.169.254/",
            false,
            800,
            600,
            &ScreenshotOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::Forbidden));
    assert_eq!(renderer.factory().closed_count(), 1);
}

#[tokio::test]
async fn screenshot_returns_bytes_and_merges_default_quality() {
    let renderer = renderer_with(Behavior {
        response: ok_response(200),
        ..Default::default()
    });

    let bytes = renderer
        .screenshot(
            "http://example.com/",
            false,
            800,
            600,
            &ScreenshotOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(bytes, JPEG_STUB);

    let captures = renderer.factory().captures.lock().unwrap().clone();
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].quality, 80);
    assert!(!captures[0].full_page);
}

#[tokio::test]
async fn screenshot_honors_caller_quality_override() {
    let renderer = renderer_with(Behavior {
        response: ok_response(200),
        ..Default::default()
    });

    renderer
        .screenshot(
            "http://example.com/",
            false,
            800,
            600,
            &ScreenshotOptions {
                quality: Some(55),
                full_page: true,
                clip: None,
            },
        )
        .await
        .unwrap();

    let captures = renderer.factory().captures.lock().unwrap().clone();
    assert_eq!(captures[0].quality, 55);
    assert!(captures[0].full_page);
}

#[tokio::test]
async fn screenshot_proceeds_after_navigation_failure_with_response() {
    let renderer = renderer_with(Behavior {
        response: ok_response(200),
        navigation_fails: true,
        ..Default::default()
    });

    let bytes = renderer
        .screenshot(
            "http://slow.example.com/",
            false,
            800,
            600,
            &ScreenshotOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(bytes, JPEG_STUB);
}

#[tokio::test]
async fn screenshot_does_not_run_dom_post_processing() {
    let renderer = renderer_with(Behavior {
        response: ok_response(200),
        ..Default::default()
    });

    renderer
        .screenshot(
            "http://example.com/",
            false,
            800,
            600,
            &ScreenshotOptions::default(),
        )
        .await
        .unwrap();

    let calls = renderer.factory().calls();
    assert!(!calls.iter().any(|c| c == "evaluate:strip"));
    assert!(!calls.iter().any(|c| c == "evaluate:base"));
}

// --- animation ---

fn animation_options(frames: u32) -> AnimationOptions {
    AnimationOptions {
        frames,
        ..Default::default()
    }
}

#[tokio::test]
async fn animation_writes_exact_frames_and_invokes_encoder_once() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(RecordingEncoder::new());
    let renderer = animation_renderer(
        Behavior {
            response: ok_response(200),
            ..Default::default()
        },
        dir.path(),
        encoder.clone(),
    );

    let video = renderer
        .render_animation("http://example.com/anim", &animation_options(3))
        .await
        .unwrap();

    let invocations = encoder.invocations.lock().unwrap().clone();
    assert_eq!(invocations.len(), 1);

    let (pattern, fps, output) = &invocations[0];
    assert_eq!(*fps, 10);
    assert_eq!(output, &video);
    assert!(video.extension().is_some_and(|e| e == "mp4"));
    assert!(video.exists());

    // all frames were on disk, matching the pattern, when assembly ran
    assert_eq!(encoder.frames_seen.lock().unwrap().clone(), vec![3]);
    let pattern_name = pattern.file_name().unwrap().to_str().unwrap();
    assert!(pattern_name.ends_with("-%04d.jpg"));

    // frames are cleaned up after a successful encode
    assert_eq!(RecordingEncoder::matching_frame_count(pattern), 0);

    assert_eq!(renderer.factory().closed_count(), 1);
}

#[tokio::test]
async fn animation_paces_capture_with_page_handshake() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(RecordingEncoder::new());
    let renderer = animation_renderer(
        Behavior {
            response: ok_response(200),
            ..Default::default()
        },
        dir.path(),
        encoder,
    );

    renderer
        .render_animation("http://example.com/anim", &animation_options(3))
        .await
        .unwrap();

    let calls = renderer.factory().calls();

    // readiness gate precedes the first capture
    let ready = calls.iter().position(|c| c.starts_with("wait_for:")).unwrap();
    let first_capture = calls.iter().position(|c| c == "capture:0").unwrap();
    assert!(ready < first_capture);
    assert!(calls[ready].contains("window['cxReady']===true"));

    // capture/advance alternate; no advance after the final frame
    let advances = calls.iter().filter(|c| *c == "evaluate:advance").count();
    assert_eq!(advances, 2);
    let captures = calls.iter().filter(|c| c.starts_with("capture:")).count();
    assert_eq!(captures, 3);
}

#[tokio::test]
async fn animation_capture_failure_aborts_before_assembly() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(RecordingEncoder::new());
    let renderer = animation_renderer(
        Behavior {
            response: ok_response(200),
            capture_fail_at: Some(1),
            ..Default::default()
        },
        dir.path(),
        encoder.clone(),
    );

    let err = renderer
        .render_animation("http://example.com/anim", &animation_options(3))
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::CaptureFailed(_)));
    assert!(encoder.invocations.lock().unwrap().is_empty());
    assert_eq!(renderer.factory().closed_count(), 1);
}

#[tokio::test]
async fn animation_encoder_failure_surfaces_diagnostic_and_keeps_frames() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(RecordingEncoder::failing("unknown pixel format"));
    let renderer = animation_renderer(
        Behavior {
            response: ok_response(200),
            ..Default::default()
        },
        dir.path(),
        encoder.clone(),
    );

    let err = renderer
        .render_animation("http://example.com/anim", &animation_options(2))
        .await
        .unwrap_err();

    match err {
        RenderError::EncoderFailed(diagnostic) => {
            assert!(diagnostic.contains("unknown pixel format"))
        }
        other => panic!("expected EncoderFailed, got {other:?}"),
    }

    // frames are left behind for post-mortem inspection
    let (pattern, _, _) = encoder.invocations.lock().unwrap()[0].clone();
    assert_eq!(RecordingEncoder::matching_frame_count(&pattern), 2);
}

#[tokio::test]
async fn animation_uses_unique_capture_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(RecordingEncoder::new());
    let behavior = Behavior {
        response: ok_response(200),
        ..Default::default()
    };

    animation_renderer(behavior.clone(), dir.path(), encoder.clone())
        .render_animation("http://example.com/anim", &animation_options(2))
        .await
        .unwrap();
    animation_renderer(behavior, dir.path(), encoder.clone())
        .render_animation("http://example.com/anim", &animation_options(2))
        .await
        .unwrap();

    let invocations = encoder.invocations.lock().unwrap();
    assert_eq!(invocations.len(), 2);
    assert_ne!(invocations[0].0, invocations[1].0);
}

#[tokio::test]
async fn animation_fails_for_metadata_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(RecordingEncoder::new());
    let renderer = animation_renderer(
        Behavior {
            response: metadata_response(),
            ..Default::default()
        },
        dir.path(),
        encoder.clone(),
    );

    let err = renderer
        .render_animation("http://169.254.169.254/", &animation_options(2))
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::Forbidden));
    assert!(encoder.invocations.lock().unwrap().is_empty());
    assert_eq!(renderer.factory().closed_count(), 1);
}

#[tokio::test]
async fn animation_fails_when_readiness_flag_never_set() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(RecordingEncoder::new());
    let renderer = animation_renderer(
        Behavior {
            response: ok_response(200),
            ready_wait_fails: true,
            ..Default::default()
        },
        dir.path(),
        encoder.clone(),
    );

    let err = renderer
        .render_animation("http://example.com/anim", &animation_options(2))
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::ConditionTimeout(_)));
    assert!(encoder.invocations.lock().unwrap().is_empty());
    assert_eq!(renderer.factory().closed_count(), 1);
}
