use super::{AnimationOptions, RenderRequest, Renderer, navigate_for_response, status};
use crate::{
    RenderError, Result, js_templates,
    session::{BrowserSession, CaptureOptions, SessionFactory, WaitUntil},
    timeouts::secs,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

pub(crate) fn frame_file_name(capture_id: &str, index: u32) -> String {
    format!("{}-{:04}.jpg", capture_id, index)
}

pub(crate) fn frame_pattern(capture_id: &str) -> String {
    format!("{}-%04d.jpg", capture_id)
}

impl<F: SessionFactory> Renderer<F> {
    /// Records a cooperative animation into one video file and returns its
    /// path.
    ///
    /// The page signals readiness through `options.ready_var_name` and paces
    /// capture through `options.next_func_name`; the pipeline controls when
    /// each frame is taken. Exactly `options.frames` frames are written
    /// before assembly, or the whole operation fails without producing a
    /// partial video.
    pub async fn render_animation(&self, url: &str, options: &AnimationOptions) -> Result<PathBuf> {
        options.validate()?;

        let request = RenderRequest::new(url, false, options.width, options.height)?;

        let frames_dir = self.config().animation.frames_dir();
        std::fs::create_dir_all(&frames_dir)?;

        // Unique per request; a shared identifier would let concurrent
        // captures overwrite each other's frames.
        let capture_id = Uuid::new_v4().to_string();

        let session = self.factory.new_session().await?;
        let captured = self
            .capture_frames(&session, &request, options, &frames_dir, &capture_id)
            .await;
        session.close().await;
        captured?;

        let encoder = self.frame_encoder()?;
        let pattern = frames_dir.join(frame_pattern(&capture_id));
        let output = frames_dir.join(format!("{}.mp4", capture_id));

        if let Err(e) = encoder.encode(&pattern, options.fps, &output) {
            // Frames are left in place for post-mortem inspection.
            tracing::warn!(
                "frame assembly failed; frames retained under {}",
                frames_dir.display()
            );
            return Err(e);
        }

        remove_frames(&frames_dir, &capture_id, options.frames);

        Ok(output)
    }

    async fn capture_frames(
        &self,
        session: &F::Session,
        request: &RenderRequest,
        options: &AnimationOptions,
        frames_dir: &Path,
        capture_id: &str,
    ) -> Result<()> {
        session
            .set_viewport(request.width, request.height, false)
            .await?;

        // No network-idle wait here: animated pages initialize asynchronously
        // and declare readiness through the in-page flag instead.
        let response = navigate_for_response(
            session,
            request.url.as_str(),
            self.navigation_timeout(),
            WaitUntil::Load,
        )
        .await;

        let Some(response) = response else {
            return Err(RenderError::NoResponse);
        };

        if status::is_metadata_endpoint(&response) {
            return Err(RenderError::Forbidden);
        }

        session
            .wait_for_condition(
                &js_templates::ready_flag_check(&options.ready_var_name),
                Duration::from_secs(secs::ANIMATION_READY),
            )
            .await?;

        let capture = CaptureOptions {
            quality: self.config().screenshot.default_quality,
            ..Default::default()
        };

        for index in 0..options.frames {
            let bytes = session.capture_image(&capture).await?;
            let path = frames_dir.join(frame_file_name(capture_id, index));
            std::fs::write(&path, &bytes)?;
            tracing::debug!("captured frame {} to {}", index, path.display());

            if index + 1 < options.frames {
                // the page paces capture; a page that never signals is cut off
                tokio::time::timeout(
                    Duration::from_secs(secs::FRAME_ADVANCE),
                    session.evaluate(&js_templates::advance_frame(&options.next_func_name)),
                )
                .await
                .map_err(|_| RenderError::ConditionTimeout(secs::FRAME_ADVANCE))??;
            }
        }

        Ok(())
    }
}

fn remove_frames(frames_dir: &Path, capture_id: &str, frames: u32) {
    for index in 0..frames {
        let path = frames_dir.join(frame_file_name(capture_id, index));
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::debug!("failed to remove frame {}: {}", path.display(), e);
        }
    }
}
