use super::{RenderRequest, Renderer, ScreenshotOptions, navigate_for_response, prepare_session, status};
use crate::{
    RenderError, Result,
    session::{BrowserSession, CaptureOptions, SessionFactory, WaitUntil},
};

impl<F: SessionFactory> Renderer<F> {
    /// Captures a JPEG of the rendered page.
    ///
    /// Unlike serialization there is no partial result: a navigation that
    /// produced no response or hit a protected metadata endpoint fails with
    /// the matching typed error.
    pub async fn screenshot(
        &self,
        url: &str,
        mobile: bool,
        width: u32,
        height: u32,
        options: &ScreenshotOptions,
    ) -> Result<Vec<u8>> {
        let request = RenderRequest::new(url, mobile, width, height)?;

        let session = self.factory.new_session().await?;
        let result = self.screenshot_in(&session, &request, options).await;
        session.close().await;
        result
    }

    async fn screenshot_in(
        &self,
        session: &F::Session,
        request: &RenderRequest,
        options: &ScreenshotOptions,
    ) -> Result<Vec<u8>> {
        prepare_session(session, request).await?;

        let response = navigate_for_response(
            session,
            request.url.as_str(),
            self.navigation_timeout(),
            WaitUntil::NetworkIdle,
        )
        .await;

        let Some(response) = response else {
            return Err(RenderError::NoResponse);
        };

        if status::is_metadata_endpoint(&response) {
            return Err(RenderError::Forbidden);
        }

        let capture = CaptureOptions {
            quality: options
                .quality
                .unwrap_or(self.config().screenshot.default_quality),
            full_page: options.full_page,
            clip: options.clip,
        };

        session.capture_image(&capture).await
    }
}
