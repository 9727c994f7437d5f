use super::{RenderRequest, RenderedPage, Renderer, navigate_for_response, prepare_session, status};
use crate::{
    RenderError, Result, js_templates,
    session::{BrowserSession, SessionFactory, WaitUntil},
};

impl<F: SessionFactory> Renderer<F> {
    /// Renders `url` and returns the script-executed DOM as static markup.
    ///
    /// Navigation failures degrade to whatever response was captured; a
    /// render that never produced a response yields `{400, ""}` rather than
    /// an error, so callers can pass the status through unchanged.
    pub async fn serialize(&self, url: &str, mobile: bool) -> Result<RenderedPage> {
        let request = RenderRequest::new(
            url,
            mobile,
            self.config().render.viewport_width,
            self.config().render.viewport_height,
        )?;

        let session = self.factory.new_session().await?;
        let result = self.serialize_in(&session, &request).await;
        session.close().await;
        result
    }

    async fn serialize_in(&self, session: &F::Session, request: &RenderRequest) -> Result<RenderedPage> {
        prepare_session(session, request).await?;

        let response = navigate_for_response(
            session,
            request.url.as_str(),
            self.navigation_timeout(),
            WaitUntil::NetworkIdle,
        )
        .await;

        let Some(response) = response else {
            return Ok(RenderedPage {
                status: 400,
                content: String::new(),
            });
        };

        if status::is_metadata_endpoint(&response) {
            return Ok(RenderedPage {
                status: 403,
                content: String::new(),
            });
        }

        let override_status = status::lookup_override(session).await;
        let resolved = status::resolve(response.status, override_status);

        // Post-processing is required for correct output; failures here are
        // fatal rather than degraded.
        session.evaluate(js_templates::STRIP_ACTIVE_CONTENT).await?;
        session
            .evaluate(&js_templates::inject_base_href(&request.origin()))
            .await?;

        let markup = session
            .evaluate(js_templates::SERIALIZE_DOCUMENT)
            .await?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| {
                RenderError::EvaluationError("document serialization returned no markup".into())
            })?;

        Ok(RenderedPage {
            status: resolved,
            content: markup,
        })
    }
}
