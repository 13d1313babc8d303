pub mod http_background_remover;
pub mod http_face_detector;
pub mod http_text_reader;
pub mod ollama_llm_client;

use crate::ports::CapabilityError;

/// Maps a reqwest transport error to the capability error taxonomy
pub(crate) fn map_request_error(error: reqwest::Error) -> CapabilityError {
    if error.is_connect() || error.is_timeout() {
        CapabilityError::Connection(error.to_string())
    } else {
        CapabilityError::ResponseParsing(error.to_string())
    }
}

/// Surfaces a non-success HTTP status as an endpoint error, carrying the
/// response body for diagnostics
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, CapabilityError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CapabilityError::Endpoint {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
