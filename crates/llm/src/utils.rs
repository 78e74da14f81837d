use crate::ApiError;
use anyhow::Result;
use reqwest::{Response, StatusCode};

/// Check response status and classify failures.
/// Returns Ok(Response) if successful, or a classified [`ApiError`] if not.
pub async fn check_response_error(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let response_text = response
        .text()
        .await
        .map_err(|e| ApiError::NetworkError(e.to_string()))?;

    Err(classify_status(status, response_text).into())
}

pub(crate) fn classify_status(status: StatusCode, response_text: String) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::Authentication(response_text)
        }
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => ApiError::InvalidRequest(response_text),
        status if status.is_server_error() => ApiError::ServiceError(response_text),
        _ => ApiError::Unknown(format!("Status {status}: {response_text}")),
    }
}
