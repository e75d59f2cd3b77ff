use std::time::Duration;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use crate::error::{Error, Result};

/// Longest upstream error body kept in an `UpstreamStatusError`.
const MAX_ERROR_BODY: usize = 2048;

pub fn build_client(request_timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(request_timeout)
        .build()
        .map_err(|e| Error::ConfigError(format!("HTTP client construction failed: {}", e)))
}

/// Sends the request unless `cancel` fires first. Dropping the send future
/// aborts the in-flight request.
pub async fn send(cancel: &CancellationToken, request: RequestBuilder) -> Result<Response> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        result = request.send() => result.map_err(|e| Error::TransportError(e.to_string()))?,
    };

    ensure_success(cancel, response).await
}

/// Passes 2xx responses through. Anything else becomes an
/// `UpstreamStatusError` carrying at most `MAX_ERROR_BODY` bytes of the body.
pub async fn ensure_success(cancel: &CancellationToken, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(Error::UpstreamStatusError {
        status: status.as_u16(),
        body: read_error_body(cancel, response).await?,
    })
}

async fn read_error_body(cancel: &CancellationToken, mut response: Response) -> Result<String> {
    let mut raw = Vec::new();

    while raw.len() < MAX_ERROR_BODY {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            chunk = response.chunk() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => raw.extend_from_slice(&bytes),
            // The status is what matters; a broken body is reported as far as it got.
            Ok(None) | Err(_) => break,
        }
    }

    let mut body = String::from_utf8_lossy(&raw).into_owned();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }

    Ok(body)
}

/// Reads the body and decodes it as JSON. The body read is cancellable too.
pub async fn read_json<T: DeserializeOwned>(cancel: &CancellationToken, response: Response) -> Result<T> {
    let bytes = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        result = response.bytes() => result.map_err(|e| Error::TransportError(e.to_string()))?,
    };

    serde_json::from_slice(&bytes).map_err(|e| Error::DecodeError(e.to_string()))
}

pub async fn get_json<T: DeserializeOwned>(cancel: &CancellationToken, request: RequestBuilder) -> Result<T> {
    let response = send(cancel, request).await?;
    read_json(cancel, response).await
}
