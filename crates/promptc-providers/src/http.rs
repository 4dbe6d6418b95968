//! Shared request plumbing for the HTTP providers.

use promptc_runtime::ProviderError;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Longest error body kept in a `ProviderError::Status`.
const MAX_ERROR_BODY: usize = 256;

/// Build a client with a hard per-request timeout.
pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("promptc/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Send a prepared request and decode a JSON success body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(|e| transport(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: truncate(body.trim(), MAX_ERROR_BODY),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Decode(e.to_string()))
}

fn transport(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else if err.is_connect() {
        ProviderError::Transport(format!("connection failed: {}", err))
    } else {
        ProviderError::Transport(err.to_string())
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(truncate("aé", 2), "a...");
    }
}
