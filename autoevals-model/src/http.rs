use autoevals_core::{EvalError, Result};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

/// Send a prepared JSON request and decode a JSON body, mapping transport and
/// status failures to [`EvalError::Upstream`].
pub(crate) async fn send_json<R: DeserializeOwned>(
    request: RequestBuilder,
    provider: &'static str,
    url: String,
) -> Result<R> {
    let response = request
        .send()
        .await
        .map_err(|e| EvalError::Upstream(format!("{provider} error for url={url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(EvalError::Upstream(format!(
            "{provider} error for url={url}, status={status}: {error_text}"
        )));
    }

    response.json::<R>().await.map_err(|e| {
        EvalError::Upstream(format!("{provider} returned an unreadable body for url={url}: {e}"))
    })
}
