//! Shared HTTP plumbing for the authority clients.

use crate::credential::Credential;
use crate::error::{AuthorityError, AuthorityResult};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

/// Join a path onto an authority base URL.
pub(crate) fn join(base_url: &Url, path: &str) -> AuthorityResult<Url> {
    base_url
        .join(path)
        .map_err(|e| AuthorityError::InvalidResponse(format!("invalid URL {path}: {e}")))
}

/// Send a credentialed request and decode the JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    req: RequestBuilder,
    credential: &Credential,
) -> AuthorityResult<T> {
    let response = req.bearer_auth(&credential.token).send().await?;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AuthorityError::Unauthorized(status.to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthorityError::Unavailable(format!("{status}: {body}")));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AuthorityError::InvalidResponse(e.to_string()))
}
