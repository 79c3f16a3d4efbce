//! Short-lived credentials for authority calls.

use crate::error::{AuthorityError, AuthorityResult};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

/// Bearer credential scoped to one reconciliation run.
///
/// Passed explicitly to every authority call rather than cached process-wide,
/// so a retried run never reuses a credential from a failed one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
}

/// Issues fresh short-lived credentials.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Obtain a new credential valid for `expiration_secs` seconds.
    async fn new_credential(&self, expiration_secs: u64) -> AuthorityResult<Credential>;
}

#[derive(Debug, Serialize)]
struct NewCredentialRequest {
    expiration: u64,
}

#[derive(Debug, Deserialize)]
struct NewCredentialResponse {
    data: CredentialData,
}

#[derive(Debug, Deserialize)]
struct CredentialData {
    token: String,
}

/// Credential issuer backed by the identity service's token endpoint.
pub struct HttpCredentialIssuer {
    http: reqwest::Client,
    base_url: Url,
    service_id: String,
    service_key: String,
}

impl HttpCredentialIssuer {
    pub fn new(base_url: &str, service_id: &str, service_key: &str) -> AuthorityResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AuthorityError::InvalidResponse(format!("invalid base URL: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            service_id: service_id.to_string(),
            service_key: service_key.to_string(),
        })
    }
}

#[async_trait]
impl CredentialIssuer for HttpCredentialIssuer {
    async fn new_credential(&self, expiration_secs: u64) -> AuthorityResult<Credential> {
        let url = crate::http::join(&self.base_url, "token")?;
        let response = self
            .http
            .post(url)
            .basic_auth(&self.service_id, Some(&self.service_key))
            .json(&NewCredentialRequest {
                expiration: expiration_secs,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthorityError::Unauthorized(status.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthorityError::Unavailable(format!("{status}: {body}")));
        }

        let body: NewCredentialResponse = response
            .json()
            .await
            .map_err(|e| AuthorityError::InvalidResponse(e.to_string()))?;
        Ok(Credential {
            token: body.data.token,
        })
    }
}
