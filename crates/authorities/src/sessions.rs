//! Session authority client.

use crate::credential::Credential;
use crate::error::{AuthorityError, AuthorityResult};
use crate::records::{ItemsEnvelope, SessionRecord};
use async_trait::async_trait;
use reqwest::Url;

/// Source of truth for active logins.
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    /// Fetch the full session snapshot, recursive across all tenants.
    async fn list_sessions(&self, credential: &Credential) -> AuthorityResult<Vec<SessionRecord>>;
}

/// Session authority backed by the identity service.
pub struct HttpSessionAuthority {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpSessionAuthority {
    pub fn new(base_url: &str) -> AuthorityResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AuthorityError::InvalidResponse(format!("invalid base URL: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }
}

#[async_trait]
impl SessionAuthority for HttpSessionAuthority {
    async fn list_sessions(&self, credential: &Credential) -> AuthorityResult<Vec<SessionRecord>> {
        let url = crate::http::join(&self.base_url, "sessions")?;
        let envelope: ItemsEnvelope<SessionRecord> =
            crate::http::send_json(self.http.get(url).query(&[("recurse", "true")]), credential)
                .await?;
        Ok(envelope.items)
    }
}
