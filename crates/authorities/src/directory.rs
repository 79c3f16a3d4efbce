//! Directory authority client.

use crate::credential::Credential;
use crate::error::{AuthorityError, AuthorityResult};
use crate::records::{ItemsEnvelope, UserRecord};
use async_trait::async_trait;
use reqwest::Url;

/// Source of truth for users and their lines.
#[async_trait]
pub trait DirectoryAuthority: Send + Sync {
    /// Fetch the full user snapshot, recursive across all tenants, with
    /// nested lines.
    async fn list_users(&self, credential: &Credential) -> AuthorityResult<Vec<UserRecord>>;
}

/// Directory authority backed by the directory service.
pub struct HttpDirectoryAuthority {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpDirectoryAuthority {
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
impl DirectoryAuthority for HttpDirectoryAuthority {
    async fn list_users(&self, credential: &Credential) -> AuthorityResult<Vec<UserRecord>> {
        let url = crate::http::join(&self.base_url, "users")?;
        let envelope: ItemsEnvelope<UserRecord> =
            crate::http::send_json(self.http.get(url).query(&[("recurse", "true")]), credential)
                .await?;
        Ok(envelope.items)
    }
}
