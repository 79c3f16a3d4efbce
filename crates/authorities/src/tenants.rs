//! Tenant authority client.

use crate::credential::Credential;
use crate::error::{AuthorityError, AuthorityResult};
use crate::records::{ItemsEnvelope, TenantRecord};
use async_trait::async_trait;
use reqwest::Url;

/// Source of truth for tenants.
#[async_trait]
pub trait TenantAuthority: Send + Sync {
    /// Fetch the full current tenant snapshot.
    async fn list_tenants(&self, credential: &Credential) -> AuthorityResult<Vec<TenantRecord>>;
}

/// Tenant authority backed by the identity service.
pub struct HttpTenantAuthority {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTenantAuthority {
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
impl TenantAuthority for HttpTenantAuthority {
    async fn list_tenants(&self, credential: &Credential) -> AuthorityResult<Vec<TenantRecord>> {
        let url = crate::http::join(&self.base_url, "tenants")?;
        let envelope: ItemsEnvelope<TenantRecord> =
            crate::http::send_json(self.http.get(url), credential).await?;
        Ok(envelope.items)
    }
}
