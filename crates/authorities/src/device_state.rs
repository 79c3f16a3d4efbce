//! Device-state authority client.

use crate::credential::Credential;
use crate::error::{AuthorityError, AuthorityResult};
use crate::records::DeviceStateEvent;
use async_trait::async_trait;
use reqwest::Url;

/// Source of truth for raw device-telephony states.
#[async_trait]
pub trait DeviceStateAuthority: Send + Sync {
    /// Run the `DeviceStateList` action and return the raw event stream.
    async fn device_state_list(
        &self,
        credential: &Credential,
    ) -> AuthorityResult<Vec<DeviceStateEvent>>;
}

/// Device-state authority backed by the telephony AMI proxy.
pub struct HttpDeviceStateAuthority {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpDeviceStateAuthority {
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
impl DeviceStateAuthority for HttpDeviceStateAuthority {
    async fn device_state_list(
        &self,
        credential: &Credential,
    ) -> AuthorityResult<Vec<DeviceStateEvent>> {
        let url = crate::http::join(&self.base_url, "action/DeviceStateList")?;
        crate::http::send_json(self.http.post(url), credential).await
    }
}
