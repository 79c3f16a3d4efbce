//! Read-only clients for the external authorities.
//!
//! Each authority is the source of truth for one entity category and is
//! consumed through a trait so the reconciliation engine can be exercised
//! against in-memory snapshots in tests:
//! - Credential issuing (identity service)
//! - Tenants and sessions (identity service)
//! - Users with nested lines (directory service)
//! - Raw device states (device-telephony-state service)

pub mod credential;
pub mod device_state;
pub mod directory;
pub mod error;
pub mod records;
pub mod sessions;
pub mod tenants;

mod http;

pub use credential::{Credential, CredentialIssuer, HttpCredentialIssuer};
pub use device_state::{DeviceStateAuthority, HttpDeviceStateAuthority};
pub use directory::{DirectoryAuthority, HttpDirectoryAuthority};
pub use error::{AuthorityError, AuthorityResult};
pub use sessions::{HttpSessionAuthority, SessionAuthority};
pub use tenants::{HttpTenantAuthority, TenantAuthority};
