//! Per-entity repository traits.

pub mod devices;
pub mod lines;
pub mod rooms;
pub mod sessions;
pub mod tenants;
pub mod users;

pub use devices::DeviceRepo;
pub use lines::LineRepo;
pub use rooms::RoomRepo;
pub use sessions::SessionRepo;
pub use tenants::TenantRepo;
pub use users::UserRepo;
