pub mod cache;
pub mod remote;

pub use cache::LicenseAndVariantCache;
pub use remote::{HttpRemoteApi, RemoteApi};
