pub mod vendor;
pub mod version;
