pub mod analysis;
pub mod payment;
pub mod subscription;
pub mod user;
