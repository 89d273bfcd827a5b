pub mod notification;
pub mod ports;
pub mod subscription;
pub mod user;
pub mod weather;
