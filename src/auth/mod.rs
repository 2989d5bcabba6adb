mod dto;
pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod services;

pub use handlers::{admin_router, member_router};
