mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub use handlers::{admin_router, public_router};
