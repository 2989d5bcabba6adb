//! Credential store for member and admin accounts.

#[cfg(test)]
pub mod memory;
pub mod model;
pub mod store;

pub use model::{Account, AccountFilter, AccountKind, AccountPatch, AccountView, Asset, Role};
pub use store::{AccountStore, PgAccountStore};
