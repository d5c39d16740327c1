//! # uuidlens Authority
//!
//! [`Authority`](uuidlens_core::Authority) implementation backed by the
//! management REST API.
//!
//! Requests carry either basic credentials with the tenant key header or an
//! OAuth client-credentials bearer token. Response bodies are mapped onto
//! [`EntityRecord`](uuidlens_core::EntityRecord) by [`map_entity`], and
//! transport or status errors become
//! [`ResolutionFailure`](uuidlens_core::ResolutionFailure)s.

mod auth;
mod client;
mod error;
mod mapping;

pub use auth::{Authenticator, TENANT_HEADER};
pub use client::RestAuthority;
pub use error::AuthorityError;
pub use mapping::map_entity;
