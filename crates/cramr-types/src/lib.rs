//! Shared Cramr types.
//!
//! Wire shapes for the HTTP API and push channel live here so the storage,
//! core and API crates agree on one definition.

pub mod api;
pub mod courses;
pub mod events;
pub mod models;
