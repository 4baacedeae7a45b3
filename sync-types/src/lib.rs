//! # sync-types
//!
//! Wire format types for the marksync bookmark sync protocol.
//!
//! This crate provides the foundational types shared by the server and
//! clients:
//! - [`CollectionId`], [`Version`], [`Timestamp`] - Identity and ordering types
//! - [`api`] - JSON request and response bodies
//! - [`TypesError`] - Parse errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
mod error;
mod ids;
mod timestamp;

pub use error::TypesError;
pub use ids::{CollectionId, Version, COLLECTION_ID_LEN};
pub use timestamp::Timestamp;
