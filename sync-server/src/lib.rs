//! # marksync-server
//!
//! Sync server for client-encrypted bookmark collections.
//!
//! This crate implements a server that:
//! - Creates collections under unguessable random ids
//! - Stores each collection's payload as an opaque string
//! - Versions every write and rejects stale ones (optimistic concurrency)
//! - Never interprets the payload (clients encrypt before upload)
//!
//! ## Architecture
//!
//! ```text
//! Browser A ──┐                      ┌── Browser B
//!             │   HTTP + JSON        │
//!             ├─────────────────────►│
//!             │                      │
//!        ┌────┴──────────────────────┴────┐
//!        │        marksync-server         │
//!        │  http ─► service ─► storage    │
//!        │  ┌───────────────────────────┐ │
//!        │  │ SQLite / memory (payload, │ │
//!        │  │ version, lastUpdated)     │ │
//!        │  └───────────────────────────┘ │
//!        └────────────────────────────────┘
//! ```
//!
//! ## Endpoints
//!
//! - `POST /bookmarks` creates a collection
//! - `GET /bookmarks/:id` returns payload and version
//! - `GET /bookmarks/:id/version` and `/lastUpdated` are cheap polls
//! - `PUT /bookmarks/:id` replaces the payload, optionally guarded by
//!   `expectedVersion`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod server;
pub mod service;
pub mod storage;
