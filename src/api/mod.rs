//! JSON HTTP surface over the tree engine.
//!
//! Callers identify themselves with the `x-user-id` header; authentication
//! happens upstream.

pub mod server;

pub use server::{ApiServer, USER_HEADER, build_router, serve};
