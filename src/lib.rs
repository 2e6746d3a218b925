//! Playground tree engine library.
//!
//! Ordered, nested containers (collections, folders, items) scoped to
//! workspaces, with kanban boards owned by list items.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
