//! Core types and trait definitions for the wicket authentication core.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod credential;
pub mod error;
pub mod hasher;
pub mod session;
pub mod store;
pub mod subject;
pub mod workflow;

pub use error::{AuthError, Error, Result, StoreError};
