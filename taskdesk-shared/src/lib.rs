//! # TaskDesk Shared Library
//!
//! Domain types and account logic used by the TaskDesk API server.
//!
//! ## Module Organization
//!
//! - `models`: database models and their queries
//! - `db`: connection pool and migrations
//! - `store`: persistence seam with PostgreSQL and in-memory backends
//! - `auth`: password hashing and session tokens
//! - `identity`: user and role management, sign-in
//! - `registration`: the company registration pipeline

pub mod auth;
pub mod db;
pub mod identity;
pub mod models;
pub mod registration;
pub mod store;

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
