//! # TaskDesk API Server Library
//!
//! HTTP surface of TaskDesk: account sign-in, company registration and
//! the analytics tag.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `session`: Session cookies
//! - `middleware`: Security headers and session authentication
//! - `analytics`: Clarity tag rendering
//! - `routes`: API route handlers

pub mod analytics;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
