//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers. The only one here
//! decides whether a request may reach a handler at all.

/// API key authentication middleware
pub mod auth;
