//! HTTP request handlers (route handlers).
//!
//! Handlers run after the auth middleware; authenticated ones can extract
//! `Extension<AuthContext>`.

/// Service health
pub mod health;
/// Admin registry endpoints
pub mod management;
/// Client-facing model listing
pub mod models;
