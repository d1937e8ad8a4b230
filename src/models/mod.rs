//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the model descriptors upstream connections register.

/// Account (owner) model
pub mod account;
/// API key authentication model
pub mod api_key;
/// Bills, prepaid cards and charge sources
pub mod billing;
/// Model descriptors and name mappings
pub mod model;
