//! Business logic services.
//!
//! Services contain the gatekeeping logic separated from HTTP handlers:
//! credential extraction, entitlement evaluation, the model registry and
//! the background work they hand off.

pub mod background;
pub mod credentials;
pub mod entitlement;
pub mod gate;
pub mod model_events;
pub mod model_registry;
pub mod model_seeder;
