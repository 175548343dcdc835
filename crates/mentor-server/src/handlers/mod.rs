//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for one predictive component.

pub mod categorize;
pub mod forecast;
pub mod health;
pub mod profile;

// Re-export all handlers for use in router
pub use categorize::*;
pub use forecast::*;
pub use health::*;
pub use profile::*;
