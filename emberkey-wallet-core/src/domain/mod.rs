//! Domain layer
//!
//! Entities and value objects shared by the core components.

pub mod entities;

// Re-export domain components
pub use entities::*;
