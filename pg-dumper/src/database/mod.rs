//! Database access layer
//!
//! The schema inspector and statement execution for PostgreSQL, behind the
//! [`DatabaseProvider`] trait.

pub mod postgres;
pub mod traits;

// Re-export the main trait
pub use traits::DatabaseProvider;
