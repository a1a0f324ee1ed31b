//! # Domain Layer
//!
//! The domain layer contains the entities, patches and repository contracts
//! of the platform. It is independent of any framework or storage engine.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (User, Channel, Post, Comment, etc.)
//! - **value_objects**: Pagination and sorting types shared by searches
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Patches validate themselves before anything is persisted

pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
