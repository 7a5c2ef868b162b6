//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `subscription` - Orders, subscription lifecycle, and webhook trust

pub mod foundation;
pub mod subscription;
