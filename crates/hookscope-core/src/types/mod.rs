//! # Types
//!
//! Session-agnostic handles used throughout the engine.
//!
//! Descriptors and values are produced by a [`crate::session::DebugSession`];
//! the engine only reads them.

pub mod address;
pub mod descriptor;
pub mod value;

// Re-export all public types
pub use address::Address;
pub use descriptor::{short_namespace, template_name, TemplateArg, TypeDescriptor, TypeField, TypeHandle, TypeKind};
pub use value::ValueRef;
