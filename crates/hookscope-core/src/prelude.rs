//! Common module for library exports

pub use crate::encoding::{ContainerKind, Link, NodeAlgorithm, NodeLayout, NodeTraits, Topology, ValueTraits};
pub use crate::error::{HookscopeError, HookscopeResult};
pub use crate::hook::{describe_hook, HookSummary};
pub use crate::inspect::{Element, InspectOptions, Inspection};
pub use crate::overrides::Overrides;
pub use crate::session::DebugSession;
pub use crate::snapshot::Snapshot;
pub use crate::types::{Address, TemplateArg, TypeDescriptor, TypeField, TypeHandle, TypeKind, ValueRef};
