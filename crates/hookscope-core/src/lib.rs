//! # hookscope-core
//!
//! Reconstruction engine for intrusive lists and trees, working only from
//! debugger-visible memory and type metadata.
//!
//! Given a container, or a raw sentinel plus its value-traits type, the
//! engine:
//! - Works out how nodes are embedded in values (base hook, member hook,
//!   trivial, or custom value traits)
//! - Resolves the node-traits type that describes the node layout
//! - Walks the nodes (linked chain or threaded in-order tree walk)
//! - Translates every node back into a pointer to its enclosing value
//!
//! Whenever static metadata is not enough, the engine asks the inspected
//! process to evaluate an expression through a [`DebugSession`]. Operator
//! [`Overrides`] take precedence over both.
//!
//! ## Sessions
//!
//! The engine is written against the [`DebugSession`] trait. [`Snapshot`] is
//! an in-memory implementation loaded from JSON, used by the CLI and tests.
//!
//! ## Failure model
//!
//! Every resolution or evaluation failure surfaces as a [`HookscopeError`].
//! Nothing is skipped silently; showing wrong container contents is worse
//! than failing.

pub mod bridge;
pub mod encoding;
pub mod error;
pub mod hook;
pub mod inspect;
pub mod layout;
pub mod overrides;
pub mod prelude;
pub mod resolver;
pub mod session;
pub mod snapshot;
pub mod translate;
pub mod traverse;
pub mod types;

// Re-export commonly used types
pub use error::{HookscopeError, HookscopeResult};
pub use hook::{describe_hook, HookSummary};
pub use inspect::{Element, InspectOptions, Inspection, DEFAULT_STEP_LIMIT};
pub use overrides::{InnerTypeOverride, Overrides, StaticMethod};
pub use session::DebugSession;
pub use snapshot::Snapshot;
pub use traverse::{ChainTraversal, Traversal, TreeTraversal};
pub use types::{Address, TypeDescriptor, TypeHandle, ValueRef};
