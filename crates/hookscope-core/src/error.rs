//! # Error Types
//!
//! General error handling for the reconstruction engine.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::Address;

/// Main error type for inspection operations
///
/// Every variant aborts the current traversal or resolution. Nothing in the
/// core swallows these; presenting partially-wrong container contents is worse
/// than failing visibly.
///
/// ## Error Categories
///
/// 1. **Resolution errors**: UnresolvedType, HookTagNotFound
/// 2. **Evaluator errors**: RemoteEvaluation
/// 3. **Internal faults**: AlgorithmTagFault
/// 4. **Memory errors**: MemoryUnavailable, BrokenLink, StepLimitExceeded
/// 5. **Input errors**: InvalidDescriptor, InvalidArgument, Snapshot, Io, Json
#[derive(Error, Debug)]
pub enum HookscopeError
{
    /// A node-traits or inner type could not be determined by any strategy
    ///
    /// The `hint` names the override key that would resolve the failure.
    #[error("Unresolved type {outer}::{member}; {hint}")]
    UnresolvedType
    {
        /// Stripped name of the outer type
        outer: String,
        /// Inner type or member name that was requested
        member: String,
        /// Remediation action for the operator
        hint: String,
    },

    /// No base hook of the value type carries the tag declared by the value traits
    ///
    /// This indicates a real type-system inconsistency, never a condition to skip.
    #[error("No base hook with tag {tag} in value type {value_type}")]
    HookTagNotFound
    {
        /// Value type that was scanned
        value_type: String,
        /// Tag declared by the value traits
        tag: String,
    },

    /// The debug session's evaluator rejected an expression
    #[error("Remote evaluation failed: {expression}: {reason}; {hint}")]
    RemoteEvaluation
    {
        /// The literal expression that was attempted
        expression: String,
        /// Evaluator's failure message
        reason: String,
        /// Remediation action for the operator
        hint: String,
    },

    /// An algorithm selector outside the closed set of known node algorithms
    ///
    /// The set of node algorithms is closed; seeing anything else means the
    /// classification tables are out of date, not that the input is wrong.
    #[error("Internal fault: unknown node algorithm tag {tag}")]
    AlgorithmTagFault
    {
        /// Template name of the unrecognized selector
        tag: String,
    },

    /// A type descriptor does not have the shape its template name promises
    #[error("Invalid type descriptor: {0}")]
    InvalidDescriptor(String),

    /// Inspected memory could not be read
    #[error("Memory unavailable at {address} ({len} bytes): {reason}")]
    MemoryUnavailable
    {
        /// Start of the requested range
        address: Address,
        /// Number of bytes requested
        len: usize,
        /// Session-provided reason
        reason: String,
    },

    /// A link the topology requires was null
    #[error("Broken {link} link at node {node}")]
    BrokenLink
    {
        /// Node whose link was followed
        node: Address,
        /// Link accessor name (`get_next`, `get_parent`, ...)
        link: &'static str,
    },

    /// A traversal followed more links than the configured ceiling allows
    #[error("Traversal exceeded step limit of {limit} link reads")]
    StepLimitExceeded
    {
        /// Configured ceiling
        limit: u64,
    },

    /// Invalid argument passed to an engine function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A snapshot file is malformed
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// I/O error (for snapshot files, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot JSON could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for `Result<T, HookscopeError>`
///
/// ```rust
/// use hookscope_core::error::HookscopeResult;
/// fn foo() -> HookscopeResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type HookscopeResult<T> = std::result::Result<T, HookscopeError>;
