//! # Debug Session Trait
//!
//! The interface the engine needs from a live debug session (or a recorded
//! one, see [`crate::snapshot`]).
//!
//! The session plays two roles:
//!
//! - **Type/symbol oracle**: given a type name, return its descriptor.
//! - **Expression evaluator**: given an expression string, return a value.
//!   Evaluation may run code in the inspected process.
//!
//! Plus raw read access to inspected memory, which lets the engine follow
//! built-in node links without evaluating anything.
//!
//! ## Thread Safety
//!
//! A session is used from a single thread. Evaluation can pause and resume
//! the inspected process, so every call is blocking and runs to completion.

use crate::error::HookscopeResult;
use crate::types::{Address, TypeHandle, ValueRef};

/// Debug session interface
///
/// Implementations must never write inspected memory on behalf of the
/// engine. `bind_variable` only touches evaluator-side state.
pub trait DebugSession
{
    /// Look up a type by its fully qualified name
    ///
    /// Returns `Ok(None)` when the symbol service does not know the name.
    ///
    /// ## Errors
    ///
    /// Session failures other than "not found".
    fn lookup_type(&self, name: &str) -> HookscopeResult<Option<TypeHandle>>;

    /// Read `len` bytes of inspected memory starting at `address`
    ///
    /// ## Errors
    ///
    /// `MemoryUnavailable` if any part of the range cannot be read.
    fn read_memory(&self, address: Address, len: usize) -> HookscopeResult<Vec<u8>>;

    /// Evaluate an expression in the context of the inspected process
    ///
    /// ## Errors
    ///
    /// Any evaluator failure. Callers in the engine go through
    /// [`crate::bridge`], which adds the failed expression and a remediation
    /// hint.
    fn evaluate(&mut self, expression: &str) -> HookscopeResult<ValueRef>;

    /// Bind `value` to the evaluator variable `name` (including its `$` sigil)
    ///
    /// ## Errors
    ///
    /// Session failures while creating the variable.
    fn bind_variable(&mut self, name: &str, value: &ValueRef) -> HookscopeResult<()>;
}
