//! Operator-supplied overrides.
//!
//! Two tables, consulted before any built-in knowledge:
//!
//! - inner types: `(outer type, member name) -> type name`
//! - static methods: `qualified function name -> replacement callable`
//!
//! An `Overrides` value is passed explicitly to every inspection instead of
//! living in a global, so independent inspections (and tests) can run with
//! isolated override sets. Entries are only added or removed by explicit
//! operator action; nothing in the engine clears them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::error::{HookscopeError, HookscopeResult};
use crate::session::DebugSession;
use crate::types::ValueRef;

/// Replacement for a static method that would otherwise be evaluated remotely
///
/// Receives the session (for memory reads) and the argument values in call order.
pub type StaticMethod = Arc<dyn Fn(&mut dyn DebugSession, &[ValueRef]) -> HookscopeResult<ValueRef> + Send + Sync>;

/// Override tables for one inspector
#[derive(Clone, Default)]
pub struct Overrides
{
    inner_types: HashMap<(String, String), String>,
    static_methods: HashMap<String, StaticMethod>,
}

impl Overrides
{
    /// Create empty override tables
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Substitute `resolved` whenever `outer::member` is looked up
    ///
    /// `outer` is matched against the typedef-stripped name of the outer type.
    pub fn register_inner_type(&mut self, outer: impl Into<String>, member: impl Into<String>, resolved: impl Into<String>)
    {
        let key = (outer.into(), member.into());
        let resolved = resolved.into();
        debug!(outer = %key.0, member = %key.1, resolved = %resolved, "registered inner type override");
        self.inner_types.insert(key, resolved);
    }

    /// Call `method` instead of evaluating `function` in the inspected process
    pub fn register_static_method<F>(&mut self, function: impl Into<String>, method: F)
    where
        F: Fn(&mut dyn DebugSession, &[ValueRef]) -> HookscopeResult<ValueRef> + Send + Sync + 'static,
    {
        let function = function.into();
        debug!(function = %function, "registered static method override");
        self.static_methods.insert(function, Arc::new(method));
    }

    /// Remove an inner type override, returning the previous substitution
    pub fn remove_inner_type(&mut self, outer: &str, member: &str) -> Option<String>
    {
        self.inner_types.remove(&(outer.to_string(), member.to_string()))
    }

    /// Remove a static method override
    pub fn remove_static_method(&mut self, function: &str) -> bool
    {
        self.static_methods.remove(function).is_some()
    }

    /// Substitute type name registered for `outer::member`
    pub fn inner_type(&self, outer: &str, member: &str) -> Option<&str>
    {
        self.inner_types
            .get(&(outer.to_string(), member.to_string()))
            .map(String::as_str)
    }

    /// Replacement registered for `function`
    pub fn static_method(&self, function: &str) -> Option<StaticMethod>
    {
        self.static_methods.get(function).cloned()
    }

    pub fn is_empty(&self) -> bool
    {
        self.inner_types.is_empty() && self.static_methods.is_empty()
    }

    /// Register a parsed `OUTER::MEMBER=TYPE` entry
    pub fn apply_inner_type(&mut self, entry: InnerTypeOverride)
    {
        self.register_inner_type(entry.outer, entry.member, entry.resolved);
    }
}

impl fmt::Debug for Overrides
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let mut functions: Vec<&String> = self.static_methods.keys().collect();
        functions.sort();
        f.debug_struct("Overrides")
            .field("inner_types", &self.inner_types)
            .field("static_methods", &functions)
            .finish()
    }
}

/// Textual inner type override, `OUTER::MEMBER=TYPE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerTypeOverride
{
    pub outer: String,
    pub member: String,
    pub resolved: String,
}

impl FromStr for InnerTypeOverride
{
    type Err = HookscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let invalid = || HookscopeError::InvalidArgument(format!("expected OUTER::MEMBER=TYPE, got {s:?}"));
        let (qualified, resolved) = s.split_once('=').ok_or_else(invalid)?;
        let split = last_scope_separator(qualified).ok_or_else(invalid)?;
        let (outer, member) = (qualified[..split].trim(), qualified[split + 2..].trim());
        let resolved = resolved.trim();
        if outer.is_empty() || member.is_empty() || resolved.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            outer: outer.to_string(),
            member: member.to_string(),
            resolved: resolved.to_string(),
        })
    }
}

/// Byte index of the last `::` outside template brackets
fn last_scope_separator(name: &str) -> Option<usize>
{
    let bytes = name.as_bytes();
    let mut depth = 0i32;
    let mut found = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth -= 1,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                found = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    found
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_inner_type_override()
    {
        let entry: InnerTypeOverride = "my::traits<a::b, 3>::node_traits = my::node_traits".parse().unwrap();
        assert_eq!(entry.outer, "my::traits<a::b, 3>");
        assert_eq!(entry.member, "node_traits");
        assert_eq!(entry.resolved, "my::node_traits");
    }

    #[test]
    fn test_parse_inner_type_override_rejects_garbage()
    {
        assert!("no_separator".parse::<InnerTypeOverride>().is_err());
        assert!("outer_only=x".parse::<InnerTypeOverride>().is_err());
        assert!("a::b=".parse::<InnerTypeOverride>().is_err());
    }

    #[test]
    fn test_register_and_remove()
    {
        let mut overrides = Overrides::new();
        assert!(overrides.is_empty());

        overrides.register_inner_type("T", "pointer", "U*");
        assert_eq!(overrides.inner_type("T", "pointer"), Some("U*"));
        assert_eq!(overrides.inner_type("T", "node_traits"), None);

        overrides.register_static_method("T::get_next", |_, args| Ok(args[0].clone()));
        assert!(overrides.static_method("T::get_next").is_some());
        assert!(overrides.remove_static_method("T::get_next"));
        assert_eq!(overrides.remove_inner_type("T", "pointer"), Some("U*".to_string()));
        assert!(overrides.is_empty());
    }
}
