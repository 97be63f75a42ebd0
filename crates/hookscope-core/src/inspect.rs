//! # Inspection
//!
//! One inspection request against a debug session.
//!
//! An [`Inspection`] borrows the session and the operator's [`Overrides`] for
//! the duration of the request. All engine components hang off it:
//!
//! - [`crate::bridge`]: remote evaluation
//! - [`crate::resolver`]: node-traits resolution
//! - [`crate::translate`]: node to value translation
//! - [`crate::traverse`]: chain and tree walks
//! - [`crate::hook`]: hook unwrapping
//!
//! ## Example
//!
//! ```rust,no_run
//! use hookscope_core::{Inspection, Overrides, Snapshot};
//!
//! # fn main() -> hookscope_core::HookscopeResult<()> {
//! let mut session = Snapshot::from_file("list.json")?;
//! let overrides = Overrides::new();
//! let mut inspection = Inspection::new(&mut session, &overrides);
//!
//! let container = inspection.evaluate("v_list", "check the variable name")?;
//! for element in inspection.traverse(&container)? {
//!     let element = element?;
//!     println!("{}", element.label());
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;

use tracing::{debug, instrument};

use crate::encoding::{is_builtin_iterator, ContainerKind, NodeTraits, Topology, ValueTraits};
use crate::error::{HookscopeError, HookscopeResult};
use crate::overrides::Overrides;
use crate::session::DebugSession;
use crate::traverse::{ChainTraversal, Traversal, TreeTraversal};
use crate::types::{TypeHandle, ValueRef};

/// Default ceiling on link reads per traversal
pub const DEFAULT_STEP_LIMIT: u64 = 1 << 24;

/// Tunables for one inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectOptions
{
    /// Maximum number of node links one traversal may follow, `None` for no limit
    pub step_limit: Option<u64>,
}

impl Default for InspectOptions
{
    fn default() -> Self
    {
        Self {
            step_limit: Some(DEFAULT_STEP_LIMIT),
        }
    }
}

/// One element produced by a traversal
#[derive(Debug, Clone)]
pub struct Element
{
    /// Position in traversal order, starting at 0
    pub ordinal: usize,
    /// Node pointer the element was reached through
    pub node: ValueRef,
    /// Value pointer translated from `node`
    pub value: ValueRef,
}

impl Element
{
    /// `[ordinal; 0xaddr]`, the address being the value pointer's target
    pub fn label(&self) -> String
    {
        match self.value.pointer_target() {
            Ok(address) => format!("[{}; {address}]", self.ordinal),
            Err(_) => format!("[{}; ?]", self.ordinal),
        }
    }
}

impl fmt::Display for Element
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.label())
    }
}

/// A single inspection request
pub struct Inspection<'a>
{
    session: &'a mut dyn DebugSession,
    overrides: &'a Overrides,
    options: InspectOptions,
}

impl<'a> Inspection<'a>
{
    /// Start an inspection with default options
    pub fn new(session: &'a mut dyn DebugSession, overrides: &'a Overrides) -> Self
    {
        Self::with_options(session, overrides, InspectOptions::default())
    }

    /// Start an inspection with explicit options
    pub fn with_options(session: &'a mut dyn DebugSession, overrides: &'a Overrides, options: InspectOptions) -> Self
    {
        Self {
            session,
            overrides,
            options,
        }
    }

    pub fn options(&self) -> InspectOptions
    {
        self.options
    }

    pub fn overrides(&self) -> &'a Overrides
    {
        self.overrides
    }

    pub(crate) fn session_ref(&self) -> &dyn DebugSession
    {
        &*self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut dyn DebugSession
    {
        &mut *self.session
    }

    /// Walk an intrusive container
    ///
    /// The container type decides the topology: `list`/`slist` are chains
    /// rooted at `get_root_node()`, anything built on `bstree_impl` is a tree
    /// headed by `header_ptr()`. Both sentinels come from the inspected
    /// process via the remote evaluation bridge.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if `container` is not an intrusive container;
    /// resolution and evaluation errors from the components involved.
    #[instrument(level = "debug", skip_all, fields(container = %container.ty().name))]
    pub fn traverse<'i>(&'i mut self, container: &ValueRef) -> HookscopeResult<Traversal<'i, 'a>>
    {
        let kind = ContainerKind::classify(container.ty()).ok_or_else(|| {
            HookscopeError::InvalidArgument(format!("{} is not an intrusive container", container.ty().name))
        })?;
        let value_traits = container.ty().first_field()?.ty.type_argument(0)?.clone();
        debug!(?kind, value_traits = %value_traits.name, "opening container");

        let sentinel = self.call_method(container, kind.sentinel_method(), &[])?;
        match kind.topology() {
            Topology::Chain => self.chain(&value_traits, sentinel).map(Traversal::Chain),
            Topology::Tree => self.tree(&value_traits, sentinel).map(Traversal::Tree),
        }
    }

    /// Walk a chain starting after `sentinel`
    ///
    /// ## Errors
    ///
    /// Resolution errors, or `InvalidDescriptor` if the node traits describe a tree.
    pub fn chain<'i>(&'i mut self, value_traits: &TypeHandle, sentinel: ValueRef) -> HookscopeResult<ChainTraversal<'i, 'a>>
    {
        let (value_traits, node_traits) = self.classify(value_traits, Topology::Chain)?;
        Ok(ChainTraversal::new(self, value_traits, node_traits, sentinel))
    }

    /// Walk a tree in order, starting from the leftmost node under `header`
    ///
    /// ## Errors
    ///
    /// Resolution errors, or `InvalidDescriptor` if the node traits describe a chain.
    pub fn tree<'i>(&'i mut self, value_traits: &TypeHandle, header: ValueRef) -> HookscopeResult<TreeTraversal<'i, 'a>>
    {
        let (value_traits, node_traits) = self.classify(value_traits, Topology::Tree)?;
        Ok(TreeTraversal::new(self, value_traits, node_traits, header))
    }

    fn classify(&mut self, value_traits: &TypeHandle, topology: Topology) -> HookscopeResult<(ValueTraits, NodeTraits)>
    {
        let node_traits = NodeTraits::classify(&self.resolve_node_traits(value_traits)?);
        if let Some(actual) = node_traits.topology() {
            if actual != topology {
                return Err(HookscopeError::InvalidDescriptor(format!(
                    "{} describes a {actual:?} but a {topology:?} traversal was requested",
                    node_traits.ty().stripped_name()
                )));
            }
        }
        Ok((ValueTraits::classify(value_traits)?, node_traits))
    }

    /// Value pointer for `node` under the given value traits
    ///
    /// ## Errors
    ///
    /// See [`Inspection::to_value`].
    pub fn resolve_value(&mut self, value_traits: &TypeHandle, node: &ValueRef) -> HookscopeResult<ValueRef>
    {
        let value_traits = ValueTraits::classify(value_traits)?;
        self.to_value(&value_traits, node)
    }

    /// Node pointer an intrusive iterator points at
    ///
    /// Built-in iterators keep it in `members_.nodeptr_`; anything else is
    /// asked through its `pointed_node()` method.
    ///
    /// ## Errors
    ///
    /// Memory or evaluation errors.
    pub fn pointed_node(&mut self, iterator: &ValueRef) -> HookscopeResult<ValueRef>
    {
        if is_builtin_iterator(iterator.ty()) {
            let members = self.member(iterator, "members_")?;
            return self.member(&members, "nodeptr_");
        }
        self.call_method(iterator, "pointed_node", &[])
    }

    /// Value pointer an intrusive iterator refers to
    ///
    /// The iterator's first template argument is its value traits.
    ///
    /// ## Errors
    ///
    /// See [`Inspection::pointed_node`] and [`Inspection::resolve_value`].
    pub fn value_from_iterator(&mut self, iterator: &ValueRef) -> HookscopeResult<ValueRef>
    {
        let value_traits = iterator.ty().type_argument(0)?.clone();
        let node = self.pointed_node(iterator)?;
        self.resolve_value(&value_traits, &node)
    }
}
