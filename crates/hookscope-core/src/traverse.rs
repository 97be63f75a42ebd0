//! Traversal engine.
//!
//! Lazy, restartable walks over the two supported topologies:
//!
//! - **Chain**: follow `next` from the sentinel until the sentinel comes back
//!   (or a null link, for linear singly linked lists).
//! - **Tree**: threaded in-order walk over a parent-linked binary tree. No
//!   recursion and no stack; each step keeps O(1) state.
//!
//! Nothing is snapshotted. Every traversal re-derives the sequence from live
//! memory, so two traversals of the same container are independent. Node
//! identity is address identity.
//!
//! Each traversal counts the links it follows and fails with
//! `StepLimitExceeded` past the configured ceiling, so corrupted (cyclic)
//! structures terminate. After yielding an error a traversal is fused.

use std::slice;

use tracing::{debug, trace};

use crate::encoding::{Link, NodeTraits, ValueTraits};
use crate::error::{HookscopeError, HookscopeResult};
use crate::inspect::{Element, Inspection};
use crate::types::{Address, ValueRef};

impl Inspection<'_>
{
    /// Follow one link of `node`
    ///
    /// Override tables first, then the built-in field for known layouts
    /// (masking tag bits out of compact parent links), then the node traits'
    /// static accessor evaluated remotely.
    ///
    /// ## Errors
    ///
    /// Memory or evaluation errors.
    pub fn follow(&mut self, node_traits: &NodeTraits, link: Link, node: &ValueRef) -> HookscopeResult<ValueRef>
    {
        let accessor = node_traits.accessor(link);
        let builtin = node_traits.layout().filter(|_| self.overrides().static_method(&accessor).is_none());
        let Some(layout) = builtin else {
            return self.call_static(&accessor, slice::from_ref(node));
        };

        let next = self.member(node, link.field())?;
        let bits = layout.parent_tag_bits();
        if link == Link::Parent && bits > 0 {
            let target = next.pointer_target()?.without_low_bits(bits);
            return Ok(ValueRef::pointer(next.ty().clone(), target));
        }
        Ok(next)
    }
}

/// Link-following state shared by both traversal kinds
struct Walker<'i, 'a>
{
    inspection: &'i mut Inspection<'a>,
    value_traits: ValueTraits,
    node_traits: NodeTraits,
    sentinel: ValueRef,
    steps: u64,
    ordinal: usize,
}

impl<'i, 'a> Walker<'i, 'a>
{
    fn new(inspection: &'i mut Inspection<'a>, value_traits: ValueTraits, node_traits: NodeTraits, sentinel: ValueRef) -> Self
    {
        debug!(
            encoding = value_traits.encoding(),
            node_traits = node_traits.ty().stripped_name(),
            sentinel = %sentinel,
            "starting traversal"
        );
        Self {
            inspection,
            value_traits,
            node_traits,
            sentinel,
            steps: 0,
            ordinal: 0,
        }
    }

    fn inspection(&self) -> &Inspection<'a>
    {
        &*self.inspection
    }

    fn follow(&mut self, link: Link, node: &ValueRef) -> HookscopeResult<ValueRef>
    {
        self.steps += 1;
        if let Some(limit) = self.inspection.options().step_limit {
            if self.steps > limit {
                return Err(HookscopeError::StepLimitExceeded { limit });
            }
        }
        self.inspection.follow(&self.node_traits, link, node)
    }

    /// Follow a link that must not be null
    fn follow_required(&mut self, link: Link, node: &ValueRef) -> HookscopeResult<ValueRef>
    {
        let next = self.follow(link, node)?;
        if next.is_null() {
            return Err(HookscopeError::BrokenLink {
                node: node.pointer_target().unwrap_or(Address::ZERO),
                link: link.accessor(),
            });
        }
        Ok(next)
    }

    fn is_sentinel(&self, node: &ValueRef) -> bool
    {
        node.same_node(&self.sentinel)
    }

    /// Descend `left` links until the leftmost node under `node`
    fn leftmost(&mut self, mut node: ValueRef) -> HookscopeResult<ValueRef>
    {
        loop {
            let left = self.follow(Link::Left, &node)?;
            if left.is_null() {
                return Ok(node);
            }
            node = left;
        }
    }

    fn element(&mut self, node: ValueRef) -> HookscopeResult<Element>
    {
        let value = self.inspection.to_value(&self.value_traits, &node)?;
        let element = Element {
            ordinal: self.ordinal,
            node,
            value,
        };
        trace!(ordinal = element.ordinal, value = %element.value, "element");
        self.ordinal += 1;
        Ok(element)
    }
}

/// Cursor position
enum Cursor
{
    Start,
    At(ValueRef),
    Done,
}

/// Drive a fallible step function as a fused iterator
fn advance<F>(cursor: &mut Cursor, step: F) -> Option<HookscopeResult<ValueRef>>
where
    F: FnOnce(Option<ValueRef>) -> HookscopeResult<Option<ValueRef>>,
{
    let previous = match std::mem::replace(cursor, Cursor::Done) {
        Cursor::Done => return None,
        Cursor::Start => None,
        Cursor::At(node) => Some(node),
    };
    match step(previous) {
        Ok(Some(node)) => {
            *cursor = Cursor::At(node.clone());
            Some(Ok(node))
        }
        Ok(None) => None,
        Err(err) => Some(Err(err)),
    }
}

/// Walk of a singly or doubly linked chain
///
/// Yields every node after the sentinel, in link order.
pub struct ChainTraversal<'i, 'a>
{
    walker: Walker<'i, 'a>,
    cursor: Cursor,
}

impl<'i, 'a> ChainTraversal<'i, 'a>
{
    /// The inspection driving this walk, for reading elements between steps
    pub fn inspection(&self) -> &Inspection<'a>
    {
        self.walker.inspection()
    }

    pub(crate) fn new(inspection: &'i mut Inspection<'a>, value_traits: ValueTraits, node_traits: NodeTraits, sentinel: ValueRef) -> Self
    {
        Self {
            walker: Walker::new(inspection, value_traits, node_traits, sentinel),
            cursor: Cursor::Start,
        }
    }

    fn step(walker: &mut Walker<'i, 'a>, previous: Option<ValueRef>) -> HookscopeResult<Option<ValueRef>>
    {
        let from = previous.unwrap_or_else(|| walker.sentinel.clone());
        let next = walker.follow(Link::Next, &from)?;
        if next.is_null() || walker.is_sentinel(&next) {
            return Ok(None);
        }
        Ok(Some(next))
    }
}

impl Iterator for ChainTraversal<'_, '_>
{
    type Item = HookscopeResult<Element>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let walker = &mut self.walker;
        let node = match advance(&mut self.cursor, |previous| Self::step(walker, previous))? {
            Ok(node) => node,
            Err(err) => return Some(Err(err)),
        };
        let element = self.walker.element(node);
        if element.is_err() {
            self.cursor = Cursor::Done;
        }
        Some(element)
    }
}

/// Threaded in-order walk of a parent-linked binary tree
///
/// The header (sentinel) is the parent of the root; its left link points
/// into the tree. An empty tree's header links back to itself.
pub struct TreeTraversal<'i, 'a>
{
    walker: Walker<'i, 'a>,
    cursor: Cursor,
}

impl<'i, 'a> TreeTraversal<'i, 'a>
{
    /// The inspection driving this walk, for reading elements between steps
    pub fn inspection(&self) -> &Inspection<'a>
    {
        self.walker.inspection()
    }

    pub(crate) fn new(inspection: &'i mut Inspection<'a>, value_traits: ValueTraits, node_traits: NodeTraits, header: ValueRef) -> Self
    {
        Self {
            walker: Walker::new(inspection, value_traits, node_traits, header),
            cursor: Cursor::Start,
        }
    }

    /// First node: leftmost node reachable from the header's left child
    fn first(walker: &mut Walker<'i, 'a>) -> HookscopeResult<Option<ValueRef>>
    {
        let header = walker.sentinel.clone();
        let start = walker.follow(Link::Left, &header)?;
        if start.is_null() || walker.is_sentinel(&start) {
            return Ok(None);
        }
        walker.leftmost(start).map(Some)
    }

    /// In-order successor of `node`
    ///
    /// With a right subtree, the successor is its leftmost node. Without one,
    /// climb until we leave a left subtree; the parent reached is the
    /// successor. Reaching the header ends the walk.
    fn successor(walker: &mut Walker<'i, 'a>, node: ValueRef) -> HookscopeResult<Option<ValueRef>>
    {
        let right = walker.follow(Link::Right, &node)?;
        if !right.is_null() {
            return walker.leftmost(right).map(Some);
        }

        let mut child = node;
        loop {
            let parent = walker.follow_required(Link::Parent, &child)?;
            if walker.is_sentinel(&parent) {
                return Ok(None);
            }
            let left = walker.follow(Link::Left, &parent)?;
            if left.same_node(&child) {
                return Ok(Some(parent));
            }
            child = parent;
        }
    }

    fn step(walker: &mut Walker<'i, 'a>, previous: Option<ValueRef>) -> HookscopeResult<Option<ValueRef>>
    {
        match previous {
            None => Self::first(walker),
            Some(node) => Self::successor(walker, node),
        }
    }
}

impl Iterator for TreeTraversal<'_, '_>
{
    type Item = HookscopeResult<Element>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let walker = &mut self.walker;
        let node = match advance(&mut self.cursor, |previous| Self::step(walker, previous))? {
            Ok(node) => node,
            Err(err) => return Some(Err(err)),
        };
        let element = self.walker.element(node);
        if element.is_err() {
            self.cursor = Cursor::Done;
        }
        Some(element)
    }
}

/// Traversal of whichever topology a container uses
pub enum Traversal<'i, 'a>
{
    Chain(ChainTraversal<'i, 'a>),
    Tree(TreeTraversal<'i, 'a>),
}

impl<'a> Traversal<'_, 'a>
{
    /// The inspection driving this walk
    pub fn inspection(&self) -> &Inspection<'a>
    {
        match self {
            Traversal::Chain(chain) => chain.inspection(),
            Traversal::Tree(tree) => tree.inspection(),
        }
    }
}

impl Iterator for Traversal<'_, '_>
{
    type Item = HookscopeResult<Element>;

    fn next(&mut self) -> Option<Self::Item>
    {
        match self {
            Traversal::Chain(chain) => chain.next(),
            Traversal::Tree(tree) => tree.next(),
        }
    }
}
