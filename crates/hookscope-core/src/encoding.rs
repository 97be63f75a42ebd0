//! Classification of intrusive-container policy types.
//!
//! Type names are matched exactly once, here. Everything downstream works on
//! the closed enums below, each with an explicit custom/unknown arm.

use std::fmt;

use crate::error::{HookscopeError, HookscopeResult};
use crate::types::{TemplateArg, TypeDescriptor, TypeHandle};

const BHTRAITS: &str = "boost::intrusive::bhtraits";
const MHTRAITS: &str = "boost::intrusive::mhtraits";
const TRIVIAL_VALUE_TRAITS: &str = "boost::intrusive::trivial_value_traits";

const GENERIC_HOOK: &str = "boost::intrusive::generic_hook";
const NODE_HOLDER: &str = "boost::intrusive::node_holder";
const BSTREE_IMPL: &str = "boost::intrusive::bstree_impl";

/// Public hook families (`<family>_base_hook`, `<family>_member_hook`)
const HOOK_FAMILIES: [&str; 7] = ["avl_set", "bs_set", "list", "set", "slist", "splay_set", "unordered_set"];

/// How many first-field levels a tree container may wrap `bstree_impl` in
const TREE_SEARCH_DEPTH: usize = 5;

/// `generic_hook<...>`
pub fn is_generic_hook(ty: &TypeDescriptor) -> bool
{
    ty.template_name() == GENERIC_HOOK
}

/// `node_holder<...>`, the wrapper that disambiguates same-shaped hook bases
pub fn is_node_holder(ty: &TypeDescriptor) -> bool
{
    ty.template_name() == NODE_HOLDER
}

/// One of the public `*_base_hook` / `*_member_hook` templates
pub fn is_public_hook(ty: &TypeDescriptor) -> bool
{
    let Some(local) = ty.template_name().strip_prefix("boost::intrusive::") else {
        return false;
    };
    let Some(family) = local
        .strip_suffix("_base_hook")
        .or_else(|| local.strip_suffix("_member_hook"))
    else {
        return false;
    };
    HOOK_FAMILIES.contains(&family)
}

/// Value-traits encodings
///
/// Decided once per traversal by [`ValueTraits::classify`].
#[derive(Debug, Clone)]
pub enum ValueTraits
{
    /// `bhtraits<Value, NodeTraits, LinkMode, Tag, ...>`: the value derives from its hook
    BaseHook
    {
        traits: TypeHandle,
        value: TypeHandle,
        node_traits: TypeHandle,
        tag: TypeHandle,
    },
    /// `mhtraits<Value, Hook, PtrToMember>`: the hook is a data member at a constant offset
    MemberHook
    {
        traits: TypeHandle,
        value: TypeHandle,
        hook: TypeHandle,
        offset: TemplateArg,
    },
    /// `trivial_value_traits<NodeTraits, LinkMode>`: node and value are the same object
    Trivial
    {
        traits: TypeHandle,
        node_traits: TypeHandle,
    },
    /// Anything else; expected to declare `node_traits`, `pointer` and `to_value_ptr`
    Custom
    {
        traits: TypeHandle
    },
}

impl ValueTraits
{
    /// Classify a value-traits type
    ///
    /// ## Errors
    ///
    /// `InvalidDescriptor` if a built-in encoding lacks the template arguments
    /// its definition requires.
    pub fn classify(ty: &TypeHandle) -> HookscopeResult<Self>
    {
        let traits = ty.clone();
        Ok(match ty.template_name() {
            BHTRAITS => ValueTraits::BaseHook {
                value: ty.type_argument(0)?.clone(),
                node_traits: ty.type_argument(1)?.clone(),
                tag: ty.type_argument(3)?.clone(),
                traits,
            },
            MHTRAITS => ValueTraits::MemberHook {
                value: ty.type_argument(0)?.clone(),
                hook: ty.type_argument(1)?.clone(),
                offset: ty.template_argument(2)?.clone(),
                traits,
            },
            TRIVIAL_VALUE_TRAITS => ValueTraits::Trivial {
                node_traits: ty.type_argument(0)?.clone(),
                traits,
            },
            _ => ValueTraits::Custom { traits },
        })
    }

    /// The classified value-traits type
    pub fn traits(&self) -> &TypeHandle
    {
        match self {
            ValueTraits::BaseHook { traits, .. }
            | ValueTraits::MemberHook { traits, .. }
            | ValueTraits::Trivial { traits, .. }
            | ValueTraits::Custom { traits } => traits,
        }
    }

    /// Short encoding name for logs
    pub fn encoding(&self) -> &'static str
    {
        match self {
            ValueTraits::BaseHook { .. } => "base-hook",
            ValueTraits::MemberHook { .. } => "member-hook",
            ValueTraits::Trivial { .. } => "trivial",
            ValueTraits::Custom { .. } => "custom",
        }
    }
}

/// Physical shape of a container's node graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology
{
    /// Singly or doubly linked ring through `next`
    Chain,
    /// Parent-linked binary tree with a header node
    Tree,
}

/// Node links the traversal engine follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link
{
    Next,
    Left,
    Right,
    Parent,
}

impl Link
{
    /// Static accessor on node traits (`get_next`, ...)
    pub const fn accessor(self) -> &'static str
    {
        match self {
            Link::Next => "get_next",
            Link::Left => "get_left",
            Link::Right => "get_right",
            Link::Parent => "get_parent",
        }
    }

    /// Data member holding the link in built-in nodes
    pub const fn field(self) -> &'static str
    {
        match self {
            Link::Next => "next_",
            Link::Left => "left_",
            Link::Right => "right_",
            Link::Parent => "parent_",
        }
    }
}

/// Built-in node layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLayout
{
    /// `list_node_traits<VoidPtr>`
    List,
    /// `slist_node_traits<VoidPtr>`
    Slist,
    /// `rbtree_node_traits<VoidPtr, OptimizeSize>`
    RbTree
    {
        compact: bool
    },
    /// `avltree_node_traits<VoidPtr, OptimizeSize>`
    AvlTree
    {
        compact: bool
    },
    /// `tree_node_traits<VoidPtr>`
    BsTree,
}

impl NodeLayout
{
    pub const fn topology(self) -> Topology
    {
        match self {
            NodeLayout::List | NodeLayout::Slist => Topology::Chain,
            NodeLayout::RbTree { .. } | NodeLayout::AvlTree { .. } | NodeLayout::BsTree => Topology::Tree,
        }
    }

    /// Low bits of `parent_` that hold color/balance instead of address
    pub const fn parent_tag_bits(self) -> u32
    {
        match self {
            NodeLayout::RbTree { compact: true } => 1,
            NodeLayout::AvlTree { compact: true } => 2,
            _ => 0,
        }
    }
}

/// Node-traits type plus its built-in layout, if it has one
#[derive(Debug, Clone)]
pub struct NodeTraits
{
    ty: TypeHandle,
    layout: Option<NodeLayout>,
}

impl NodeTraits
{
    /// Classify a node-traits type
    pub fn classify(ty: &TypeHandle) -> Self
    {
        let compact = || matches!(ty.template_argument(1), Ok(TemplateArg::Value(flag)) if flag.trim() == "true");
        let layout = match ty.template_name() {
            "boost::intrusive::list_node_traits" => Some(NodeLayout::List),
            "boost::intrusive::slist_node_traits" => Some(NodeLayout::Slist),
            "boost::intrusive::rbtree_node_traits" => Some(NodeLayout::RbTree { compact: compact() }),
            "boost::intrusive::avltree_node_traits" => Some(NodeLayout::AvlTree { compact: compact() }),
            "boost::intrusive::tree_node_traits" => Some(NodeLayout::BsTree),
            _ => None,
        };
        Self { ty: ty.clone(), layout }
    }

    pub fn ty(&self) -> &TypeHandle
    {
        &self.ty
    }

    /// Built-in layout; `None` for custom node traits
    pub fn layout(&self) -> Option<NodeLayout>
    {
        self.layout
    }

    /// Topology known from the layout alone
    pub fn topology(&self) -> Option<Topology>
    {
        self.layout.map(NodeLayout::topology)
    }

    /// Fully qualified static accessor for `link`
    pub fn accessor(&self, link: Link) -> String
    {
        format!("{}::{}", self.ty.stripped_name(), link.accessor())
    }
}

/// Closed set of node algorithm selectors carried by `generic_hook`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAlgorithm
{
    List,
    Slist,
    RbTree,
    AvlTree,
    BsTree,
}

impl NodeAlgorithm
{
    /// Map a `get_*_node_algo<...>` selector type to its algorithm
    ///
    /// ## Errors
    ///
    /// `AlgorithmTagFault` for any selector outside the known set.
    pub fn from_selector(selector: &TypeDescriptor) -> HookscopeResult<Self>
    {
        match selector.template_name() {
            "boost::intrusive::get_list_node_algo" => Ok(NodeAlgorithm::List),
            "boost::intrusive::get_slist_node_algo" => Ok(NodeAlgorithm::Slist),
            "boost::intrusive::get_set_node_algo" => Ok(NodeAlgorithm::RbTree),
            "boost::intrusive::get_avl_set_node_algo" => Ok(NodeAlgorithm::AvlTree),
            "boost::intrusive::get_bs_set_node_algo" => Ok(NodeAlgorithm::BsTree),
            other => Err(HookscopeError::AlgorithmTagFault { tag: other.to_string() }),
        }
    }

    /// Whether the selector carries an optimize-size flag as its second argument
    pub const fn takes_size_flag(self) -> bool
    {
        matches!(self, NodeAlgorithm::RbTree | NodeAlgorithm::AvlTree)
    }

    /// Name of the node-traits type this algorithm uses
    pub fn node_traits_name(self, void_pointer: &str, optimize_size: &str) -> String
    {
        match self {
            NodeAlgorithm::List => format!("boost::intrusive::list_node_traits<{void_pointer}>"),
            NodeAlgorithm::Slist => format!("boost::intrusive::slist_node_traits<{void_pointer}>"),
            NodeAlgorithm::RbTree => format!("boost::intrusive::rbtree_node_traits<{void_pointer}, {optimize_size}>"),
            NodeAlgorithm::AvlTree => format!("boost::intrusive::avltree_node_traits<{void_pointer}, {optimize_size}>"),
            NodeAlgorithm::BsTree => format!("boost::intrusive::tree_node_traits<{void_pointer}>"),
        }
    }
}

impl fmt::Display for NodeAlgorithm
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            NodeAlgorithm::List => "list",
            NodeAlgorithm::Slist => "slist",
            NodeAlgorithm::RbTree => "rbtree",
            NodeAlgorithm::AvlTree => "avltree",
            NodeAlgorithm::BsTree => "bstree",
        };
        f.write_str(name)
    }
}

/// Container families the front door knows how to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind
{
    /// `list<...>`, sentinel from `get_root_node()`
    List,
    /// `slist<...>`, sentinel from `get_root_node()`
    Slist,
    /// Anything built on `bstree_impl`, header from `header_ptr()`
    Tree,
}

impl ContainerKind
{
    /// Classify a container type, `None` if it is not an intrusive container
    pub fn classify(ty: &TypeHandle) -> Option<Self>
    {
        match ty.template_name() {
            "boost::intrusive::list" => return Some(ContainerKind::List),
            "boost::intrusive::slist" => return Some(ContainerKind::Slist),
            _ => {}
        }
        let mut current = ty.clone();
        for _ in 0..TREE_SEARCH_DEPTH {
            if current.template_name() == BSTREE_IMPL {
                return Some(ContainerKind::Tree);
            }
            let next = current.first_field().ok()?.ty.clone();
            current = next;
        }
        None
    }

    pub const fn topology(self) -> Topology
    {
        match self {
            ContainerKind::List | ContainerKind::Slist => Topology::Chain,
            ContainerKind::Tree => Topology::Tree,
        }
    }

    /// Container method returning the sentinel node pointer
    pub const fn sentinel_method(self) -> &'static str
    {
        match self {
            ContainerKind::List | ContainerKind::Slist => "get_root_node",
            ContainerKind::Tree => "header_ptr",
        }
    }
}

/// Iterator families whose node pointer can be read without evaluation
pub fn is_builtin_iterator(ty: &TypeDescriptor) -> bool
{
    matches!(
        ty.template_name(),
        "boost::intrusive::list_iterator" | "boost::intrusive::slist_iterator" | "boost::intrusive::tree_iterator"
    )
}
