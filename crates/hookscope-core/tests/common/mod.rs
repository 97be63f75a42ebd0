//! Boost-shaped fixtures shared by the integration tests
//!
//! Types follow the real intrusive library's layout: public hook derives from
//! `generic_hook`, which derives from `node_holder`, which derives from the
//! node. Names only need to be self-consistent.

#![allow(dead_code)]

use std::sync::Arc;

use hookscope_core::types::{Address, TypeDescriptor, TypeHandle, ValueRef};
use hookscope_core::Snapshot;

pub const LIST_NODE: &str = "boost::intrusive::list_node<void*>";
pub const LIST_NODE_TRAITS: &str = "boost::intrusive::list_node_traits<void*>";
pub const LIST_ALGO: &str = "boost::intrusive::get_list_node_algo<void*>";
pub const RB_NODE: &str = "boost::intrusive::compact_rbtree_node<void*>";
pub const RB_NODE_TRAITS: &str = "boost::intrusive::rbtree_node_traits<void*, true>";
pub const SAFE_LINK: &str = "boost::intrusive::link_mode_type::safe_link";
pub const DFT_TAG: &str = "boost::intrusive::dft_tag";

pub const ITEM: &str = "my::item";
pub const TAG_A: &str = "my::tag_a";
pub const TAG_B: &str = "my::tag_b";
pub const RECORD: &str = "my::record";
pub const MEMBER_HOOK: &str = "boost::intrusive::list_member_hook<>";

/// Offset of the `TAG_B` hook inside `ITEM`
pub const TAG_B_OFFSET: u64 = 16;
/// Offset of `hook_` inside `RECORD`
pub const RECORD_HOOK_OFFSET: u64 = 24;

pub const LIST_HEADER: u64 = 0x1000;
pub const ITEMS: [u64; 3] = [0x2000, 0x2100, 0x2200];

pub fn pointer_to(name: &str) -> TypeHandle
{
    Arc::new(TypeDescriptor::pointer(format!("{name} *"), name, 8))
}

pub fn node_pointer(node_type: &str, address: u64) -> ValueRef
{
    ValueRef::pointer(pointer_to(node_type), Address::new(address))
}

fn void_pointer(snapshot: &mut Snapshot) -> TypeHandle
{
    snapshot.add_type(TypeDescriptor::other("void"));
    pointer_to("void")
}

/// List node, list node traits and the list algorithm selector
pub fn add_list_types(snapshot: &mut Snapshot) -> TypeHandle
{
    let void = void_pointer(snapshot);
    snapshot.add_type(
        TypeDescriptor::structure(LIST_NODE, 16)
            .with_field("next_", pointer_to(LIST_NODE), 0)
            .with_field("prev_", pointer_to(LIST_NODE), 8),
    );
    snapshot.add_type(TypeDescriptor::structure(LIST_ALGO, 1).with_type_arg(void.clone()));
    snapshot.add_type(TypeDescriptor::structure(LIST_NODE_TRAITS, 1).with_type_arg(void))
}

/// Public list hook `public` carrying `tag`, with its generic hook and holder
pub fn add_list_hook(snapshot: &mut Snapshot, public: &str, tag: &str) -> TypeHandle
{
    let node = snapshot.type_named(LIST_NODE).expect("list types registered");
    let algo = snapshot.type_named(LIST_ALGO).expect("list types registered");
    let tag = snapshot.add_type(TypeDescriptor::structure(tag, 1));
    let holder = snapshot.add_type(
        TypeDescriptor::structure(format!("boost::intrusive::node_holder<{LIST_NODE}, {}, 1>", tag.name), 16)
            .with_base(node, 0),
    );
    let generic = snapshot.add_type(
        TypeDescriptor::structure(
            format!("boost::intrusive::generic_hook<{LIST_ALGO}, {}, {SAFE_LINK}>", tag.name),
            16,
        )
        .with_type_arg(algo)
        .with_type_arg(tag)
        .with_value_arg(SAFE_LINK)
        .with_base(holder, 0),
    );
    snapshot.add_type(TypeDescriptor::structure(public, 16).with_base(generic, 0))
}

/// `my::item`: two list base hooks (`TAG_A` at 0, `TAG_B` at 16) and an int
pub fn add_item(snapshot: &mut Snapshot) -> TypeHandle
{
    let hook_a = add_list_hook(snapshot, &format!("boost::intrusive::list_base_hook<{TAG_A}>"), TAG_A);
    let hook_b = add_list_hook(snapshot, &format!("boost::intrusive::list_base_hook<{TAG_B}>"), TAG_B);
    let int = snapshot.add_type(TypeDescriptor::integer("int", 4));
    snapshot.add_type(
        TypeDescriptor::structure(ITEM, 40)
            .with_base(hook_a, 0)
            .with_base(hook_b, TAG_B_OFFSET)
            .with_field("value", int, 32),
    )
}

pub fn bhtraits_name(tag: &str) -> String
{
    format!("boost::intrusive::bhtraits<{ITEM}, {LIST_NODE_TRAITS}, {SAFE_LINK}, {tag}, 1>")
}

/// Base hook value traits for `my::item` selecting the hook tagged `tag`
pub fn add_bhtraits(snapshot: &mut Snapshot, tag: &str) -> TypeHandle
{
    let item = snapshot.type_named(ITEM).expect("item registered");
    let node_traits = snapshot.type_named(LIST_NODE_TRAITS).expect("list types registered");
    let tag = snapshot.type_named(tag).unwrap_or_else(|| Arc::new(TypeDescriptor::structure(tag, 1)));
    let name = bhtraits_name(&tag.name);
    snapshot.add_type(TypeDescriptor::typedef(format!("{name}::pointer"), pointer_to(ITEM)));
    snapshot.add_type(
        TypeDescriptor::structure(name, 1)
            .with_type_arg(item)
            .with_type_arg(node_traits)
            .with_value_arg(SAFE_LINK)
            .with_type_arg(tag)
            .with_value_arg("1"),
    )
}

/// `my::record`: an id followed by a `list_member_hook<>` named `hook_` at 24
pub fn add_record(snapshot: &mut Snapshot) -> TypeHandle
{
    let hook = add_list_hook(snapshot, MEMBER_HOOK, DFT_TAG);
    let long = snapshot.add_type(TypeDescriptor::integer("long", 8));
    snapshot.add_type(
        TypeDescriptor::structure(RECORD, 48)
            .with_field("id", long, 0)
            .with_field("hook_", hook, RECORD_HOOK_OFFSET),
    )
}

/// Member hook value traits for `my::record` with a literal or symbolic offset
pub fn add_mhtraits(snapshot: &mut Snapshot, offset: &str) -> TypeHandle
{
    let record = snapshot.type_named(RECORD).expect("record registered");
    let hook = snapshot.type_named(MEMBER_HOOK).expect("record registered");
    let name = format!("boost::intrusive::mhtraits<{RECORD}, {MEMBER_HOOK}, {offset}>");
    snapshot.add_type(TypeDescriptor::typedef(format!("{name}::pointer"), pointer_to(RECORD)));
    snapshot.add_type(
        TypeDescriptor::structure(name, 1)
            .with_type_arg(record)
            .with_type_arg(hook)
            .with_value_arg(offset),
    )
}

/// Trivial value traits over `node_traits`
pub fn add_trivial_traits(snapshot: &mut Snapshot, node_traits: &TypeHandle) -> TypeHandle
{
    snapshot.add_type(
        TypeDescriptor::structure(
            format!("boost::intrusive::trivial_value_traits<{}, {SAFE_LINK}>", node_traits.name),
            1,
        )
        .with_type_arg(node_traits.clone())
        .with_value_arg(SAFE_LINK),
    )
}

/// Circular doubly linked chain: `header -> nodes... -> header`
pub fn link_chain(snapshot: &mut Snapshot, header: u64, nodes: &[u64])
{
    let mut ring = Vec::with_capacity(nodes.len() + 1);
    ring.push(header);
    ring.extend_from_slice(nodes);
    for (i, node) in ring.iter().enumerate() {
        let next = ring[(i + 1) % ring.len()];
        let prev = ring[(i + ring.len() - 1) % ring.len()];
        snapshot.write_word(Address::new(*node), next);
        snapshot.write_word(Address::new(*node + 8), prev);
    }
}

/// Items linked through their `TAG_B` hooks
pub fn item_list(snapshot: &mut Snapshot, items: &[u64]) -> ValueRef
{
    let nodes: Vec<u64> = items.iter().map(|item| item + TAG_B_OFFSET).collect();
    link_chain(snapshot, LIST_HEADER, &nodes);
    node_pointer(LIST_NODE, LIST_HEADER)
}

/// Compact red-black node and node traits
///
/// The node doubles as the value under trivial value traits, so it carries a
/// `key_` after the links.
pub fn add_rbtree_types(snapshot: &mut Snapshot) -> TypeHandle
{
    let void = void_pointer(snapshot);
    let long = snapshot.add_type(TypeDescriptor::integer("long", 8));
    snapshot.add_type(
        TypeDescriptor::structure(RB_NODE, 32)
            .with_field("parent_", pointer_to(RB_NODE), 0)
            .with_field("left_", pointer_to(RB_NODE), 8)
            .with_field("right_", pointer_to(RB_NODE), 16)
            .with_field("key_", long, 24),
    );
    snapshot.add_type(
        TypeDescriptor::structure(RB_NODE_TRAITS, 1)
            .with_type_arg(void)
            .with_value_arg("true"),
    )
}

/// Write one compact red-black node; red nodes carry the color in bit 0 of `parent_`
pub fn write_tree_node(snapshot: &mut Snapshot, node: u64, parent: u64, left: u64, right: u64, red: bool)
{
    snapshot.write_word(Address::new(node), parent | u64::from(red));
    snapshot.write_word(Address::new(node + 8), left);
    snapshot.write_word(Address::new(node + 16), right);
}

pub const TREE_HEADER: u64 = 0x1000;

/// Node addresses for keys 1..=7, deliberately out of key order
const TREE_NODES: [u64; 7] = [0x6500, 0x6100, 0x6600, 0x6000, 0x6400, 0x6200, 0x6300];

/// Address of the node holding `key` in [`balanced_tree`]
pub fn tree_node(key: u64) -> u64
{
    let index = usize::try_from(key - 1).expect("key in 1..=7");
    TREE_NODES[index]
}

/// Seven-node balanced tree over keys 1..=7 rooted at 4
///
/// Each node stores its key in `key_`; addresses do not follow key order.
pub fn balanced_tree(snapshot: &mut Snapshot) -> ValueRef
{
    let n = tree_node;
    write_tree_node(snapshot, TREE_HEADER, n(4), n(1), n(7), true);
    write_tree_node(snapshot, n(4), TREE_HEADER, n(2), n(6), false);
    write_tree_node(snapshot, n(2), n(4), n(1), n(3), false);
    write_tree_node(snapshot, n(6), n(4), n(5), n(7), false);
    for (leaf, parent) in [(1, 2), (3, 2), (5, 6), (7, 6)] {
        write_tree_node(snapshot, n(leaf), n(parent), 0, 0, true);
    }
    for key in 1..=7 {
        snapshot.write_word(Address::new(n(key) + 24), key);
    }
    node_pointer(RB_NODE, TREE_HEADER)
}

/// Header of a tree with no nodes
pub fn empty_tree(snapshot: &mut Snapshot) -> ValueRef
{
    write_tree_node(snapshot, TREE_HEADER, 0, TREE_HEADER, TREE_HEADER, true);
    node_pointer(RB_NODE, TREE_HEADER)
}
