//! Tests for node-traits and inner type resolution

mod common;

use common::*;
use hookscope_core::types::TypeDescriptor;
use hookscope_core::{HookscopeError, Inspection, Overrides, Snapshot};

fn snapshot() -> Snapshot
{
    let mut snapshot = Snapshot::default();
    add_list_types(&mut snapshot);
    add_item(&mut snapshot);
    add_record(&mut snapshot);
    add_rbtree_types(&mut snapshot);
    snapshot
}

#[test]
fn test_node_traits_per_encoding()
{
    let mut snapshot = snapshot();
    let bhtraits = add_bhtraits(&mut snapshot, TAG_A);
    let mhtraits = add_mhtraits(&mut snapshot, "24");
    let rb_traits = snapshot.type_named(RB_NODE_TRAITS).unwrap();
    let trivial = add_trivial_traits(&mut snapshot, &rb_traits);

    let custom_node_traits = snapshot.add_type(TypeDescriptor::structure("my::custom_node_traits", 1));
    snapshot.add_type(TypeDescriptor::typedef("my::custom_traits::node_traits", custom_node_traits));
    let custom = snapshot.add_type(TypeDescriptor::structure("my::custom_traits", 1));

    let overrides = Overrides::new();
    let inspection = Inspection::new(&mut snapshot, &overrides);

    let cases = [
        (bhtraits, LIST_NODE_TRAITS),
        (mhtraits, LIST_NODE_TRAITS),
        (trivial, RB_NODE_TRAITS),
        (custom, "my::custom_node_traits"),
    ];
    for (value_traits, expected) in cases {
        let node_traits = inspection.resolve_node_traits(&value_traits).unwrap();
        assert_eq!(node_traits.stripped_name(), expected, "node traits of {}", value_traits.name);
    }
}

#[test]
fn test_override_wins_over_builtin()
{
    let mut snapshot = snapshot();
    let bhtraits = add_bhtraits(&mut snapshot, TAG_A);
    snapshot.add_type(TypeDescriptor::structure("my::fancy_node_traits", 1));

    let mut overrides = Overrides::new();
    overrides.register_inner_type(bhtraits.name.clone(), "node_traits", "my::fancy_node_traits");
    let inspection = Inspection::new(&mut snapshot, &overrides);

    let node_traits = inspection.resolve_node_traits(&bhtraits).unwrap();
    assert_eq!(node_traits.name, "my::fancy_node_traits");
}

#[test]
fn test_unresolved_custom_traits_names_override_key()
{
    let mut snapshot = snapshot();
    let custom = snapshot.add_type(TypeDescriptor::structure("my::opaque_traits", 1));
    let overrides = Overrides::new();
    let inspection = Inspection::new(&mut snapshot, &overrides);

    match inspection.resolve_node_traits(&custom) {
        Err(HookscopeError::UnresolvedType { outer, member, hint }) => {
            assert_eq!(outer, "my::opaque_traits");
            assert_eq!(member, "node_traits");
            assert!(hint.contains("override"));
        }
        other => panic!("expected UnresolvedType, got {other:?}"),
    }
}

#[test]
fn test_unknown_node_algorithm_is_internal_fault()
{
    let mut snapshot = snapshot();
    let selector = snapshot.add_type(TypeDescriptor::structure("boost::intrusive::get_weird_node_algo<void*>", 1));
    let tag = snapshot.type_named(DFT_TAG).unwrap();
    let generic = snapshot.add_type(
        TypeDescriptor::structure("boost::intrusive::generic_hook<weird>", 16)
            .with_type_arg(selector)
            .with_type_arg(tag)
            .with_value_arg(SAFE_LINK),
    );
    let record = snapshot.type_named(RECORD).unwrap();
    let mhtraits = snapshot.add_type(
        TypeDescriptor::structure("boost::intrusive::mhtraits<my::record, weird, 0>", 1)
            .with_type_arg(record)
            .with_type_arg(generic)
            .with_value_arg("0"),
    );

    let overrides = Overrides::new();
    let inspection = Inspection::new(&mut snapshot, &overrides);
    assert!(matches!(
        inspection.resolve_node_traits(&mhtraits),
        Err(HookscopeError::AlgorithmTagFault { tag }) if tag == "boost::intrusive::get_weird_node_algo"
    ));
}

#[test]
fn test_inner_type_override_names_unknown_type()
{
    let mut snapshot = snapshot();
    let bhtraits = add_bhtraits(&mut snapshot, TAG_A);
    let mut overrides = Overrides::new();
    overrides.register_inner_type(bhtraits.name.clone(), "pointer", "my::missing *");
    let inspection = Inspection::new(&mut snapshot, &overrides);

    let err = inspection.inner_type(&bhtraits, "pointer").unwrap_err();
    assert!(err.to_string().contains("my::missing"));
}

#[test]
fn test_inner_type_lookup()
{
    let mut snapshot = snapshot();
    let bhtraits = add_bhtraits(&mut snapshot, TAG_B);
    let overrides = Overrides::new();
    let inspection = Inspection::new(&mut snapshot, &overrides);

    let pointer = inspection.inner_type(&bhtraits, "pointer").unwrap();
    assert!(pointer.is_pointer());
    assert_eq!(pointer.pointee(), Some(ITEM));
}
