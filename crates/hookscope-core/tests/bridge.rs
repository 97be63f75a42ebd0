//! Tests for the remote evaluation bridge

mod common;

use common::*;
use hookscope_core::types::{Address, TypeDescriptor, TypeHandle, ValueRef};
use hookscope_core::{DebugSession, HookscopeError, HookscopeResult, Inspection, Overrides, Snapshot};

/// Session whose evaluator returns located values without their content
struct Unloaded(Snapshot);

impl DebugSession for Unloaded
{
    fn lookup_type(&self, name: &str) -> HookscopeResult<Option<TypeHandle>>
    {
        self.0.lookup_type(name)
    }

    fn read_memory(&self, address: Address, len: usize) -> HookscopeResult<Vec<u8>>
    {
        self.0.read_memory(address, len)
    }

    fn evaluate(&mut self, expression: &str) -> HookscopeResult<ValueRef>
    {
        let value = self.0.evaluate(expression)?;
        Ok(match value.address() {
            Some(address) => ValueRef::located(value.ty().clone(), address),
            None => value,
        })
    }

    fn bind_variable(&mut self, name: &str, value: &ValueRef) -> HookscopeResult<()>
    {
        self.0.bind_variable(name, value)
    }
}

#[test]
fn test_addressable_value_expression()
{
    let mut snapshot = Snapshot::default();
    let ty = snapshot.add_type(TypeDescriptor::structure("my::thing", 8));
    let overrides = Overrides::new();
    let mut inspection = Inspection::new(&mut snapshot, &overrides);

    let value = ValueRef::located(ty, Address::new(0x7ffe_1000));
    let expression = inspection.to_expression(&value, None).unwrap();
    assert_eq!(expression, "(*(my::thing *)(0x7ffe1000))");
}

#[test]
fn test_value_without_storage_needs_anchor()
{
    let mut snapshot = Snapshot::default();
    let overrides = Overrides::new();
    let value = node_pointer(LIST_NODE, 0x2010);
    {
        let mut inspection = Inspection::new(&mut snapshot, &overrides);
        assert!(matches!(
            inspection.to_expression(&value, None),
            Err(HookscopeError::InvalidArgument(_))
        ));
        assert_eq!(inspection.to_expression(&value, Some("$anchor")).unwrap(), "$anchor");
    }
    assert!(snapshot.variable("$anchor").unwrap().same_node(&value));
}

#[test]
fn test_call_method_anchors_arguments()
{
    let mut snapshot = Snapshot::default();
    let ty = snapshot.add_type(TypeDescriptor::structure("my::thing", 8));
    let int = snapshot.add_type(TypeDescriptor::integer("int", 4));
    snapshot.define_value("(*(my::thing *)(0x100)).at($_arg_1)", ValueRef::scalar(int.clone(), 42));
    let overrides = Overrides::new();
    let mut inspection = Inspection::new(&mut snapshot, &overrides);

    let object = ValueRef::located(ty, Address::new(0x100));
    let result = inspection
        .call_method(&object, "at", &[ValueRef::scalar(int, 3)])
        .unwrap();
    assert_eq!(result.scalar_value(), Some(42));
}

#[test]
fn test_failed_call_carries_expression_and_hint()
{
    let mut snapshot = Snapshot::default();
    let ty = snapshot.add_type(TypeDescriptor::structure("my::thing", 8));
    let overrides = Overrides::new();
    let mut inspection = Inspection::new(&mut snapshot, &overrides);

    let object = ValueRef::located(ty, Address::new(0x100));
    match inspection.call_method(&object, "header_ptr", &[]) {
        Err(HookscopeError::RemoteEvaluation { expression, reason, hint }) => {
            assert_eq!(expression, "(*(my::thing *)(0x100)).header_ptr()");
            assert!(reason.contains("cannot evaluate"));
            assert!(hint.contains("my::thing::header_ptr()"));
            assert!(hint.contains("no override table entry"));
        }
        other => panic!("expected RemoteEvaluation, got {other:?}"),
    }
}

#[test]
fn test_call_static_prefers_override()
{
    let mut snapshot = Snapshot::default();
    let mut overrides = Overrides::new();
    overrides.register_static_method("my::traits::get_next", |_, args| Ok(args[0].clone()));
    let mut inspection = Inspection::new(&mut snapshot, &overrides);

    let node = node_pointer(LIST_NODE, 0x2010);
    let result = inspection.call_static("my::traits::get_next", &[node.clone()]).unwrap();
    assert!(result.same_node(&node));

    let err = inspection.call_static("my::traits::get_prev", &[node]).unwrap_err();
    assert!(err.to_string().contains("my::traits::get_prev($_arg_0)"));
    assert!(err.to_string().contains("static method override"));
}

#[test]
fn test_evaluated_pointer_content_is_loaded()
{
    let mut snapshot = Snapshot::default();
    add_list_types(&mut snapshot);
    add_item(&mut snapshot);
    let traits = add_bhtraits(&mut snapshot, TAG_B);
    item_list(&mut snapshot, &ITEMS);
    snapshot.write_word(Address::new(0x900), LIST_HEADER);
    snapshot.define_value("root", ValueRef::located(pointer_to(LIST_NODE), Address::new(0x900)));

    let mut session = Unloaded(snapshot);
    let overrides = Overrides::new();
    let mut inspection = Inspection::new(&mut session, &overrides);

    let root = inspection.evaluate("root", "root must be recorded").unwrap();
    assert_eq!(root.pointer_target().unwrap(), Address::new(LIST_HEADER));

    let values: Vec<Address> = inspection
        .chain(&traits, root)
        .unwrap()
        .map(|element| element.unwrap().value.pointer_target().unwrap())
        .collect();
    assert_eq!(values, ITEMS.map(Address::new));
}
