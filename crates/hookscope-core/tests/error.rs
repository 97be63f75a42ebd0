//! Tests for error handling

use hookscope_core::error::{HookscopeError, HookscopeResult};
use hookscope_core::types::Address;

#[test]
fn test_unresolved_type_display()
{
    let error = HookscopeError::UnresolvedType {
        outer: "my::traits".to_string(),
        member: "node_traits".to_string(),
        hint: "register an override".to_string(),
    };
    let message = format!("{}", error);
    assert!(message.contains("my::traits::node_traits"));
    assert!(message.contains("register an override"));
}

#[test]
fn test_remote_evaluation_display()
{
    let error = HookscopeError::RemoteEvaluation {
        expression: "(*(my::list *)(0x1000)).header_ptr()".to_string(),
        reason: "function was inlined".to_string(),
        hint: "register a static method override".to_string(),
    };
    let message = format!("{}", error);
    assert!(message.contains("(*(my::list *)(0x1000)).header_ptr()"));
    assert!(message.contains("function was inlined"));
    assert!(message.contains("static method override"));
}

#[test]
fn test_hook_tag_not_found_display()
{
    let error = HookscopeError::HookTagNotFound {
        value_type: "my::item".to_string(),
        tag: "my::tag_c".to_string(),
    };
    let message = format!("{}", error);
    assert!(message.contains("my::item"));
    assert!(message.contains("my::tag_c"));
}

#[test]
fn test_algorithm_tag_fault_is_internal()
{
    let error = HookscopeError::AlgorithmTagFault {
        tag: "boost::intrusive::get_weird_node_algo".to_string(),
    };
    let message = format!("{}", error);
    assert!(message.contains("Internal fault"));
    assert!(message.contains("get_weird_node_algo"));
}

#[test]
fn test_memory_errors_show_addresses()
{
    let error = HookscopeError::MemoryUnavailable {
        address: Address::new(0xdead_0000),
        len: 8,
        reason: "unmapped".to_string(),
    };
    assert!(format!("{}", error).contains("0xdead0000"));

    let error = HookscopeError::BrokenLink {
        node: Address::new(0x6040),
        link: "get_parent",
    };
    let message = format!("{}", error);
    assert!(message.contains("get_parent"));
    assert!(message.contains("0x6040"));
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "snapshot.json");
    let error: HookscopeError = io.into();
    assert!(matches!(error, HookscopeError::Io(_)));
}

#[test]
fn test_result_type()
{
    // Test that Result type is properly aliased
    let _result: HookscopeResult<()> = Ok(());
    let _error_result: HookscopeResult<()> = Err(HookscopeError::StepLimitExceeded { limit: 16 });
}
