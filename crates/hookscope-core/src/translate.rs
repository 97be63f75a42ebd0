//! Node to value translation.
//!
//! Inverts the embedding scheme of each value-traits encoding. Never writes
//! inspected memory.

use std::slice;

use tracing::{debug, trace};

use crate::encoding::{is_generic_hook, is_public_hook, ValueTraits};
use crate::error::{HookscopeError, HookscopeResult};
use crate::inspect::Inspection;
use crate::hook::HOOK_CHAIN;
use crate::layout::{peel_type, Peel, DEFAULT_POINTER_SIZE};
use crate::types::descriptor::normalize_name;
use crate::types::{TemplateArg, TypeDescriptor, TypeHandle, ValueRef};

/// Generic hook embedded in `value_type` whose tag is `tag`
///
/// Scans the value type's base subobjects in declaration order. The scan
/// stops at the first entry that is not a struct base: hook bases must be
/// declared before any ordinary data member, which is how the intrusive
/// framework's base hooks are always laid out.
///
/// ## Errors
///
/// `HookTagNotFound` if no base carries `tag`.
pub fn tagged_hook(value_type: &TypeDescriptor, tag: &TypeDescriptor) -> HookscopeResult<TypeHandle>
{
    find_tagged_hook(value_type, tag).map(|(hook, _)| hook)
}

/// Tagged generic hook plus its byte offset inside `value_type`
fn find_tagged_hook(value_type: &TypeDescriptor, tag: &TypeDescriptor) -> HookscopeResult<(TypeHandle, u64)>
{
    for base in &value_type.strip_typedefs().fields {
        if !base.is_base || !base.ty.is_struct() {
            break;
        }
        let Ok((hook, offset)) = peel_type(&base.ty, &[Peel::When(is_public_hook)]) else {
            continue;
        };
        if !is_generic_hook(&hook) {
            continue;
        }
        let matches = matches!(hook.template_argument(1), Ok(TemplateArg::Type(hook_tag)) if hook_tag.same_type(tag));
        trace!(base = %base.ty.name, matches, "scanning base hook");
        if matches {
            return Ok((hook, base.offset + offset));
        }
    }
    Err(HookscopeError::HookTagNotFound {
        value_type: value_type.stripped_name().to_string(),
        tag: tag.stripped_name().to_string(),
    })
}

impl Inspection<'_>
{
    /// Value pointer owning `node`
    ///
    /// - trivial: the node is the value
    /// - base hook: `node - (hook offset + node offset)`, both taken from the
    ///   value type's own descriptors
    /// - member hook: `node - offset`, in the inspected process's pointer width
    /// - custom: `Traits::to_value_ptr(node)`, evaluated remotely
    ///
    /// A static method override for `Traits::to_value_ptr` replaces all of the above.
    ///
    /// ## Errors
    ///
    /// `HookTagNotFound`, `UnresolvedType` (for `Traits::pointer`),
    /// `InvalidDescriptor` when the node type is not the one the hook embeds,
    /// `RemoteEvaluation`.
    pub fn to_value(&mut self, value_traits: &ValueTraits, node: &ValueRef) -> HookscopeResult<ValueRef>
    {
        let function = format!("{}::to_value_ptr", value_traits.traits().stripped_name());
        if self.overrides().static_method(&function).is_some() {
            return self.call_static(&function, slice::from_ref(node));
        }

        match value_traits {
            ValueTraits::Trivial { .. } => Ok(node.clone()),
            ValueTraits::BaseHook { traits, value, tag, .. } => {
                let (hook, hook_offset) = find_tagged_hook(value, tag)?;
                let (embedded, node_offset) = peel_type(&hook, &HOOK_CHAIN)?;
                if let Some(pointee) = node.ty().pointee() {
                    if normalize_name(pointee) != normalize_name(embedded.stripped_name()) {
                        return Err(HookscopeError::InvalidDescriptor(format!(
                            "{} embeds {}, not {pointee}",
                            hook.stripped_name(),
                            embedded.stripped_name()
                        )));
                    }
                }
                let value_pointer = self.inner_type(traits, "pointer")?;
                let target = node.pointer_target()?;
                if target.is_null() {
                    return Ok(ValueRef::pointer(value_pointer, target));
                }
                let width = value_pointer.strip_typedefs().size.unwrap_or(DEFAULT_POINTER_SIZE);
                let address = target.wrapping_sub_in_width(hook_offset + node_offset, width);
                debug!(hook = %hook.name, hook_offset, node_offset, %address, "base hook upcast");
                Ok(ValueRef::pointer(value_pointer, address))
            }
            ValueTraits::MemberHook { traits, offset, .. } => {
                let offset = self.member_offset(&function, offset)?;
                let value_pointer = self.inner_type(traits, "pointer")?;
                let width = value_pointer.strip_typedefs().size.unwrap_or(DEFAULT_POINTER_SIZE);
                let address = node.pointer_target()?.wrapping_sub_in_width(offset, width);
                trace!(offset, %address, "member hook offset");
                Ok(ValueRef::pointer(value_pointer, address))
            }
            ValueTraits::Custom { .. } => self.call_static(&function, slice::from_ref(node)),
        }
    }

    /// Byte offset of a member hook, evaluating pointer-to-member arguments remotely
    ///
    /// `bypass` is the static method whose override replaces the whole translation.
    fn member_offset(&mut self, bypass: &str, offset: &TemplateArg) -> HookscopeResult<u64>
    {
        if let Some(literal) = offset.as_u64() {
            return Ok(literal);
        }
        let expression = format!("(size_t)({offset})");
        let hint = format!("to bypass the offset, register a static method override for \"{bypass}\"");
        let value = self.evaluate(&expression, &hint)?;
        value.scalar_value().ok_or_else(|| HookscopeError::RemoteEvaluation {
            expression,
            reason: "result is not a scalar".to_string(),
            hint,
        })
    }
}
