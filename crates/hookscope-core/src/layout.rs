//! Static memory layout: field reads, dereferencing and wrapper peeling.
//!
//! Built-in node layouts are followed by reading memory directly through the
//! session, using field offsets from the type descriptors. Nothing here
//! evaluates code in the inspected process.

use smallvec::SmallVec;
use tracing::trace;

use crate::error::{HookscopeError, HookscopeResult};
use crate::inspect::Inspection;
use crate::types::{Address, TypeDescriptor, TypeHandle, TypeKind, ValueRef};

/// Pointer width assumed when a pointer descriptor carries no size
pub const DEFAULT_POINTER_SIZE: u64 = 8;

/// One step of a wrapper chain
#[derive(Clone, Copy)]
pub enum Peel
{
    /// Always descend into the first declared field
    Always,
    /// Descend into the first declared field only if the current type matches
    When(fn(&TypeDescriptor) -> bool),
}

/// Walk a fixed chain of "first field" wrappers
///
/// Returns the final type and the byte offset of that subobject inside `ty`.
/// The chain length is fixed by `steps`; this never recurses further.
///
/// ## Errors
///
/// `InvalidDescriptor` if a step that must descend finds a type without fields.
pub fn peel_type(ty: &TypeHandle, steps: &[Peel]) -> HookscopeResult<(TypeHandle, u64)>
{
    let mut current = ty.clone();
    let mut offset = 0;
    for step in steps {
        let descend = match step {
            Peel::Always => true,
            Peel::When(matches) => matches(&current),
        };
        if descend {
            let field = current.first_field()?;
            offset += field.offset;
            let next = field.ty.clone();
            current = next;
        }
    }
    Ok((current, offset))
}

/// Find member `name` in `ty`, searching direct members before base subobjects
fn find_member(ty: &TypeDescriptor, name: &str) -> Option<(TypeHandle, u64)>
{
    let stripped = ty.strip_typedefs();
    if let Some(field) = stripped.fields.iter().find(|field| !field.is_base && field.name == name) {
        return Some((field.ty.clone(), field.offset));
    }
    stripped
        .fields
        .iter()
        .filter(|field| field.is_base)
        .find_map(|field| find_member(&field.ty, name).map(|(ty, offset)| (ty, field.offset + offset)))
}

/// Decode a little-endian unsigned integer of up to 8 bytes
fn decode_le(bytes: &[u8]) -> u64
{
    bytes
        .iter()
        .take(8)
        .enumerate()
        .fold(0u64, |acc, (i, byte)| acc | (u64::from(*byte) << (8 * i)))
}

impl Inspection<'_>
{
    /// Look up a type, treating "not found" as an error
    ///
    /// ## Errors
    ///
    /// `InvalidDescriptor` if the symbol service does not know `name`.
    pub fn require_type(&self, name: &str) -> HookscopeResult<TypeHandle>
    {
        self.session_ref()
            .lookup_type(name)?
            .ok_or_else(|| HookscopeError::InvalidDescriptor(format!("type {name} is not known to the session")))
    }

    /// Read an unsigned scalar of `size` bytes
    ///
    /// ## Errors
    ///
    /// `MemoryUnavailable` if the session cannot read the range.
    pub fn read_scalar(&self, address: Address, size: u64) -> HookscopeResult<u64>
    {
        let len = usize::try_from(size.min(8))
            .map_err(|_| HookscopeError::InvalidArgument(format!("scalar size {size} out of range")))?;
        let bytes = self.session_ref().read_memory(address, len)?;
        if bytes.len() < len {
            return Err(HookscopeError::MemoryUnavailable {
                address,
                len,
                reason: format!("short read of {} bytes", bytes.len()),
            });
        }
        Ok(decode_le(&bytes))
    }

    /// Load scalar content for pointer and integer values that have storage
    ///
    /// ## Errors
    ///
    /// `MemoryUnavailable` if the value's storage cannot be read.
    pub fn load(&self, value: ValueRef) -> HookscopeResult<ValueRef>
    {
        if value.scalar_value().is_some() {
            return Ok(value);
        }
        let stripped = value.ty().strip_typedefs();
        let (Some(address), TypeKind::Pointer | TypeKind::Integer) = (value.address(), stripped.kind) else {
            return Ok(value);
        };
        let size = stripped.size.unwrap_or(DEFAULT_POINTER_SIZE);
        let scalar = self.read_scalar(address, size)?;
        Ok(value.with_scalar(scalar))
    }

    /// The object a pointer value points at
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` for non-pointers and null pointers; `InvalidDescriptor`
    /// if the pointee type is unknown.
    pub fn dereference(&self, pointer: &ValueRef) -> HookscopeResult<ValueRef>
    {
        let target = pointer.pointer_target()?;
        if target.is_null() {
            return Err(HookscopeError::InvalidArgument(format!(
                "null {} dereferenced",
                pointer.ty().name
            )));
        }
        let pointee = pointer
            .ty()
            .pointee()
            .ok_or_else(|| HookscopeError::InvalidDescriptor(format!("{} has no pointee", pointer.ty().name)))?;
        Ok(ValueRef::located(self.require_type(pointee)?, target))
    }

    /// Read member `name` of a value, dereferencing pointers first
    ///
    /// Base subobjects are searched after direct members. Pointer and integer
    /// members come back with their content loaded.
    ///
    /// ## Errors
    ///
    /// `InvalidDescriptor` if no such member exists, `MemoryUnavailable` if it
    /// cannot be read.
    pub fn member(&self, value: &ValueRef, name: &str) -> HookscopeResult<ValueRef>
    {
        let object = if value.ty().is_pointer() {
            self.dereference(value)?
        } else {
            value.clone()
        };
        let base = object.address().ok_or_else(|| {
            HookscopeError::InvalidArgument(format!("member {name} of a {} without storage", object.ty().name))
        })?;
        let (ty, offset) = find_member(object.ty(), name).ok_or_else(|| {
            HookscopeError::InvalidDescriptor(format!("{} has no member {name}", object.ty().stripped_name()))
        })?;
        trace!(member = name, object = %base, offset, "reading member");
        self.load(ValueRef::located(ty, base + offset))
    }

    /// Reinterpret a located value as the subobject reached by `steps`
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the value has no storage; see [`peel_type`].
    pub fn peel_value(&self, value: &ValueRef, steps: &[Peel]) -> HookscopeResult<ValueRef>
    {
        let address = value.address().ok_or_else(|| {
            HookscopeError::InvalidArgument(format!("{} without storage cannot be reinterpreted", value.ty().name))
        })?;
        let (ty, offset) = peel_type(value.ty(), steps)?;
        Ok(ValueRef::located(ty, address + offset))
    }
}

/// Names of the types a chain of peels passes through, for diagnostics
pub fn peel_path(ty: &TypeHandle, steps: &[Peel]) -> SmallVec<[String; 4]>
{
    let mut path = SmallVec::new();
    path.push(ty.stripped_name().to_string());
    let mut current = ty.clone();
    for step in steps {
        let descend = match step {
            Peel::Always => true,
            Peel::When(matches) => matches(&current),
        };
        if !descend {
            continue;
        }
        let Ok(field) = current.first_field() else {
            break;
        };
        let next = field.ty.clone();
        path.push(next.stripped_name().to_string());
        current = next;
    }
    path
}

#[cfg(test)]
mod tests
{
    use std::sync::Arc;

    use super::*;

    fn chain() -> TypeHandle
    {
        let node = Arc::new(TypeDescriptor::structure("node", 16));
        let holder = Arc::new(TypeDescriptor::structure("holder<node>", 16).with_base(node, 0));
        Arc::new(TypeDescriptor::structure("hook", 16).with_base(holder, 0))
    }

    fn is_holder(ty: &TypeDescriptor) -> bool
    {
        ty.template_name() == "holder"
    }

    #[test]
    fn test_peel_type_fixed_chain()
    {
        let hook = chain();
        let (ty, offset) = peel_type(&hook, &[Peel::Always, Peel::When(is_holder)]).unwrap();
        assert_eq!(ty.name, "node");
        assert_eq!(offset, 0);

        let (ty, _) = peel_type(&hook, &[Peel::Always]).unwrap();
        assert_eq!(ty.name, "holder<node>");
    }

    #[test]
    fn test_peel_when_skips_non_matching()
    {
        let node = Arc::new(TypeDescriptor::structure("node", 16));
        let (ty, _) = peel_type(&node, &[Peel::When(is_holder)]).unwrap();
        assert_eq!(ty.name, "node");
        assert!(peel_type(&node, &[Peel::Always]).is_err());
    }

    #[test]
    fn test_peel_path()
    {
        let path = peel_path(&chain(), &[Peel::Always, Peel::When(is_holder)]);
        assert_eq!(path.as_slice(), ["hook", "holder<node>", "node"]);
    }

    #[test]
    fn test_decode_le()
    {
        assert_eq!(decode_le(&[0x10, 0x20]), 0x2010);
        assert_eq!(decode_le(&[1, 0, 0, 0, 0, 0, 0, 0]), 1);
    }
}
