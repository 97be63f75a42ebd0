//! Value references into inspected memory.

use std::fmt;

use super::{Address, TypeHandle};
use crate::error::{HookscopeError, HookscopeResult};

/// A located or computed value in the inspected process
///
/// A value either has storage (`address`) or not. Values without storage
/// (pointer results of arithmetic, evaluator results held in registers) must
/// be materialized as an anchor before they can appear in an expression; see
/// [`crate::bridge`].
///
/// Scalar content (pointer target or integer value) is carried alongside
/// when the producer loaded it. Value references are borrowed for the
/// duration of one inspection request and never cached across requests.
#[derive(Debug, Clone)]
pub struct ValueRef
{
    ty: TypeHandle,
    address: Option<Address>,
    scalar: Option<u64>,
}

impl ValueRef
{
    /// A value stored at `address` whose content has not been loaded
    pub fn located(ty: TypeHandle, address: Address) -> Self
    {
        Self {
            ty,
            address: Some(address),
            scalar: None,
        }
    }

    /// A pointer value with no storage of its own
    pub fn pointer(ty: TypeHandle, target: Address) -> Self
    {
        Self {
            ty,
            address: None,
            scalar: Some(target.value()),
        }
    }

    /// A scalar value with no storage of its own
    pub fn scalar(ty: TypeHandle, value: u64) -> Self
    {
        Self {
            ty,
            address: None,
            scalar: Some(value),
        }
    }

    /// Attach loaded scalar content to this value
    #[must_use]
    pub fn with_scalar(mut self, value: u64) -> Self
    {
        self.scalar = Some(value);
        self
    }

    pub fn ty(&self) -> &TypeHandle
    {
        &self.ty
    }

    /// Storage address, if the value is addressable
    pub fn address(&self) -> Option<Address>
    {
        self.address
    }

    /// Loaded scalar content, if any
    pub fn scalar_value(&self) -> Option<u64>
    {
        self.scalar
    }

    /// The address this pointer value points at
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the value is not a pointer or its content was never loaded.
    pub fn pointer_target(&self) -> HookscopeResult<Address>
    {
        if !self.ty.is_pointer() {
            return Err(HookscopeError::InvalidArgument(format!(
                "{} is not a pointer type",
                self.ty.stripped_name()
            )));
        }
        self.scalar.map(Address::from).ok_or_else(|| {
            HookscopeError::InvalidArgument(format!("pointer of type {} has no loaded content", self.ty.name))
        })
    }

    /// Whether this is a null pointer
    pub fn is_null(&self) -> bool
    {
        self.ty.is_pointer() && self.scalar == Some(0)
    }

    /// Node identity: both values are pointers to the same address
    pub fn same_node(&self, other: &ValueRef) -> bool
    {
        matches!(
            (self.pointer_target(), other.pointer_target()),
            (Ok(left), Ok(right)) if left == right
        )
    }

    /// Reinterpret the same bits as another type
    #[must_use]
    pub fn retyped(&self, ty: TypeHandle) -> Self
    {
        Self {
            ty,
            address: self.address,
            scalar: self.scalar,
        }
    }
}

impl fmt::Display for ValueRef
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match (self.ty.is_pointer(), self.scalar, self.address) {
            (true, Some(target), _) => write!(f, "({}) {:#x}", self.ty.name, target),
            (false, Some(value), _) => write!(f, "{value}"),
            (_, None, Some(address)) => write!(f, "{{{} @ {address}}}", self.ty.name),
            (_, None, None) => write!(f, "<{}>", self.ty.name),
        }
    }
}
