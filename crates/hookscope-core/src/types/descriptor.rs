//! Type descriptors as handed out by the symbol service.
//!
//! A descriptor is immutable and shared (`TypeHandle`). The engine only reads
//! it: template name and arguments, field layout, typedef targets. Pointer
//! descriptors name their pointee instead of holding it, so self-referential
//! node types (`node { node* next_; }`) don't form reference cycles.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{HookscopeError, HookscopeResult};

/// Shared handle to a type descriptor
pub type TypeHandle = Arc<TypeDescriptor>;

/// Structural category of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind
{
    /// Struct or class (including template instantiations)
    Struct,
    /// Pointer to a named pointee
    Pointer,
    /// Integer scalar (including `bool` and enums)
    Integer,
    /// Alias of another type
    Typedef,
    /// Anything the engine never looks into
    Other,
}

/// A single template argument
#[derive(Debug, Clone)]
pub enum TemplateArg
{
    /// Type argument
    Type(TypeHandle),
    /// Non-type argument, as the symbol service prints it (`8`, `true`, `&T::hook_`)
    Value(String),
}

impl TemplateArg
{
    /// The type argument, if this is one
    pub fn as_type(&self) -> Option<&TypeHandle>
    {
        match self {
            TemplateArg::Type(ty) => Some(ty),
            TemplateArg::Value(_) => None,
        }
    }

    /// Interpret a non-type argument as an unsigned integer literal
    ///
    /// Accepts decimal and `0x` hex, with an optional integer suffix (`24ul`).
    /// Anything else (pointer-to-member expressions, `true`) returns `None`.
    pub fn as_u64(&self) -> Option<u64>
    {
        let TemplateArg::Value(text) = self else {
            return None;
        };
        parse_integer_literal(text)
    }
}

impl fmt::Display for TemplateArg
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            TemplateArg::Type(ty) => f.write_str(ty.stripped_name()),
            TemplateArg::Value(text) => f.write_str(text),
        }
    }
}

/// A data member or base-class subobject
#[derive(Debug, Clone)]
pub struct TypeField
{
    /// Member name (base subobjects carry the base type's name)
    pub name: String,
    /// Member type
    pub ty: TypeHandle,
    /// Byte offset inside the enclosing type
    pub offset: u64,
    /// Whether this entry is a base-class subobject
    pub is_base: bool,
}

/// Structural definition of a type
#[derive(Debug, Clone)]
pub struct TypeDescriptor
{
    pub name: String,
    pub kind: TypeKind,
    pub size: Option<u64>,
    pub template_args: SmallVec<[TemplateArg; 4]>,
    pub fields: Vec<TypeField>,
    /// Pointee name, for pointers
    pub pointee: Option<String>,
    /// Target type, for typedefs
    pub aliased: Option<TypeHandle>,
}

impl TypeDescriptor
{
    fn bare(name: impl Into<String>, kind: TypeKind, size: Option<u64>) -> Self
    {
        Self {
            name: name.into(),
            kind,
            size,
            template_args: SmallVec::new(),
            fields: Vec::new(),
            pointee: None,
            aliased: None,
        }
    }

    /// A struct type with no members yet
    pub fn structure(name: impl Into<String>, size: u64) -> Self
    {
        Self::bare(name, TypeKind::Struct, Some(size))
    }

    /// A pointer type named `name` pointing at `pointee`
    pub fn pointer(name: impl Into<String>, pointee: impl Into<String>, size: u64) -> Self
    {
        let mut ty = Self::bare(name, TypeKind::Pointer, Some(size));
        ty.pointee = Some(pointee.into());
        ty
    }

    /// An integer scalar type
    pub fn integer(name: impl Into<String>, size: u64) -> Self
    {
        Self::bare(name, TypeKind::Integer, Some(size))
    }

    /// A typedef aliasing `target`
    pub fn typedef(name: impl Into<String>, target: TypeHandle) -> Self
    {
        let size = target.size;
        let mut ty = Self::bare(name, TypeKind::Typedef, size);
        ty.aliased = Some(target);
        ty
    }

    /// An opaque type the engine never looks into
    pub fn other(name: impl Into<String>) -> Self
    {
        Self::bare(name, TypeKind::Other, None)
    }

    /// Append a type template argument
    #[must_use]
    pub fn with_type_arg(mut self, ty: TypeHandle) -> Self
    {
        self.template_args.push(TemplateArg::Type(ty));
        self
    }

    /// Append a non-type template argument
    #[must_use]
    pub fn with_value_arg(mut self, value: impl Into<String>) -> Self
    {
        self.template_args.push(TemplateArg::Value(value.into()));
        self
    }

    /// Append a base-class subobject at `offset`
    #[must_use]
    pub fn with_base(mut self, ty: TypeHandle, offset: u64) -> Self
    {
        self.fields.push(TypeField {
            name: ty.name.clone(),
            ty,
            offset,
            is_base: true,
        });
        self
    }

    /// Append a data member at `offset`
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, ty: TypeHandle, offset: u64) -> Self
    {
        self.fields.push(TypeField {
            name: name.into(),
            ty,
            offset,
            is_base: false,
        });
        self
    }

    /// Follow typedefs down to the underlying definition
    pub fn strip_typedefs(&self) -> &TypeDescriptor
    {
        let mut current = self;
        while let (TypeKind::Typedef, Some(target)) = (current.kind, current.aliased.as_ref()) {
            current = target;
        }
        current
    }

    /// Name of the underlying definition
    pub fn stripped_name(&self) -> &str
    {
        &self.strip_typedefs().name
    }

    /// Template name of the underlying definition (`ns::list` for `ns::list<T>`)
    pub fn template_name(&self) -> &str
    {
        template_name(self.stripped_name())
    }

    /// Whether two descriptors denote the same type once typedefs are stripped
    pub fn same_type(&self, other: &TypeDescriptor) -> bool
    {
        self.stripped_name() == other.stripped_name()
    }

    pub fn is_struct(&self) -> bool
    {
        self.strip_typedefs().kind == TypeKind::Struct
    }

    pub fn is_pointer(&self) -> bool
    {
        self.strip_typedefs().kind == TypeKind::Pointer
    }

    /// Pointee name, for (possibly typedef'd) pointer types
    pub fn pointee(&self) -> Option<&str>
    {
        self.strip_typedefs().pointee.as_deref()
    }

    /// Template argument `index` of the underlying definition
    ///
    /// ## Errors
    ///
    /// `InvalidDescriptor` if the type has fewer arguments.
    pub fn template_argument(&self, index: usize) -> HookscopeResult<&TemplateArg>
    {
        let stripped = self.strip_typedefs();
        stripped.template_args.get(index).ok_or_else(|| {
            HookscopeError::InvalidDescriptor(format!("{} has no template argument {index}", stripped.name))
        })
    }

    /// Type template argument `index` of the underlying definition
    ///
    /// ## Errors
    ///
    /// `InvalidDescriptor` if the argument is missing or is not a type.
    pub fn type_argument(&self, index: usize) -> HookscopeResult<&TypeHandle>
    {
        self.template_argument(index)?.as_type().ok_or_else(|| {
            HookscopeError::InvalidDescriptor(format!(
                "template argument {index} of {} is not a type",
                self.stripped_name()
            ))
        })
    }

    /// First declared field or base of the underlying definition
    ///
    /// ## Errors
    ///
    /// `InvalidDescriptor` if the type declares nothing.
    pub fn first_field(&self) -> HookscopeResult<&TypeField>
    {
        let stripped = self.strip_typedefs();
        stripped
            .fields
            .first()
            .ok_or_else(|| HookscopeError::InvalidDescriptor(format!("{} declares no fields", stripped.name)))
    }

    /// Field or base declared directly on the underlying definition
    pub fn field(&self, name: &str) -> Option<&TypeField>
    {
        self.strip_typedefs().fields.iter().find(|field| field.name == name)
    }

    /// Offset of base subobject `base` inside this type, searching transitively
    pub fn base_offset(&self, base: &str) -> Option<u64>
    {
        let stripped = self.strip_typedefs();
        if stripped.name == base {
            return Some(0);
        }
        stripped
            .fields
            .iter()
            .filter(|field| field.is_base)
            .find_map(|field| field.ty.base_offset(base).map(|inner| field.offset + inner))
    }
}

impl fmt::Display for TypeDescriptor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.name)
    }
}

/// Canonical spelling of a type name or expression for lookups
///
/// Whitespace survives only between two identifier characters
/// (`unsigned long`); `void *` and `void*` are the same name.
pub fn normalize_name(name: &str) -> String
{
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && is_ident(c) && out.chars().last().is_some_and(is_ident) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// Template name of a type name: everything before the first `<`
pub fn template_name(name: &str) -> &str
{
    name.split('<').next().unwrap_or(name).trim()
}

/// Abbreviate the `boost::intrusive::` namespace for display
pub fn short_namespace(name: &str) -> String
{
    name.replace("boost::intrusive::", "bi::")
}

pub(crate) fn parse_integer_literal(text: &str) -> Option<u64>
{
    let trimmed = text.trim().trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        trimmed.parse().ok()
    }
}
