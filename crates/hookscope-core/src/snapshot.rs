//! # Snapshot Session
//!
//! A recorded debug session: type descriptors, a sparse byte image of the
//! inspected memory, and canned answers for expressions that would run code
//! in the inspected process (`header_ptr()`, `to_value_ptr(...)`, ...).
//!
//! Snapshots are built programmatically or loaded from JSON:
//!
//! ```json
//! {
//!   "pointer_size": 8,
//!   "types": [
//!     { "name": "my::node", "kind": "struct", "size": 16,
//!       "fields": [ { "name": "next_", "type": "my::node *", "offset": 0 } ] }
//!   ],
//!   "memory": [ { "address": "0x1000", "words": ["0x1010", 0] } ],
//!   "values": { "v_list": { "type": "my::list", "address": "0x1000" } }
//! }
//! ```
//!
//! Type references are by name. Pointer types (`T *`) never need declaring,
//! and names nobody declared resolve to opaque types.
//!
//! The evaluator understands:
//!
//! - anchors bound through [`DebugSession::bind_variable`] (`$_arg_0`)
//! - canned expressions from `values`, matched exactly (modulo whitespace)
//! - dereferencing address casts, `(*(T *)(0xADDR))`
//! - integer casts, `(T)(N)`, and bare integer literals
//!
//! Anything else fails, which is what a real evaluator does for a function
//! that was inlined away.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{HookscopeError, HookscopeResult};
use crate::session::DebugSession;
pub use crate::types::descriptor::normalize_name;
use crate::types::descriptor::parse_integer_literal;
use crate::types::{Address, TemplateArg, TypeDescriptor, TypeField, TypeHandle, TypeKind, ValueRef};

const DEFAULT_POINTER_SIZE: u64 = 8;

/// Pointee name of a pointer type name (`node *` -> `node`)
fn pointee_name(name: &str) -> Option<&str>
{
    name.trim().strip_suffix('*').map(str::trim_end)
}

/// Integer spelled as a JSON number or as a (hex) string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Number
{
    Int(u64),
    Text(String),
}

impl Number
{
    fn value(&self) -> HookscopeResult<u64>
    {
        match self {
            Number::Int(value) => Ok(*value),
            Number::Text(text) => parse_integer_literal(text)
                .ok_or_else(|| HookscopeError::Snapshot(format!("{text:?} is not an integer"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ArgEntry
{
    Type(String),
    Value(String),
}

#[derive(Debug, Clone, Deserialize)]
struct FieldEntry
{
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    base: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct TypeEntry
{
    name: String,
    #[serde(default = "default_kind")]
    kind: TypeKind,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    template_args: Vec<ArgEntry>,
    #[serde(default)]
    fields: Vec<FieldEntry>,
    #[serde(default)]
    pointee: Option<String>,
    #[serde(default)]
    aliased: Option<String>,
}

fn default_kind() -> TypeKind
{
    TypeKind::Struct
}

#[derive(Debug, Clone, Deserialize)]
struct MemoryEntry
{
    address: Number,
    #[serde(default)]
    words: Vec<Number>,
    #[serde(default)]
    bytes: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
struct ValueEntry
{
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    address: Option<Number>,
    #[serde(default)]
    scalar: Option<Number>,
}

fn default_pointer_size() -> u64
{
    DEFAULT_POINTER_SIZE
}

#[derive(Debug, Clone, Deserialize)]
struct SnapshotFile
{
    #[serde(default = "default_pointer_size")]
    pointer_size: u64,
    #[serde(default)]
    types: Vec<TypeEntry>,
    #[serde(default)]
    memory: Vec<MemoryEntry>,
    #[serde(default)]
    values: BTreeMap<String, ValueEntry>,
}

/// Builds descriptors from name-linked entries, leaves first
struct TypeBuilder<'f>
{
    pointer_size: u64,
    entries: HashMap<String, &'f TypeEntry>,
    built: HashMap<String, TypeHandle>,
    in_progress: HashSet<String>,
}

impl<'f> TypeBuilder<'f>
{
    fn new(pointer_size: u64, entries: &'f [TypeEntry]) -> Self
    {
        Self {
            pointer_size,
            entries: entries.iter().map(|entry| (normalize_name(&entry.name), entry)).collect(),
            built: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    fn resolve(&mut self, name: &str) -> HookscopeResult<TypeHandle>
    {
        let key = normalize_name(name);
        if let Some(ty) = self.built.get(&key) {
            return Ok(ty.clone());
        }
        let Some(entry) = self.entries.get(&key).copied() else {
            let ty = match pointee_name(name) {
                Some(pointee) => TypeDescriptor::pointer(name.trim(), pointee, self.pointer_size),
                None => TypeDescriptor::other(name.trim()),
            };
            let ty = Arc::new(ty);
            self.built.insert(key, ty.clone());
            return Ok(ty);
        };
        if !self.in_progress.insert(key.clone()) {
            return Err(HookscopeError::Snapshot(format!("type {name} contains itself")));
        }

        let mut ty = TypeDescriptor {
            name: entry.name.clone(),
            kind: entry.kind,
            size: entry.size,
            template_args: Default::default(),
            fields: Vec::with_capacity(entry.fields.len()),
            pointee: entry.pointee.clone(),
            aliased: None,
        };
        for arg in &entry.template_args {
            ty.template_args.push(match arg {
                ArgEntry::Type(name) => TemplateArg::Type(self.resolve(name)?),
                ArgEntry::Value(text) => TemplateArg::Value(text.clone()),
            });
        }
        for field in &entry.fields {
            ty.fields.push(TypeField {
                name: field.name.clone().unwrap_or_else(|| field.ty.clone()),
                ty: self.resolve(&field.ty)?,
                offset: field.offset,
                is_base: field.base,
            });
        }
        match entry.kind {
            TypeKind::Typedef => {
                let target = entry
                    .aliased
                    .as_deref()
                    .ok_or_else(|| HookscopeError::Snapshot(format!("typedef {name} has no aliased type")))?;
                let target = self.resolve(target)?;
                ty.size = ty.size.or(target.size);
                ty.aliased = Some(target);
            }
            TypeKind::Pointer => {
                if ty.pointee.is_none() {
                    ty.pointee = pointee_name(&entry.name).map(str::to_string);
                }
                ty.size = ty.size.or(Some(self.pointer_size));
            }
            _ => {}
        }

        self.in_progress.remove(&key);
        let ty = Arc::new(ty);
        self.built.insert(key, ty.clone());
        Ok(ty)
    }
}

/// In-memory debug session
#[derive(Debug, Clone)]
pub struct Snapshot
{
    pointer_size: u64,
    types: HashMap<String, TypeHandle>,
    memory: BTreeMap<u64, u8>,
    values: HashMap<String, ValueRef>,
    variables: HashMap<String, ValueRef>,
}

impl Default for Snapshot
{
    fn default() -> Self
    {
        Self::new(DEFAULT_POINTER_SIZE)
    }
}

impl Snapshot
{
    /// Empty snapshot of a process with `pointer_size`-byte pointers
    pub fn new(pointer_size: u64) -> Self
    {
        Self {
            pointer_size,
            types: HashMap::new(),
            memory: BTreeMap::new(),
            values: HashMap::new(),
            variables: HashMap::new(),
        }
    }

    /// Load a snapshot from its JSON text
    ///
    /// ## Errors
    ///
    /// `Json` for malformed documents, `Snapshot` for inconsistent contents.
    pub fn from_json_str(text: &str) -> HookscopeResult<Self>
    {
        let file: SnapshotFile = serde_json::from_str(text)?;
        let mut snapshot = Self::new(file.pointer_size);

        let mut builder = TypeBuilder::new(file.pointer_size, &file.types);
        for entry in &file.types {
            builder.resolve(&entry.name)?;
        }
        snapshot.types = builder.built;

        for block in &file.memory {
            let mut address = block.address.value()?;
            for word in &block.words {
                snapshot.write_word(Address::new(address), word.value()?);
                address += snapshot.pointer_size;
            }
            snapshot.write_bytes(Address::new(address), &block.bytes);
        }

        for (expression, entry) in &file.values {
            let ty = snapshot.lookup(&entry.ty);
            let address = entry.address.as_ref().map(Number::value).transpose()?;
            let scalar = entry.scalar.as_ref().map(Number::value).transpose()?;
            let value = match (address, scalar) {
                (Some(address), Some(scalar)) => ValueRef::located(ty, Address::new(address)).with_scalar(scalar),
                (Some(address), None) => ValueRef::located(ty, Address::new(address)),
                (None, Some(scalar)) => ValueRef::scalar(ty, scalar),
                (None, None) => {
                    return Err(HookscopeError::Snapshot(format!(
                        "value {expression:?} has neither address nor scalar"
                    )))
                }
            };
            snapshot.define_value(expression, value);
        }

        debug!(
            types = snapshot.types.len(),
            bytes = snapshot.memory.len(),
            values = snapshot.values.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Load a snapshot file
    ///
    /// ## Errors
    ///
    /// `Io` if the file cannot be read; see [`Snapshot::from_json_str`].
    pub fn from_file(path: impl AsRef<Path>) -> HookscopeResult<Self>
    {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading snapshot");
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn pointer_size(&self) -> u64
    {
        self.pointer_size
    }

    /// Register a type descriptor under its name
    pub fn add_type(&mut self, ty: TypeDescriptor) -> TypeHandle
    {
        let ty = Arc::new(ty);
        self.types.insert(normalize_name(&ty.name), ty.clone());
        ty
    }

    /// Registered type, or a synthesized pointer type over a registered pointee
    pub fn type_named(&self, name: &str) -> Option<TypeHandle>
    {
        if let Some(ty) = self.types.get(&normalize_name(name)) {
            return Some(ty.clone());
        }
        let pointee = pointee_name(name)?;
        self.type_named(pointee)?;
        Some(Arc::new(TypeDescriptor::pointer(name.trim(), pointee, self.pointer_size)))
    }

    /// Like [`Snapshot::type_named`], falling back to an opaque type
    fn lookup(&self, name: &str) -> TypeHandle
    {
        self.type_named(name).unwrap_or_else(|| {
            let ty = match pointee_name(name) {
                Some(pointee) => TypeDescriptor::pointer(name.trim(), pointee, self.pointer_size),
                None => TypeDescriptor::other(name.trim()),
            };
            Arc::new(ty)
        })
    }

    /// Store raw bytes
    pub fn write_bytes(&mut self, address: Address, bytes: &[u8])
    {
        for (offset, byte) in (0u64..).zip(bytes) {
            self.memory.insert(address.value() + offset, *byte);
        }
    }

    /// Store a pointer-sized little-endian word
    pub fn write_word(&mut self, address: Address, value: u64)
    {
        let width = usize::try_from(self.pointer_size.min(8)).unwrap_or(8);
        let bytes = value.to_le_bytes();
        self.write_bytes(address, &bytes[..width]);
    }

    /// Store a pointer
    pub fn write_pointer(&mut self, address: Address, target: Address)
    {
        self.write_word(address, target.value());
    }

    /// Answer `expression` with `value` from now on
    pub fn define_value(&mut self, expression: &str, value: ValueRef)
    {
        self.values.insert(normalize_name(expression), value);
    }

    /// Value currently bound to an evaluator variable
    pub fn variable(&self, name: &str) -> Option<&ValueRef>
    {
        self.variables.get(name)
    }

    /// Load scalar content of pointer and integer values from memory
    fn loaded(&self, value: ValueRef) -> HookscopeResult<ValueRef>
    {
        let stripped = value.ty().strip_typedefs();
        let (Some(address), None, TypeKind::Pointer | TypeKind::Integer) =
            (value.address(), value.scalar_value(), stripped.kind)
        else {
            return Ok(value);
        };
        let size = stripped.size.unwrap_or(self.pointer_size).min(8);
        let len = usize::try_from(size).unwrap_or(8);
        let bytes = self.read_memory(address, len)?;
        let scalar = bytes
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, byte)| acc | (u64::from(*byte) << (8 * i)));
        Ok(value.with_scalar(scalar))
    }

    /// `(*(T *)(0xADDR))`
    fn eval_dereference(&self, expression: &str) -> Option<HookscopeResult<ValueRef>>
    {
        let inner = expression.strip_prefix("(*(")?.strip_suffix("))")?;
        let (pointer_type, address) = inner.rsplit_once(")(")?;
        let pointee = pointee_name(pointer_type)?;
        let address = parse_integer_literal(address)?;
        let ty = self.lookup(pointee);
        Some(self.loaded(ValueRef::located(ty, Address::new(address))))
    }

    /// `(T)(N)`
    fn eval_integer_cast(&self, expression: &str) -> Option<ValueRef>
    {
        let inner = expression.strip_prefix('(')?.strip_suffix(')')?;
        let (ty, literal) = inner.split_once(")(")?;
        let value = parse_integer_literal(literal)?;
        let ty = self.type_named(ty).unwrap_or_else(|| Arc::new(TypeDescriptor::integer(ty.trim(), self.pointer_size)));
        Some(ValueRef::scalar(ty, value))
    }
}

impl DebugSession for Snapshot
{
    fn lookup_type(&self, name: &str) -> HookscopeResult<Option<TypeHandle>>
    {
        Ok(self.type_named(name))
    }

    fn read_memory(&self, address: Address, len: usize) -> HookscopeResult<Vec<u8>>
    {
        (0u64..)
            .take(len)
            .map(|offset| {
                self.memory.get(&(address.value() + offset)).copied().ok_or_else(|| {
                    HookscopeError::MemoryUnavailable {
                        address,
                        len,
                        reason: format!("{} is not in the snapshot", address + offset),
                    }
                })
            })
            .collect()
    }

    fn evaluate(&mut self, expression: &str) -> HookscopeResult<ValueRef>
    {
        let expression = normalize_name(expression);
        trace!(%expression, "snapshot evaluation");

        if expression.starts_with('$') {
            return self
                .variables
                .get(&expression)
                .cloned()
                .ok_or_else(|| HookscopeError::Snapshot(format!("no variable named {expression}")));
        }
        if let Some(value) = self.values.get(&expression).cloned() {
            return self.loaded(value);
        }
        if let Some(value) = self.eval_dereference(&expression) {
            return value;
        }
        if let Some(value) = self.eval_integer_cast(&expression) {
            return Ok(value);
        }
        if let Some(value) = parse_integer_literal(&expression) {
            return Ok(ValueRef::scalar(Arc::new(TypeDescriptor::integer("long", 8)), value));
        }
        Err(HookscopeError::Snapshot(format!("cannot evaluate {expression}")))
    }

    fn bind_variable(&mut self, name: &str, value: &ValueRef) -> HookscopeResult<()>
    {
        trace!(name, value = %value, "binding variable");
        self.variables.insert(name.to_string(), value.clone());
        Ok(())
    }
}
