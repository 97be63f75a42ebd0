//! Text rendering of inspection results.
//!
//! This is the presentation boundary: a value that cannot be read renders as
//! `N/A` instead of aborting the whole listing.

use hookscope_core::{Element, Inspection, ValueRef};
use hookscope_utils::debug;

const NOT_AVAILABLE: &str = "N/A";

/// `[ordinal; 0xaddr] = Type { field = value, ... }`
pub fn element(inspection: &Inspection<'_>, element: &Element) -> String
{
    format!("{} = {}", element.label(), pointer(inspection, &element.value))
}

/// The object behind a value pointer
pub fn pointer(inspection: &Inspection<'_>, value: &ValueRef) -> String
{
    match inspection.dereference(value) {
        Ok(object) => object_fields(inspection, &object),
        Err(err) => {
            debug!(%err, value = %value, "value not readable");
            NOT_AVAILABLE.to_string()
        }
    }
}

/// A located object, pointers dereferenced first
pub fn object(inspection: &Inspection<'_>, value: &ValueRef) -> String
{
    if value.ty().is_pointer() {
        return pointer(inspection, value);
    }
    object_fields(inspection, value)
}

fn object_fields(inspection: &Inspection<'_>, object: &ValueRef) -> String
{
    let ty = object.ty().strip_typedefs();
    let fields: Vec<String> = ty
        .fields
        .iter()
        .filter(|field| !field.is_base)
        .map(|field| {
            let rendered = inspection
                .member(object, &field.name)
                .map_or_else(|_| NOT_AVAILABLE.to_string(), |value| scalar(&value));
            format!("{} = {rendered}", field.name)
        })
        .collect();

    let address = object.address().map(|address| format!(" @ {address}")).unwrap_or_default();
    if fields.is_empty() {
        format!("{}{address}", ty.name)
    } else {
        format!("{}{address} {{ {} }}", ty.name, fields.join(", "))
    }
}

fn scalar(value: &ValueRef) -> String
{
    match (value.ty().is_pointer(), value.scalar_value()) {
        (true, Some(target)) => format!("{target:#x}"),
        (false, Some(number)) => number.to_string(),
        (_, None) => "{...}".to_string(),
    }
}
