//! Hook unwrapping.
//!
//! A generic hook's first base is either the node itself or a `node_holder`
//! wrapping it. Public hook templates add one more layer on top. The nesting
//! depth is fixed, so unwrapping is a fixed list of peel steps.

use std::fmt;

use tracing::debug;

use crate::encoding::{is_generic_hook, is_node_holder, is_public_hook};
use crate::error::{HookscopeError, HookscopeResult};
use crate::inspect::Inspection;
use crate::layout::{peel_path, peel_type, Peel};
use crate::types::{short_namespace, TypeHandle, ValueRef};

/// Public hook, then generic hook, then an optional holder
pub(crate) const HOOK_CHAIN: [Peel; 3] = [Peel::When(is_public_hook), Peel::Always, Peel::When(is_node_holder)];

fn generic_hook_of(ty: &TypeHandle) -> HookscopeResult<TypeHandle>
{
    let (generic, _) = peel_type(ty, &[Peel::When(is_public_hook)])?;
    if is_generic_hook(&generic) {
        Ok(generic)
    } else {
        Err(HookscopeError::InvalidArgument(format!(
            "{} is not an intrusive hook",
            ty.stripped_name()
        )))
    }
}

/// What a hook type is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSummary
{
    /// Node type (or node algorithm selector) the hook embeds
    pub node: String,
    /// Tag distinguishing several hooks in one value type
    pub tag: String,
    /// Last path segment of the link mode (`safe_link`, `auto_unlink`, ...)
    pub link_mode: String,
}

impl fmt::Display for HookSummary
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "bi::generic_hook<{}, {}, {}>",
            short_namespace(&self.node),
            short_namespace(&self.tag),
            self.link_mode
        )
    }
}

/// Summarize a public or generic hook type
///
/// ## Errors
///
/// `InvalidArgument` for types that are not hooks, `InvalidDescriptor` for
/// generic hooks missing template arguments.
pub fn describe_hook(ty: &TypeHandle) -> HookscopeResult<HookSummary>
{
    let generic = generic_hook_of(ty)?;
    let link_mode = generic.template_argument(2)?.to_string();
    let link_mode = link_mode.rsplit("::").next().unwrap_or_default().to_string();
    Ok(HookSummary {
        node: generic.template_argument(0)?.to_string(),
        tag: generic.template_argument(1)?.to_string(),
        link_mode,
    })
}

impl Inspection<'_>
{
    /// Node object embedded in a hook value
    ///
    /// Accepts public hooks (`list_member_hook<...>`, ...) and generic hooks.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the value is not a hook or has no storage.
    pub fn unwrap_hook(&self, hook: &ValueRef) -> HookscopeResult<ValueRef>
    {
        let hook = if hook.ty().is_pointer() {
            self.dereference(hook)?
        } else {
            hook.clone()
        };
        generic_hook_of(hook.ty())?;
        let node = self.peel_value(&hook, &HOOK_CHAIN)?;
        debug!(path = ?peel_path(hook.ty(), &HOOK_CHAIN), node = %node, "unwrapped hook");
        Ok(node)
    }
}
