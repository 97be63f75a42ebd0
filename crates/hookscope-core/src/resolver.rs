//! Type metadata resolution.
//!
//! Works out the node-traits type that belongs to a value-traits type, and
//! resolves inner types (`Outer::member`) with operator overrides taking
//! precedence over everything else.

use tracing::{debug, warn};

use crate::encoding::{is_generic_hook, is_public_hook, NodeAlgorithm, ValueTraits};
use crate::error::{HookscopeError, HookscopeResult};
use crate::inspect::Inspection;
use crate::layout::{peel_type, Peel};
use crate::types::{TypeDescriptor, TypeHandle};

const NODE_TRAITS: &str = "node_traits";

fn remediation(outer: &str, member: &str) -> String
{
    format!("to resolve this, register an inner type override for (\"{outer}\", \"{member}\") naming the type")
}

impl Inspection<'_>
{
    /// Resolve `outer::member`
    ///
    /// An override for `(stripped outer name, member)` is used if present;
    /// otherwise the qualified name is looked up in the symbol service.
    ///
    /// ## Errors
    ///
    /// `UnresolvedType`, with the override key to set, if neither works.
    pub fn inner_type(&self, outer: &TypeDescriptor, member: &str) -> HookscopeResult<TypeHandle>
    {
        let outer_name = outer.stripped_name();
        if let Some(substitute) = self.overrides().inner_type(outer_name, member) {
            debug!(outer = outer_name, member, substitute, "inner type override");
            return self.session_ref().lookup_type(substitute)?.ok_or_else(|| {
                warn!(outer = outer_name, member, substitute, "override names an unknown type");
                HookscopeError::UnresolvedType {
                    outer: outer_name.to_string(),
                    member: member.to_string(),
                    hint: format!("the override names {substitute}, which the symbol service does not know"),
                }
            });
        }

        let qualified = format!("{outer_name}::{member}");
        match self.session_ref().lookup_type(&qualified)? {
            Some(ty) => Ok(ty),
            None => {
                let hint = remediation(outer_name, member);
                warn!(missing = %qualified, %hint, "failed to find type");
                Err(HookscopeError::UnresolvedType {
                    outer: outer_name.to_string(),
                    member: member.to_string(),
                    hint,
                })
            }
        }
    }

    /// Node-traits type for a value-traits type
    ///
    /// In order: operator override, `bhtraits` (second template argument),
    /// `mhtraits` (synthesized from the hook's node algorithm),
    /// `trivial_value_traits` (first template argument), declared
    /// `node_traits` inner type.
    ///
    /// ## Errors
    ///
    /// `UnresolvedType` when no strategy applies, `AlgorithmTagFault` for an
    /// unknown node algorithm, `InvalidDescriptor` for malformed built-ins.
    pub fn resolve_node_traits(&self, value_traits: &TypeHandle) -> HookscopeResult<TypeHandle>
    {
        if self.overrides().inner_type(value_traits.stripped_name(), NODE_TRAITS).is_some() {
            return self.inner_type(value_traits, NODE_TRAITS);
        }

        let classified = ValueTraits::classify(value_traits)?;
        debug!(
            value_traits = value_traits.stripped_name(),
            encoding = classified.encoding(),
            "resolving node traits"
        );
        match classified {
            ValueTraits::BaseHook { node_traits, .. } | ValueTraits::Trivial { node_traits, .. } => Ok(node_traits),
            ValueTraits::MemberHook { hook, .. } => self.member_hook_node_traits(value_traits, &hook),
            ValueTraits::Custom { traits } => self.inner_type(&traits, NODE_TRAITS),
        }
    }

    /// Synthesize node traits from the node algorithm a member hook was built with
    fn member_hook_node_traits(&self, value_traits: &TypeDescriptor, hook: &TypeHandle) -> HookscopeResult<TypeHandle>
    {
        let (generic, _) = peel_type(hook, &[Peel::When(is_public_hook)])?;
        if !is_generic_hook(&generic) {
            return Err(HookscopeError::InvalidDescriptor(format!(
                "member hook {} does not wrap a generic_hook",
                hook.stripped_name()
            )));
        }

        let selector = generic.type_argument(0)?;
        let algorithm = NodeAlgorithm::from_selector(selector)?;
        let void_pointer = selector.template_argument(0)?.to_string();
        let optimize_size = if algorithm.takes_size_flag() {
            selector.template_argument(1)?.to_string()
        } else {
            String::new()
        };
        let name = algorithm.node_traits_name(&void_pointer, &optimize_size);
        debug!(%algorithm, node_traits = %name, "synthesized member hook node traits");

        self.session_ref().lookup_type(&name)?.ok_or_else(|| {
            let outer = value_traits.stripped_name();
            let hint = remediation(outer, NODE_TRAITS);
            warn!(missing = %name, %hint, "synthesized node traits type not found");
            HookscopeError::UnresolvedType {
                outer: outer.to_string(),
                member: NODE_TRAITS.to_string(),
                hint: format!("{name} is unknown to the symbol service; {hint}"),
            }
        })
    }
}
