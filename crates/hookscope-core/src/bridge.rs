//! Remote evaluation bridge.
//!
//! Everything that must run code inside the inspected process goes through
//! here. Values are lowered into expression text with [`Inspection::to_expression`]:
//! addressable values become a dereferencing cast over their address, values
//! without storage are first bound to an anchor variable.
//!
//! Failures are loud. A failed evaluation is logged with the literal
//! expression and a remediation hint, then returned as `RemoteEvaluation`.

use tracing::{debug, error, trace};

use crate::error::{HookscopeError, HookscopeResult};
use crate::inspect::Inspection;
use crate::types::ValueRef;

/// Anchor name for argument `index` of a call
fn argument_anchor(index: usize) -> String
{
    format!("$_arg_{index}")
}

impl Inspection<'_>
{
    /// Expression text that evaluates to `value`
    ///
    /// Addressable values produce `(*(T *)(0xADDR))` and touch nothing in the
    /// session. Values without storage are bound to `anchor` and the anchor
    /// name is returned.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the value needs an anchor and none was given;
    /// session errors from binding the anchor.
    pub fn to_expression(&mut self, value: &ValueRef, anchor: Option<&str>) -> HookscopeResult<String>
    {
        if let Some(address) = value.address() {
            return Ok(format!("(*({} *)({address}))", value.ty().name));
        }
        let anchor = anchor.ok_or_else(|| {
            HookscopeError::InvalidArgument(format!(
                "value of type {} has no address and no anchor name",
                value.ty().name
            ))
        })?;
        trace!(anchor, value = %value, "binding anchor");
        self.session_mut().bind_variable(anchor, value)?;
        Ok(anchor.to_string())
    }

    /// Evaluate `expression`, turning failures into `RemoteEvaluation`
    ///
    /// Located pointer and integer results come back with their content
    /// loaded, whether or not the session loaded it.
    ///
    /// ## Errors
    ///
    /// `RemoteEvaluation` carrying `expression` and `hint`;
    /// `MemoryUnavailable` if the result's storage cannot be read.
    pub fn evaluate(&mut self, expression: &str, hint: &str) -> HookscopeResult<ValueRef>
    {
        debug!(expression, "remote evaluation");
        let value = self.session_mut().evaluate(expression).map_err(|err| {
            error!(expression, hint, reason = %err, "call failed");
            HookscopeError::RemoteEvaluation {
                expression: expression.to_string(),
                reason: err.to_string(),
                hint: hint.to_string(),
            }
        })?;
        self.load(value)
    }

    /// Invoke `method` on `object` inside the inspected process
    ///
    /// The object is anchored as `$_arg_0` and arguments as `$_arg_1..` when
    /// they lack storage.
    ///
    /// ## Errors
    ///
    /// `RemoteEvaluation` if the call fails.
    pub fn call_method(&mut self, object: &ValueRef, method: &str, args: &[ValueRef]) -> HookscopeResult<ValueRef>
    {
        let receiver = self.to_expression(object, Some(&argument_anchor(0)))?;
        let mut lowered = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            lowered.push(self.to_expression(arg, Some(&argument_anchor(index + 1)))?);
        }
        let expression = format!("{receiver}.{method}({})", lowered.join(", "));
        let hint = format!(
            "{}::{method}() must be callable in the inspected process; member calls have no override table entry, so the method must not be inlined away",
            object.ty().stripped_name()
        );
        self.evaluate(&expression, &hint)
    }

    /// Invoke static function `function`
    ///
    /// A replacement registered in the override tables runs instead of the
    /// remote call. Otherwise arguments are anchored as `$_arg_0..`.
    ///
    /// ## Errors
    ///
    /// `RemoteEvaluation` if the remote call fails; whatever the replacement returns.
    pub fn call_static(&mut self, function: &str, args: &[ValueRef]) -> HookscopeResult<ValueRef>
    {
        if let Some(replacement) = self.overrides().static_method(function) {
            debug!(function, "static method override");
            return replacement(self.session_mut(), args);
        }
        let mut lowered = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            lowered.push(self.to_expression(arg, Some(&argument_anchor(index)))?);
        }
        let expression = format!("{function}({})", lowered.join(", "));
        let hint = format!("to bypass the call, register a static method override for \"{function}\"");
        self.evaluate(&expression, &hint)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_argument_anchor()
    {
        assert_eq!(argument_anchor(0), "$_arg_0");
        assert_eq!(argument_anchor(12), "$_arg_12");
    }
}
