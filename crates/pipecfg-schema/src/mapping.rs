//! # Config Mappings and the Mapping Resolver
//!
//! A composite node may expose a small operator-facing schema and translate
//! it, through a user function, into configuration for its inner nodes.
//!
//! ## Call boundary
//!
//! User functions are opaque. [`ConfigMapping::invoke`] is the only place
//! they run, and it turns both an `Err` return and a panic into
//! [`MappingResult::Failed`]. Nothing a mapping function does can unwind into
//! the evaluator.
//!
//! ## Failure semantics
//!
//! - Function failure: one `MappingFunctionError` at the composite's path;
//!   nothing below the composite is evaluated.
//! - Output fails the inner schema: each plain validation error is
//!   re-expressed as `MappingOutputInvalid`, naming the location relative to
//!   the function's output.
//!
//! In both cases sibling nodes keep evaluating.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use pipecfg_core::{ConfigPath, ConfigValue, NodeHandle, RawValue};
use serde::Serialize;

use crate::errors::EvaluationError;
use crate::evaluate::{evaluate_mapping, EvaluationContext};
use crate::field::Schema;

/// Name reported for mapping functions that were not given one.
pub const ANONYMOUS_MAPPING_FN: &str = "<closure>";

/// A captured failure of a user mapping function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    /// Short type name of the error (`KeyError`), or `panic`.
    pub type_name: String,
    /// The error's `Display` output, or the panic payload.
    pub message: String,
}

impl ExceptionInfo {
    /// Capture an error value returned by a mapping function.
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        Self {
            type_name: short_type_name(std::any::type_name::<E>()),
            message: error.to_string(),
        }
    }

    fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self {
            type_name: "panic".to_string(),
            message,
        }
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

/// Outcome of one mapping function call.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingResult {
    /// Raw configuration for the composite's inner nodes.
    Ok(RawValue),
    /// The function failed; the subtree is unrecoverable.
    Failed(ExceptionInfo),
}

type MappingFn = dyn Fn(&ConfigValue) -> MappingResult + Send + Sync;

/// A declared translation from an operator-facing schema to a composite's
/// inner configuration.
///
/// The function receives the validated `config` value of the composite
/// (`ConfigValue::Null` when the operator omitted an all-optional config) and
/// returns a raw mapping keyed by inner node alias, each entry shaped like a
/// node entry (`config`, `inputs`, `solids`).
#[derive(Clone)]
pub struct ConfigMapping {
    exposed: Schema,
    fn_name: String,
    func: Arc<MappingFn>,
}

impl ConfigMapping {
    /// Wrap a fallible mapping function.
    pub fn new<F, E>(exposed: Schema, user_fn: F) -> Self
    where
        F: Fn(&ConfigValue) -> Result<RawValue, E> + Send + Sync + 'static,
        E: std::error::Error + 'static,
    {
        let func = move |value: &ConfigValue| match user_fn(value) {
            Ok(raw) => MappingResult::Ok(raw),
            Err(e) => MappingResult::Failed(ExceptionInfo::from_error(&e)),
        };
        Self {
            exposed,
            fn_name: ANONYMOUS_MAPPING_FN.to_string(),
            func: Arc::new(func),
        }
    }

    /// Wrap an infallible mapping function. Panics are still captured.
    pub fn infallible<F>(exposed: Schema, user_fn: F) -> Self
    where
        F: Fn(&ConfigValue) -> RawValue + Send + Sync + 'static,
    {
        Self {
            exposed,
            fn_name: ANONYMOUS_MAPPING_FN.to_string(),
            func: Arc::new(move |value: &ConfigValue| MappingResult::Ok(user_fn(value))),
        }
    }

    /// Name the function for diagnostics.
    pub fn named(mut self, fn_name: impl Into<String>) -> Self {
        self.fn_name = fn_name.into();
        self
    }

    /// The schema operators write against.
    pub fn exposed_schema(&self) -> &Schema {
        &self.exposed
    }

    /// The diagnostic function name.
    pub fn fn_name(&self) -> &str {
        &self.fn_name
    }

    /// Run the function behind the capturing boundary.
    pub fn invoke(&self, value: &ConfigValue) -> MappingResult {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.func)(value))) {
            Ok(result) => result,
            Err(payload) => MappingResult::Failed(ExceptionInfo::from_panic(payload.as_ref())),
        }
    }
}

impl fmt::Debug for ConfigMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigMapping")
            .field("exposed", &self.exposed)
            .field("fn_name", &self.fn_name)
            .finish_non_exhaustive()
    }
}

/// Functions cannot be compared; two mappings are structurally equal when
/// they expose the same schema under the same function name.
impl PartialEq for ConfigMapping {
    fn eq(&self, other: &Self) -> bool {
        self.fn_name == other.fn_name && self.exposed == other.exposed
    }
}

impl Serialize for ConfigMapping {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ConfigMapping", 2)?;
        state.serialize_field("fn_name", &self.fn_name)?;
        state.serialize_field("exposed", &self.exposed)?;
        state.end()
    }
}

/// Attachment on a mapped composite's config entry: everything the resolver
/// needs to translate and re-validate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedComposite {
    /// Handle of the composite invocation.
    pub handle: NodeHandle,
    /// Name of the composite definition.
    pub definition_name: String,
    /// The mapping.
    pub mapping: ConfigMapping,
    /// Composed schema of the composite's inner nodes (one entry per alias).
    pub inner: Schema,
}

/// Translate a mapped composite's validated config and validate the result.
///
/// `node_path` is the composite's entry path (`root:solids:do_stuff`).
/// Returns the validated inner configuration, or `None` after recording
/// errors in `ctx`.
pub fn resolve_mapping(
    mapped: &MappedComposite,
    outer: &ConfigValue,
    node_path: &ConfigPath,
    ctx: &mut EvaluationContext,
) -> Option<ConfigValue> {
    tracing::trace!(
        handle = %mapped.handle,
        definition = %mapped.definition_name,
        path = %node_path,
        "invoking config mapping function"
    );

    let raw = match mapped.mapping.invoke(outer) {
        MappingResult::Ok(raw) => raw,
        MappingResult::Failed(failure) => {
            tracing::warn!(
                handle = %mapped.handle,
                function = mapped.mapping.fn_name(),
                error = %failure,
                "config mapping function failed"
            );
            ctx.record(EvaluationError::mapping_function(
                node_path,
                mapped.mapping.fn_name(),
                &mapped.handle,
                &mapped.definition_name,
                &failure,
            ));
            return None;
        }
    };

    let output_root = node_path.child("solids");
    let mut inner_ctx = ctx.child();
    let value = evaluate_mapping(&mapped.inner, &raw, &output_root, &mut inner_ctx);

    // Failures of nested mapped composites already name their own node.
    for error in inner_ctx.into_errors() {
        if error.kind().is_subtree_fatal() {
            ctx.record(error);
        } else {
            ctx.record(EvaluationError::mapping_output(
                &error,
                node_path,
                &output_root,
                &mapped.handle,
                &mapped.definition_name,
            ));
        }
    }
    value
}

/// Strip module paths from every path segment of a type name:
/// `alloc::boxed::Box<dyn core::error::Error>` becomes `Box<dyn Error>`.
fn short_type_name(full: &str) -> String {
    fn last_segment(token: &str) -> &str {
        token.rsplit("::").next().unwrap_or(token)
    }

    let mut out = String::with_capacity(full.len());
    let mut token = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            token.push(ch);
        } else {
            out.push_str(last_segment(&token));
            token.clear();
            out.push(ch);
        }
    }
    out.push_str(last_segment(&token));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipecfg_core::ScalarKind;
    use serde_json::json;
    use thiserror::Error;

    use crate::field::Field;

    #[derive(Debug, Error)]
    #[error("'override_str'")]
    struct KeyError;

    fn exposed() -> Schema {
        Schema::new().with_field("override_str", Field::scalar(ScalarKind::String))
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("my_crate::tests::KeyError"), "KeyError");
        assert_eq!(
            short_type_name("alloc::boxed::Box<dyn core::error::Error + core::marker::Send>"),
            "Box<dyn Error + Send>"
        );
        assert_eq!(short_type_name("KeyError"), "KeyError");
    }

    #[test]
    fn test_invoke_ok() {
        let mapping = ConfigMapping::infallible(exposed(), |cfg| {
            json!({"leaf": {"config": cfg.get("override_str").and_then(ConfigValue::as_str)}})
        });
        let cfg = ConfigValue::from_raw(&json!({"override_str": "x"}));
        assert_eq!(
            mapping.invoke(&cfg),
            MappingResult::Ok(json!({"leaf": {"config": "x"}}))
        );
    }

    #[test]
    fn test_invoke_captures_error_type_and_message() {
        let mapping =
            ConfigMapping::new(exposed(), |_cfg| Err::<RawValue, _>(KeyError)).named("lookup");
        match mapping.invoke(&ConfigValue::Null) {
            MappingResult::Failed(info) => {
                assert_eq!(info.type_name, "KeyError");
                assert_eq!(info.message, "'override_str'");
                assert_eq!(info.to_string(), "KeyError: 'override_str'");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(mapping.fn_name(), "lookup");
    }

    #[test]
    fn test_invoke_captures_panics() {
        let mapping = ConfigMapping::infallible(exposed(), |_cfg| panic!("assert 0"));
        match mapping.invoke(&ConfigValue::Null) {
            MappingResult::Failed(info) => {
                assert_eq!(info.type_name, "panic");
                assert_eq!(info.message, "assert 0");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_invoke_captures_formatted_panics() {
        let mapping = ConfigMapping::infallible(exposed(), |_cfg| panic!("bad value {}", 3));
        match mapping.invoke(&ConfigValue::Null) {
            MappingResult::Failed(info) => assert_eq!(info.message, "bad value 3"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_default_name() {
        let mapping = ConfigMapping::infallible(exposed(), |_| json!({}));
        assert_eq!(mapping.fn_name(), ANONYMOUS_MAPPING_FN);
    }

    #[test]
    fn test_structural_equality_ignores_closure_identity() {
        let a = ConfigMapping::infallible(exposed(), |_| json!({})).named("f");
        let b = ConfigMapping::infallible(exposed(), |_| json!({"x": 1})).named("f");
        assert_eq!(a, b);
        assert_ne!(a, b.clone().named("g"));
    }
}
