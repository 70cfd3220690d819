//! # Evaluation Errors and the Error Aggregator
//!
//! Every problem found in an operator document becomes an
//! [`EvaluationError`]: a path, a kind, and a rendered message. Errors are
//! values, never panics, and are immutable once created.
//!
//! [`ErrorCollector`] accumulates them for one top-level evaluation in the
//! order they were produced (schema order per level, depth-first), dropping
//! exact duplicates. [`ErrorCollector::finish`] is the single place where a
//! value tree is released to the caller, and it is released only when no
//! error was recorded.

use std::fmt;

use pipecfg_core::{ConfigPath, NodeHandle};
use serde::Serialize;

use crate::mapping::ExceptionInfo;

/// Classification of an evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// A required field is absent and has no default.
    MissingRequiredField,
    /// A present value does not match its declared type.
    TypeMismatch,
    /// A key in the document is not declared by the schema.
    UnknownField,
    /// A user config mapping function failed or panicked.
    MappingFunctionError,
    /// A config mapping function returned configuration that fails the
    /// inner schema.
    MappingOutputInvalid,
}

impl ErrorKind {
    /// Stable identifier for reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequiredField => "MissingRequiredField",
            Self::TypeMismatch => "TypeMismatch",
            Self::UnknownField => "UnknownField",
            Self::MappingFunctionError => "MappingFunctionError",
            Self::MappingOutputInvalid => "MappingOutputInvalid",
        }
    }

    /// Whether the error stops evaluation of the subtree it is attached to.
    pub fn is_subtree_fatal(&self) -> bool {
        matches!(self, Self::MappingFunctionError | Self::MappingOutputInvalid)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payload behind a message, kept so that errors found inside a
/// mapping function's output can be re-rendered relative to that output.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ErrorDetail {
    MissingField { available: Vec<String> },
    ScalarMismatch { expected: String },
    NotAMapping { expected: Vec<String> },
    NotAList { expected: String },
    UnknownField { expected: Vec<String> },
    Rendered,
}

/// One located problem in an operator document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationError {
    path: ConfigPath,
    kind: ErrorKind,
    message: String,
    #[serde(skip)]
    detail: ErrorDetail,
}

impl EvaluationError {
    /// `field` is absent from the mapping at `parent`.
    pub(crate) fn missing_field(parent: &ConfigPath, field: &str, available: Vec<String>) -> Self {
        Self::from_detail(
            parent.child(field),
            ErrorKind::MissingRequiredField,
            ErrorDetail::MissingField { available },
        )
    }

    /// The scalar at `path` is not a `expected`.
    pub(crate) fn scalar_mismatch(path: &ConfigPath, expected: String) -> Self {
        Self::from_detail(
            path.clone(),
            ErrorKind::TypeMismatch,
            ErrorDetail::ScalarMismatch { expected },
        )
    }

    /// The value at `path` should have been a mapping with `expected` fields.
    pub(crate) fn not_a_mapping(path: &ConfigPath, expected: Vec<String>) -> Self {
        Self::from_detail(
            path.clone(),
            ErrorKind::TypeMismatch,
            ErrorDetail::NotAMapping { expected },
        )
    }

    /// The value at `path` should have been a list of `expected`.
    pub(crate) fn not_a_list(path: &ConfigPath, expected: String) -> Self {
        Self::from_detail(
            path.clone(),
            ErrorKind::TypeMismatch,
            ErrorDetail::NotAList { expected },
        )
    }

    /// `field` appears in the mapping at `parent` but is not declared.
    pub(crate) fn unknown_field(parent: &ConfigPath, field: &str, expected: Vec<String>) -> Self {
        Self::from_detail(
            parent.child(field),
            ErrorKind::UnknownField,
            ErrorDetail::UnknownField { expected },
        )
    }

    /// The mapping function of the composite at `path` failed.
    pub(crate) fn mapping_function(
        path: &ConfigPath,
        fn_name: &str,
        handle: &NodeHandle,
        definition: &str,
        failure: &ExceptionInfo,
    ) -> Self {
        let message = format!(
            "Exception occurred during execution of user config mapping function {fn_name} \
             defined by solid {handle} from definition {definition} at path {path}:\n{failure}"
        );
        Self {
            path: path.clone(),
            kind: ErrorKind::MappingFunctionError,
            message,
            detail: ErrorDetail::Rendered,
        }
    }

    /// Re-express a validation error found in a mapping function's output.
    ///
    /// `output_root` is the path at which the output was validated; the
    /// wrapped message names the offending location relative to it.
    pub(crate) fn mapping_output(
        inner: &EvaluationError,
        node_path: &ConfigPath,
        output_root: &ConfigPath,
        handle: &NodeHandle,
        definition: &str,
    ) -> Self {
        let relative = inner
            .path
            .strip_prefix(output_root)
            .unwrap_or_else(|| inner.path.clone());
        let message = format!(
            "Config override mapping function defined by solid {handle} from definition \
             {definition} at path {node_path} caused error: {}",
            inner.detail.render(&relative, &inner.message)
        );
        Self {
            path: inner.path.clone(),
            kind: ErrorKind::MappingOutputInvalid,
            message,
            detail: ErrorDetail::Rendered,
        }
    }

    fn from_detail(path: ConfigPath, kind: ErrorKind, detail: ErrorDetail) -> Self {
        let message = detail.render(&path, "");
        Self {
            path,
            kind,
            message,
            detail,
        }
    }

    /// Location of the problem from the document root.
    pub fn path(&self) -> &ConfigPath {
        &self.path
    }

    /// Classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Operator-facing description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl ErrorDetail {
    /// Render the message for an error located at `path`. `fallback` is used
    /// for details that were rendered at construction.
    fn render(&self, path: &ConfigPath, fallback: &str) -> String {
        match self {
            Self::MissingField { available } => {
                let (parent, field) = split_last(path);
                format!(
                    "Missing required field \"{field}\" {}{} Available Fields: \"{}\".",
                    location(&parent),
                    if parent.is_root() { "." } else { "" },
                    bracketed_list(available)
                )
            }
            Self::UnknownField { expected } => {
                let (parent, field) = split_last(path);
                format!(
                    "Undefined field \"{field}\" {}. Expected: \"{}\".",
                    location(&parent),
                    bracketed_list(expected)
                )
            }
            Self::ScalarMismatch { expected } => {
                format!("Value at path {path} is not valid. Expected \"{expected}\"")
            }
            Self::NotAMapping { expected } => format!(
                "Value at path {path} must be a mapping. Expected: \"{}\".",
                bracketed_list(expected)
            ),
            Self::NotAList { expected } => {
                format!("Value at path {path} must be a list. Expected \"{expected}\"")
            }
            Self::Rendered => fallback.to_string(),
        }
    }
}

fn split_last(path: &ConfigPath) -> (ConfigPath, String) {
    match path.segments().split_last() {
        Some((last, rest)) => (ConfigPath::from(rest.to_vec()), last.to_string()),
        None => (ConfigPath::root(), String::new()),
    }
}

fn location(parent: &ConfigPath) -> String {
    if parent.is_root() {
        "at document config root".to_string()
    } else {
        format!("at path {parent}")
    }
}

/// `['a', 'b']`, the bracketed list rendering used in operator messages.
fn bracketed_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| format!("'{i}'")).collect();
    format!("[{}]", quoted.join(", "))
}

/// The non-empty, ordered error report of a failed evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EvaluationErrors {
    errors: Vec<EvaluationError>,
}

impl EvaluationErrors {
    /// Number of errors (always at least one).
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors in report order.
    pub fn errors(&self) -> &[EvaluationError] {
        &self.errors
    }

    /// Iterate in report order.
    pub fn iter(&self) -> std::slice::Iter<'_, EvaluationError> {
        self.errors.iter()
    }

    /// Consume into the inner list.
    pub fn into_inner(self) -> Vec<EvaluationError> {
        self.errors
    }
}

impl fmt::Display for EvaluationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s):", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            write!(f, "\n  {}. {e}", i + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for EvaluationErrors {}

impl<'a> IntoIterator for &'a EvaluationErrors {
    type Item = &'a EvaluationError;
    type IntoIter = std::slice::Iter<'a, EvaluationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Accumulates errors for one evaluation.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<EvaluationError>,
}

impl ErrorCollector {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error unless an identical one was already recorded.
    pub fn push(&mut self, error: EvaluationError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    /// Number of errors recorded so far.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consume into the raw list, in production order.
    pub fn into_errors(self) -> Vec<EvaluationError> {
        self.errors
    }

    /// Release `value` iff nothing was recorded. A missing value with no
    /// recorded errors cannot happen through the evaluator; it is reported
    /// as a type mismatch at the root rather than panicking.
    pub fn finish<T>(self, value: Option<T>) -> Result<T, EvaluationErrors> {
        match value {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ if !self.errors.is_empty() => Err(EvaluationErrors {
                errors: self.errors,
            }),
            _ => Err(EvaluationErrors {
                errors: vec![EvaluationError::not_a_mapping(&ConfigPath::root(), Vec::new())],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_at_root_message() {
        let e = EvaluationError::missing_field(
            &ConfigPath::root(),
            "solids",
            names(&["execution", "expectations", "loggers", "resources", "solids", "storage"]),
        );
        assert_eq!(e.kind(), ErrorKind::MissingRequiredField);
        assert_eq!(e.path().to_string(), "root:solids");
        assert_eq!(
            e.message(),
            "Missing required field \"solids\" at document config root. Available Fields: \
             \"['execution', 'expectations', 'loggers', 'resources', 'solids', 'storage']\"."
        );
    }

    #[test]
    fn test_missing_nested_message() {
        let e = EvaluationError::missing_field(
            &ConfigPath::root().child("solids"),
            "do_stuff",
            names(&["do_stuff"]),
        );
        assert_eq!(
            e.message(),
            "Missing required field \"do_stuff\" at path root:solids Available Fields: \"['do_stuff']\"."
        );
    }

    #[test]
    fn test_scalar_mismatch_message() {
        let path = ConfigPath::root().child("scalar_config_solid").child("config");
        let e = EvaluationError::scalar_mismatch(&path, "String".to_string());
        assert_eq!(
            e.message(),
            "Value at path root:scalar_config_solid:config is not valid. Expected \"String\""
        );
    }

    #[test]
    fn test_unknown_field_message() {
        let e = EvaluationError::unknown_field(&ConfigPath::root(), "solidz", names(&["solids"]));
        assert_eq!(e.kind(), ErrorKind::UnknownField);
        assert_eq!(
            e.message(),
            "Undefined field \"solidz\" at document config root. Expected: \"['solids']\"."
        );
    }

    #[test]
    fn test_mapping_output_rerenders_relative_path() {
        let node = ConfigPath::root().child("solids").child("do_stuff");
        let output_root = node.child("solids");
        let inner = EvaluationError::scalar_mismatch(
            &output_root.child("scalar_config_solid").child("config"),
            "String".to_string(),
        );
        let wrapped = EvaluationError::mapping_output(
            &inner,
            &node,
            &output_root,
            &NodeHandle::new("do_stuff"),
            "bad_wrap",
        );
        assert_eq!(wrapped.kind(), ErrorKind::MappingOutputInvalid);
        assert_eq!(wrapped.path(), inner.path());
        assert_eq!(
            wrapped.message(),
            "Config override mapping function defined by solid do_stuff from definition bad_wrap at \
             path root:solids:do_stuff caused error: Value at path root:scalar_config_solid:config \
             is not valid. Expected \"String\""
        );
    }

    #[test]
    fn test_collector_drops_duplicates_and_keeps_order() {
        let mut c = ErrorCollector::new();
        let a = EvaluationError::scalar_mismatch(&ConfigPath::root().child("a"), "Int".into());
        let b = EvaluationError::scalar_mismatch(&ConfigPath::root().child("b"), "Int".into());
        c.push(a.clone());
        c.push(b.clone());
        c.push(a.clone());
        let errors = c.finish::<()>(Some(())).unwrap_err();
        assert_eq!(errors.errors(), &[a, b]);
    }

    #[test]
    fn test_collector_releases_value_only_without_errors() {
        assert_eq!(ErrorCollector::new().finish(Some(7)), Ok(7));
        let mut c = ErrorCollector::new();
        c.push(EvaluationError::scalar_mismatch(&ConfigPath::root(), "Int".into()));
        assert!(c.finish(Some(7)).is_err());
    }

    #[test]
    fn test_errors_serialize_without_detail() {
        let e = EvaluationError::scalar_mismatch(&ConfigPath::root().child("x"), "Int".into());
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["path"], serde_json::json!(["x"]));
        assert_eq!(json["kind"], "TypeMismatch");
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn test_kind_fatality() {
        assert!(ErrorKind::MappingFunctionError.is_subtree_fatal());
        assert!(!ErrorKind::UnknownField.is_subtree_fatal());
    }
}
