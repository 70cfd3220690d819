//! # Config Paths and Node Handles
//!
//! Two location newtypes that must never be confused:
//!
//! - [`ConfigPath`] locates a value inside an operator document, starting at
//!   the document root (`root:solids:do_stuff:config`). Every evaluation
//!   error carries one.
//! - [`NodeHandle`] locates a node inside nested composites by alias
//!   (`outer_wrap.wrap`). Mapping errors and config lookups use it.
//!
//! Both are immutable: extending a path returns a new value, so recursive
//! evaluation can thread paths by reference without a shared stack.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step in a [`ConfigPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A named mapping field.
    Field(String),
    /// A list position.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Location of a value from the document root.
///
/// The root itself is the empty path and renders as `root`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigPath(Vec<PathSegment>);

impl ConfigPath {
    /// The document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A new path one field deeper.
    pub fn child(&self, field: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(field.into()));
        Self(segments)
    }

    /// A new path one list position deeper.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// The segments below the root.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Whether this is the document root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The remainder of this path below `prefix`, if `prefix` is an ancestor
    /// (or equal).
    pub fn strip_prefix(&self, prefix: &ConfigPath) -> Option<ConfigPath> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| Self(rest.to_vec()))
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for segment in &self.0 {
            write!(f, ":{segment}")?;
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for ConfigPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

/// Alias path of a node through composite nesting.
///
/// A top-level node `do_stuff` has handle `do_stuff`; the node `wrap` inside
/// composite invocation `outer_wrap` has handle `outer_wrap.wrap`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(Vec<String>);

impl NodeHandle {
    /// Handle of a top-level node.
    pub fn new(alias: impl Into<String>) -> Self {
        Self(vec![alias.into()])
    }

    /// Parse a dotted handle (`outer_wrap.wrap`). Returns `None` for an empty
    /// string or an empty component.
    pub fn parse(dotted: &str) -> Option<Self> {
        let parts: Vec<String> = dotted.split('.').map(str::to_string).collect();
        if parts.iter().any(String::is_empty) {
            return None;
        }
        Some(Self(parts))
    }

    /// Handle of `alias` nested inside this node.
    pub fn child(&self, alias: impl Into<String>) -> Self {
        let mut parts = self.0.clone();
        parts.push(alias.into());
        Self(parts)
    }

    /// The innermost alias.
    pub fn alias(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Aliases from the outermost composite to this node.
    pub fn aliases(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}
