//! # Root Sections
//!
//! The pipeline document root holds node configuration under `solids`,
//! resource configuration under `resources`, and a set of engine sections
//! whose schemas the execution engine defines. [`RootSections::standard`]
//! describes the engine sections the bundled engine understands; embedders
//! with a different engine replace them.

use std::collections::BTreeMap;

use pipecfg_core::ScalarKind;

use crate::field::{Field, Schema};

/// Root key for node configuration.
pub const SOLIDS_SECTION: &str = "solids";
/// Root key for resource configuration.
pub const RESOURCES_SECTION: &str = "resources";

/// Engine-defined root sections besides `solids` and `resources`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RootSections {
    sections: BTreeMap<String, Field>,
}

impl RootSections {
    /// No engine sections.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `execution`, `expectations`, `loggers` and `storage`.
    pub fn standard() -> Self {
        Self::empty()
            .with_section("execution", execution_field())
            .with_section("expectations", expectations_field())
            .with_section("loggers", loggers_field())
            .with_section("storage", storage_field())
    }

    /// Add or replace a section.
    pub fn with_section(mut self, name: impl Into<String>, field: Field) -> Self {
        self.sections.insert(name.into(), field);
        self
    }

    /// Sections in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Section names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }
}

/// `{ config: { ... } }`, the shape every selectable engine component uses.
fn component(config: Schema) -> Field {
    Field::mapping(Schema::new().with_field("config", Field::mapping(config)))
}

fn execution_field() -> Field {
    Field::mapping(
        Schema::new()
            .with_field("in_process", component(Schema::new()))
            .with_field(
                "multiprocess",
                component(
                    Schema::new().with_field(
                        "max_concurrent",
                        Field::scalar(ScalarKind::Int)
                            .with_default(0)
                            .with_description(
                                "Upper bound on concurrent nodes; 0 means one per CPU",
                            ),
                    ),
                ),
            ),
    )
}

fn expectations_field() -> Field {
    Field::mapping(Schema::new().with_field(
        "evaluate",
        Field::scalar(ScalarKind::Bool).with_default(true),
    ))
}

fn loggers_field() -> Field {
    Field::mapping(
        Schema::new().with_field(
            "console",
            component(
                Schema::new()
                    .with_field(
                        "log_level",
                        Field::scalar(ScalarKind::String).with_default("INFO"),
                    )
                    .with_field("name", Field::scalar(ScalarKind::String).with_default("pipecfg")),
            ),
        ),
    )
}

fn storage_field() -> Field {
    Field::mapping(
        Schema::new()
            .with_field("in_memory", component(Schema::new()))
            .with_field(
                "filesystem",
                component(
                    Schema::new()
                        .with_field("base_dir", Field::scalar(ScalarKind::String).optional()),
                ),
            ),
    )
}
