use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// An immutable value identifying one aggregate stream.
///
/// The stream key is the canonical string form used to tag events in the
/// log, to address snapshots and to key the in-process cache. Two
/// identifiers are the same object if and only if their stream keys match.
pub trait Identifier:
    Clone + fmt::Debug + Eq + std::hash::Hash + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Returns the canonical stream key for this identifier.
    fn stream_key(&self) -> String;
}

/// Escapes one stream key segment so that `/` only ever separates segments.
///
/// `%` and `/` are percent-encoded; every other character is kept.
pub fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '/' => escaped.push_str("%2F"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Identifies a configuration environment, e.g. `{ "Production", "EU" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvironmentIdentifier {
    pub category: String,
    pub name: String,
}

impl EnvironmentIdentifier {
    /// Creates a new environment identifier.
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }
}

impl Identifier for EnvironmentIdentifier {
    fn stream_key(&self) -> String {
        format!(
            "environment/{}/{}",
            escape_segment(&self.category),
            escape_segment(&self.name)
        )
    }
}

impl fmt::Display for EnvironmentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Identifies an environment layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerIdentifier {
    pub name: String,
}

impl LayerIdentifier {
    /// Creates a new layer identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Identifier for LayerIdentifier {
    fn stream_key(&self) -> String {
        format!("layer/{}", escape_segment(&self.name))
    }
}

impl fmt::Display for LayerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Identifies one version of a configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureIdentifier {
    pub name: String,
    pub version: i32,
}

impl StructureIdentifier {
    /// Creates a new structure identifier.
    pub fn new(name: impl Into<String>, version: i32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl Identifier for StructureIdentifier {
    fn stream_key(&self) -> String {
        format!("structure/{}/{}", escape_segment(&self.name), self.version)
    }
}

impl fmt::Display for StructureIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// Identifies a configuration compiled from an environment and a structure.
///
/// `version` is the event-log position at which the configuration was built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigurationIdentifier {
    pub environment: EnvironmentIdentifier,
    pub structure: StructureIdentifier,
    pub version: i64,
}

impl ConfigurationIdentifier {
    /// Creates a new configuration identifier.
    pub fn new(
        environment: EnvironmentIdentifier,
        structure: StructureIdentifier,
        version: i64,
    ) -> Self {
        Self {
            environment,
            structure,
            version,
        }
    }
}

impl Identifier for ConfigurationIdentifier {
    fn stream_key(&self) -> String {
        format!(
            "configuration/{}/{}/{}/{}/{}",
            escape_segment(&self.environment.category),
            escape_segment(&self.environment.name),
            escape_segment(&self.structure.name),
            self.structure.version,
            self.version
        )
    }
}

impl fmt::Display for ConfigurationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} (v{})",
            self.environment, self.structure, self.version
        )
    }
}

/// The identifier of list aggregates, which enumerate every live object of
/// one kind and therefore have no identity of their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListScope;

impl Identifier for ListScope {
    fn stream_key(&self) -> String {
        "*".to_string()
    }
}
