//! Persisted index configuration
//!
//! The index root holds a single configuration blob describing where the
//! source files live and how to reach them. It is written once at index
//! creation, read on every open, and never mutated afterwards except by an
//! explicit re-create with `replace`.
//!
//! Configuration text may carry `$VAR` / `${VAR}` placeholders that are
//! resolved against the environment at load time, so credentials can be
//! injected without storing them in the blob. Substitution is explicit and
//! pure: the environment is a parameter, and unresolved placeholders pass
//! through unchanged.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Fixed well-known name of the configuration blob under the index root.
pub const INDEX_CONFIG_FILENAME: &str = "index-config.json";

/// Current configuration format version, for future migration.
pub const INDEX_CONFIG_VERSION: u32 = 2;

/// Default suffix of indexable source files.
pub const DEFAULT_SOURCE_SUFFIX: &str = ".nc";

/// Immutable descriptor of an index: where its source files live, how to
/// reach them, and optionally how scans are partitioned into categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    /// Format version of this blob
    pub version: u32,

    /// Root path of the indexed source files, protocol stripped
    pub source_path: String,

    /// Protocol of the source filesystem (e.g. "file", "s3")
    pub source_protocol: String,

    /// Opaque options handed to the source storage backend
    #[serde(default)]
    pub source_storage_options: HashMap<String, serde_json::Value>,

    /// Optional category name to path prefix mapping, used to partition
    /// scans by dataset family
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub path_prefixes: BTreeMap<String, String>,
}

impl IndexConfig {
    /// Describe a source location. A protocol prefix in `source_path`
    /// (e.g. `s3://bucket/data`) is split off; without one the protocol
    /// defaults to `file`.
    pub fn new(source_path: impl Into<String>) -> Self {
        let source_path = source_path.into();
        let (protocol, path) = split_protocol(&source_path);
        Self {
            version: INDEX_CONFIG_VERSION,
            source_path: path.to_string(),
            source_protocol: protocol.unwrap_or("file").to_string(),
            source_storage_options: HashMap::new(),
            path_prefixes: BTreeMap::new(),
        }
    }

    /// Builder method: override the source protocol
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.source_protocol = protocol.into();
        self
    }

    /// Builder method: set the opaque source storage options
    pub fn storage_options(mut self, options: HashMap<String, serde_json::Value>) -> Self {
        self.source_storage_options = options;
        self
    }

    /// Builder method: register a scan category
    pub fn path_prefix(mut self, category: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.path_prefixes.insert(category.into(), prefix.into());
        self
    }
}

/// Split a `protocol://` prefix off a path, if present.
pub fn split_protocol(path: &str) -> (Option<&str>, &str) {
    match path.split_once("://") {
        Some((protocol, rest))
            if !protocol.is_empty()
                && protocol.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (Some(protocol), rest)
        }
        _ => (None, path),
    }
}

fn placeholder_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // $$ escape, ${name}, $name
        regex::Regex::new(r"\$(?:(\$)|\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .unwrap_or_else(|e| panic!("invalid placeholder pattern: {e}"))
    })
}

/// Replace `$VAR` / `${VAR}` placeholders in `text` with values from
/// `env`. `$$` yields a literal `$`; unresolved placeholders pass through
/// unchanged rather than erroring.
pub fn substitute(text: &str, env: &HashMap<String, String>) -> String {
    placeholder_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match env.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Apply [`substitute`] recursively over every string and object key of a
/// JSON value.
pub fn substitute_json(value: serde_json::Value, env: &HashMap<String, String>) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::String(text) => Value::String(substitute(&text, env)),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| substitute_json(v, env)).collect())
        }
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (substitute(&k, env), substitute_json(v, env)))
                .collect(),
        ),
        other => other,
    }
}

/// Snapshot of the process environment, for feeding [`substitute`].
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}
