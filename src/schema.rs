//! Schema tables and the env overlay engine.
//!
//! Every configuration struct that accepts environment overrides
//! implements [`EnvSchema`]: a compile-time table of its fields (serde
//! name, wire kind, read-only flag) plus the env prefix its keys live
//! under. The overlay engine serializes the struct to a JSON value
//! object, applies each matching env key by table lookup, and
//! deserializes the whole object back. `deny_unknown_fields` on the
//! structs makes the round trip a typo safety net: a table entry that
//! drifts from its struct fails the first overlay.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::duration::HumanDuration;
use crate::error::Error;

/// Root prefix for every env key this crate reads. The bare prefix
/// itself is also a key: it may hold an entire embedded YAML document.
pub const ENV_PREFIX: &str = "AWS_K8S_TESTER_EKS_";

/// Wire type of a field on the env channel.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Bool,
    String,
    I64,
    U64,
    F64,
    /// Humantime string ("30m", "2h 15m").
    Duration,
    /// Comma-separated list.
    StringVec,
    /// JSON object of string to string.
    StringMap,
    /// JSON object of name to entry object (node group maps). The
    /// function returns the entry type's own field table, used to blank
    /// read-only sub-fields before the entries are accepted.
    EntryMap(fn() -> &'static [FieldSpec]),
    /// Sub-object with its own env prefix; not settable through this
    /// struct's keys.
    Nested,
}

/// One row of a struct's env table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Serde (kebab-case) field name.
    pub name: &'static str,
    pub kind: FieldKind,
    pub read_only: bool,
}

impl FieldSpec {
    pub const fn writable(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            read_only: false,
        }
    }

    pub const fn read_only(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            read_only: true,
        }
    }

    /// Env key suffix for this field: kebab-case to UPPER_SNAKE.
    pub fn env_suffix(&self) -> String {
        self.name.replace(['-', '.'], "_").to_ascii_uppercase()
    }
}

/// A struct that can be overlaid from the environment.
pub trait EnvSchema: Serialize + DeserializeOwned {
    /// Prefix between [`ENV_PREFIX`] and the field suffix, e.g.
    /// `"PARAMETERS_"` or `"ADD_ON_NODE_GROUPS_"`. Empty for the root.
    const ENV_PREFIX: &'static str;

    fn field_specs() -> &'static [FieldSpec];
}

/// An ordered snapshot of environment variables.
///
/// The overlay never reads the process environment directly; callers
/// snapshot it once with [`EnvVars::from_os_env`] so tests can drive
/// the engine from literal pairs without process-global state.
#[derive(Debug, Clone, Default)]
pub struct EnvVars(BTreeMap<String, String>);

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_os_env() -> Self {
        Self(std::env::vars().collect())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Overlay `target` with the env keys its schema declares, returning
/// the new value. `target` itself is untouched; callers commit the
/// result only after every overlay stage has succeeded.
///
/// Empty env values are ignored (an empty export is "unset", matching
/// shell conventions). A non-empty value for a read-only field is an
/// error, not a skip.
pub fn overlay<T: EnvSchema>(target: &T, env: &EnvVars) -> Result<T, Error> {
    let mut value =
        serde_json::to_value(target).map_err(|e| Error::serialization(e.to_string()))?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| Error::serialization("env overlay target is not an object"))?;

    for spec in T::field_specs() {
        let key = format!("{ENV_PREFIX}{}{}", T::ENV_PREFIX, spec.env_suffix());
        let Some(raw) = env.get(&key) else {
            continue;
        };
        if raw.is_empty() {
            continue;
        }
        if spec.read_only {
            return Err(Error::ReadOnlyField {
                key,
                value: raw.to_string(),
                field: spec.name.to_string(),
            });
        }
        let parsed = parse_value(&key, raw, spec)?;
        obj.insert(spec.name.to_string(), parsed);
    }

    typed_from_value(value)
}

fn parse_value(key: &str, raw: &str, spec: &FieldSpec) -> Result<Value, Error> {
    match spec.kind {
        FieldKind::Bool => parse_bool(raw)
            .map(Value::Bool)
            .ok_or_else(|| Error::parse(key, raw, "invalid boolean")),
        FieldKind::String => Ok(Value::String(raw.to_string())),
        FieldKind::I64 => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| Error::parse(key, raw, e.to_string())),
        FieldKind::U64 => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|e| Error::parse(key, raw, e.to_string())),
        FieldKind::F64 => raw
            .parse::<f64>()
            .map_err(|e| Error::parse(key, raw, e.to_string()))
            .and_then(|f| {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| Error::parse(key, raw, "not a finite number"))
            }),
        FieldKind::Duration => raw
            .parse::<HumanDuration>()
            .map(|d| Value::String(d.to_string()))
            .map_err(|e| Error::parse(key, raw, e.to_string())),
        FieldKind::StringVec => Ok(Value::Array(
            raw.split(',')
                .map(|s| Value::String(s.to_string()))
                .collect(),
        )),
        FieldKind::StringMap => {
            let map: BTreeMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| Error::parse(key, raw, e.to_string()))?;
            Ok(serde_json::to_value(map).map_err(|e| Error::serialization(e.to_string()))?)
        }
        FieldKind::EntryMap(entry_specs) => parse_entry_map(key, raw, entry_specs()),
        FieldKind::Nested => Err(Error::UnsupportedFieldType {
            key: key.to_string(),
            field: spec.name.to_string(),
        }),
    }
}

/// Node group maps arrive as a JSON object of name to entry. Read-only
/// sub-fields inside the entries (logical IDs, CFN stack IDs, statuses)
/// are silently discarded rather than rejected, so a previous run's
/// saved document can be round-tripped through the env channel.
fn parse_entry_map(
    key: &str,
    raw: &str,
    entry_specs: &[FieldSpec],
) -> Result<Value, Error> {
    let mut map: serde_json::Map<String, Value> =
        serde_json::from_str(raw).map_err(|e| Error::parse(key, raw, e.to_string()))?;
    for entry in map.values_mut() {
        let Some(obj) = entry.as_object_mut() else {
            return Err(Error::parse(key, raw, "map entry is not an object"));
        };
        for spec in entry_specs {
            if spec.read_only {
                obj.remove(spec.name);
            }
        }
    }
    Ok(Value::Object(map))
}

/// Accepts the spellings `strconv.ParseBool`-style env blocks use.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Deserialize a JSON value into `T`, classifying serde's
/// unknown-field rejections separately from other shape errors.
pub(crate) fn typed_from_value<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    serde_json::from_value(value).map_err(|e| {
        let msg = e.to_string();
        if msg.contains("unknown field") {
            Error::UnknownField(msg)
        } else {
            Error::Serialization(msg)
        }
    })
}

/// Assert that every row of `T`'s env table names a real serde field
/// of a compatible type. Inserts a zero sample per kind and re-types
/// the object; a drifted table entry fails as an unknown field or a
/// type mismatch.
pub fn verify<T: EnvSchema + Default>() -> Result<(), Error> {
    let mut value = serde_json::to_value(T::default())
        .map_err(|e| Error::serialization(e.to_string()))?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| Error::serialization("schema target is not an object"))?;
    for spec in T::field_specs() {
        let sample = match spec.kind {
            FieldKind::Bool => Value::Bool(false),
            FieldKind::String | FieldKind::Duration => Value::String(String::new()),
            FieldKind::I64 | FieldKind::U64 => Value::from(0),
            FieldKind::F64 => Value::from(0.0),
            FieldKind::StringVec => Value::Array(Vec::new()),
            FieldKind::StringMap | FieldKind::EntryMap(_) => {
                Value::Object(serde_json::Map::new())
            }
            FieldKind::Nested => continue,
        };
        obj.insert(spec.name.to_string(), sample);
    }
    typed_from_value::<T>(value).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
    struct Sample {
        enable: bool,
        name: String,
        minimum_nodes: i64,
        scale_factor: f64,
        timeout: HumanDuration,
        zones: Vec<String>,
        node_labels: BTreeMap<String, String>,
        created: bool,
    }

    impl EnvSchema for Sample {
        const ENV_PREFIX: &'static str = "SAMPLE_";

        fn field_specs() -> &'static [FieldSpec] {
            const SPECS: &[FieldSpec] = &[
                FieldSpec::writable("enable", FieldKind::Bool),
                FieldSpec::writable("name", FieldKind::String),
                FieldSpec::writable("minimum-nodes", FieldKind::I64),
                FieldSpec::writable("scale-factor", FieldKind::F64),
                FieldSpec::writable("timeout", FieldKind::Duration),
                FieldSpec::writable("zones", FieldKind::StringVec),
                FieldSpec::writable("node-labels", FieldKind::StringMap),
                FieldSpec::read_only("created", FieldKind::Bool),
            ];
            SPECS
        }
    }

    /// Story: a CI env block overrides scalar fields of one component;
    /// untouched fields keep their current values.
    #[test]
    fn story_overlay_applies_typed_values() {
        let base = Sample {
            name: "keep-me".to_string(),
            minimum_nodes: 2,
            ..Default::default()
        };
        let env = EnvVars::from_pairs([
            ("AWS_K8S_TESTER_EKS_SAMPLE_ENABLE", "true"),
            ("AWS_K8S_TESTER_EKS_SAMPLE_MINIMUM_NODES", "5"),
            ("AWS_K8S_TESTER_EKS_SAMPLE_SCALE_FACTOR", "2.5"),
            ("AWS_K8S_TESTER_EKS_SAMPLE_TIMEOUT", "30m"),
            ("AWS_K8S_TESTER_EKS_SAMPLE_ZONES", "us-west-2a,us-west-2b"),
            (
                "AWS_K8S_TESTER_EKS_SAMPLE_NODE_LABELS",
                r#"{"team":"qa","tier":"load"}"#,
            ),
        ]);
        let out = overlay(&base, &env).unwrap();
        assert!(out.enable);
        assert_eq!(out.name, "keep-me");
        assert_eq!(out.minimum_nodes, 5);
        assert_eq!(out.scale_factor, 2.5);
        assert_eq!(out.timeout, "30m".parse().unwrap());
        assert_eq!(out.zones, vec!["us-west-2a", "us-west-2b"]);
        assert_eq!(out.node_labels["team"], "qa");
    }

    /// Story: the overlay is a pure function of (config, env); applying
    /// the same env twice is a no-op the second time.
    #[test]
    fn story_overlay_is_idempotent() {
        let env = EnvVars::from_pairs([
            ("AWS_K8S_TESTER_EKS_SAMPLE_ENABLE", "1"),
            ("AWS_K8S_TESTER_EKS_SAMPLE_TIMEOUT", "45s"),
        ]);
        let once = overlay(&Sample::default(), &env).unwrap();
        let twice = overlay(&once, &env).unwrap();
        assert_eq!(once, twice);
    }

    /// Story: a pipeline exports a read-only field by mistake; the
    /// overlay rejects it with the exact key.
    #[test]
    fn story_read_only_fields_are_rejected() {
        let env = EnvVars::from_pairs([("AWS_K8S_TESTER_EKS_SAMPLE_CREATED", "true")]);
        let err = overlay(&Sample::default(), &env).unwrap_err();
        match err {
            Error::ReadOnlyField { key, field, .. } => {
                assert_eq!(key, "AWS_K8S_TESTER_EKS_SAMPLE_CREATED");
                assert_eq!(field, "created");
            }
            other => panic!("unexpected error: {other}"),
        }
        // An empty export is "unset", not a violation.
        let env = EnvVars::from_pairs([("AWS_K8S_TESTER_EKS_SAMPLE_CREATED", "")]);
        assert!(overlay(&Sample::default(), &env).is_ok());
    }

    #[test]
    fn story_go_style_bool_spellings() {
        for raw in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(parse_bool(raw), Some(true), "{raw}");
        }
        for raw in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn story_unparseable_values_name_the_key() {
        let env = EnvVars::from_pairs([("AWS_K8S_TESTER_EKS_SAMPLE_MINIMUM_NODES", "many")]);
        let err = overlay(&Sample::default(), &env).unwrap_err();
        assert!(matches!(err, Error::Parse { ref key, .. }
            if key == "AWS_K8S_TESTER_EKS_SAMPLE_MINIMUM_NODES"));
    }

    #[test]
    fn story_field_table_matches_struct() {
        verify::<Sample>().unwrap();
    }
}
