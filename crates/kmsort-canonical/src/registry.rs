use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::PolicyError;
use crate::value::{Scalar, Value};

/// Context name that triggers the pod template shape.
pub const TEMPLATE_CONTEXT: &str = "template";
/// Context under which a pod template's `spec` is ordered.
pub const TEMPLATE_SPEC_CONTEXT: &str = "Template";

const PRIORITIES: &[(&str, &[&str])] = &[
    ("Service", &["selector", "ports"]),
    (
        "Deployment",
        &["replicas", "selector", "nodeSelector", "template", "strategy"],
    ),
    ("StatefulSet", &["replicas", "selector", "template"]),
    ("metadata", &["name", "namespace", "labels", "annotations"]),
    ("containers", &["name", "image", "imagePullPolicy", "ports"]),
    ("initContainers", &["name", "image", "imagePullPolicy", "ports"]),
    ("volumeMounts", &["name"]),
    ("volumes", &["name"]),
    ("configMap", &["name"]),
    (
        TEMPLATE_SPEC_CONTEXT,
        &["nodeSelector", "image", "initContainers", "containers"],
    ),
    ("strategy", &["type"]),
    ("updateStrategy", &["type"]),
    ("ports", &["name", "port", "containerPort", "protocol"]),
    ("spec", &["nodeSelector", "image", "initContainers", "containers"]),
];

const IGNORED: &[(&str, &[&str])] = &[("Service", &["clusterIP", "clusterIPs"])];

const SYSTEM_POPULATED: &[&str] = &[
    "generateName",
    "selfLink",
    "uid",
    "resourceVersion",
    "generation",
    "creationTimestamp",
    "deletionTimestamp",
    "deletionGracePeriodSeconds",
    "status",
];

const DATA_KINDS: &[&str] = &["ConfigMap", "Secret"];

const EMPTY_MAPPING_MARKERS: &[&str] = &["emptyDir"];

const MODE_FIELDS: &[&str] = &["defaultMode", "mode"];

fn builtin_defaults() -> BTreeMap<String, Value> {
    let strings = [
        ("internalTrafficPolicy", "Cluster"),
        ("type", "ClusterIP"),
        ("ipFamilyPolicy", "SingleStack"),
        ("sessionAffinity", "None"),
        ("dnsPolicy", "ClusterFirst"),
        ("restartPolicy", "Always"),
        ("terminationMessagePolicy", "File"),
        ("terminationMessagePath", "/dev/termination-log"),
    ];
    let ints = [
        ("revisionHistoryLimit", 10),
        ("progressDeadlineSeconds", 600),
        ("terminationGracePeriodSeconds", 30),
        ("failureThreshold", 3),
        ("successThreshold", 1),
        ("timeoutSeconds", 1),
        ("periodSeconds", 10),
        ("initialDelaySeconds", 0),
        ("defaultMode", 420),
    ];
    let bools = [("readOnlyRootFilesystem", false), ("runAsNonRoot", false)];

    let mut defaults = BTreeMap::new();
    for (field, value) in strings {
        defaults.insert(field.to_string(), Value::string(value));
    }
    for (field, value) in ints {
        defaults.insert(field.to_string(), Value::int(value));
    }
    for (field, value) in bools {
        defaults.insert(field.to_string(), Value::Scalar(Scalar::Bool(value)));
    }
    defaults.insert(
        "ipFamilies".to_string(),
        Value::Sequence(vec![Value::string("IPv4")]),
    );
    defaults
}

fn owned_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn owned_table(table: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    table
        .iter()
        .map(|(name, fields)| (name.to_string(), fields.iter().map(|f| f.to_string()).collect()))
        .collect()
}

/// Immutable lookup tables that drive canonicalization.
///
/// A name missing from a table means "no special rule"; nothing here is ever
/// an error. Built once at start-up and shared by reference afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRegistry {
    priorities: BTreeMap<String, Vec<String>>,
    defaults: BTreeMap<String, Value>,
    ignored: BTreeMap<String, BTreeSet<String>>,
    system_populated: BTreeSet<String>,
    data_kinds: BTreeSet<String>,
    empty_mapping_markers: BTreeSet<String>,
    mode_fields: BTreeSet<String>,
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PolicyRegistry {
    /// Tables for the common workload kinds.
    pub fn builtin() -> Self {
        Self {
            priorities: owned_table(PRIORITIES),
            defaults: builtin_defaults(),
            ignored: IGNORED
                .iter()
                .map(|(kind, fields)| (kind.to_string(), owned_set(fields)))
                .collect(),
            system_populated: owned_set(SYSTEM_POPULATED),
            data_kinds: owned_set(DATA_KINDS),
            empty_mapping_markers: owned_set(EMPTY_MAPPING_MARKERS),
            mode_fields: owned_set(MODE_FIELDS),
        }
    }

    /// Built-in tables extended by the overlay file at `path`.
    pub fn from_overlay_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let text = std::fs::read_to_string(path)?;
        Self::builtin().with_overlay(&text)
    }

    /// Applies a YAML/JSON overlay: keyed tables are replaced per key, sets
    /// are extended.
    pub fn with_overlay(mut self, text: &str) -> Result<Self, PolicyError> {
        let overlay: PolicyOverlay = serde_yaml::from_str(text)?;

        self.priorities.extend(overlay.priorities);
        for (field, raw) in overlay.defaults {
            let value = Value::try_from(raw)
                .map_err(|_| PolicyError::InvalidDefault { field: field.clone() })?;
            if matches!(value, Value::Mapping(_)) {
                return Err(PolicyError::InvalidDefault { field });
            }
            self.defaults.insert(field, value);
        }
        for (kind, fields) in overlay.ignore {
            self.ignored.insert(kind, fields.into_iter().collect());
        }
        self.system_populated.extend(overlay.system_populated);
        self.data_kinds.extend(overlay.data_kinds);
        self.empty_mapping_markers
            .extend(overlay.empty_mapping_markers);
        self.mode_fields.extend(overlay.mode_fields);
        Ok(self)
    }

    /// Priority list registered for `context`.
    pub fn priority_list(&self, context: &str) -> Option<&[String]> {
        self.priorities.get(context).map(Vec::as_slice)
    }

    /// Whether `name` carries its own priority list.
    pub fn is_context(&self, name: &str) -> bool {
        self.priorities.contains_key(name)
    }

    /// Registered default for `field`.
    pub fn default_for(&self, field: &str) -> Option<&Value> {
        self.defaults.get(field)
    }

    /// Whether `field` is stripped from the spec of `kind` unconditionally.
    pub fn is_ignored(&self, kind: &str, field: &str) -> bool {
        self.ignored
            .get(kind)
            .is_some_and(|fields| fields.contains(field))
    }

    /// Whether `field` is filled in by the cluster rather than authored.
    pub fn is_system_populated(&self, field: &str) -> bool {
        self.system_populated.contains(field)
    }

    /// Whether documents of `kind` carry `data`/`stringData` instead of `spec`.
    pub fn is_data_kind(&self, kind: &str) -> bool {
        self.data_kinds.contains(kind)
    }

    /// Whether `field` is kept even when its mapping is empty.
    pub fn allows_empty_mapping(&self, field: &str) -> bool {
        self.empty_mapping_markers.contains(field)
    }

    /// Whether `field` holds an integer file mode, where a leading-zero
    /// literal such as `0644` is octal.
    pub fn is_mode_field(&self, field: &str) -> bool {
        self.mode_fields.contains(field)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
struct PolicyOverlay {
    priorities: BTreeMap<String, Vec<String>>,
    defaults: BTreeMap<String, serde_yaml::Value>,
    ignore: BTreeMap<String, Vec<String>>,
    system_populated: Vec<String>,
    data_kinds: Vec<String>,
    empty_mapping_markers: Vec<String>,
    mode_fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_cover_workload_kinds() {
        let registry = PolicyRegistry::builtin();
        assert_eq!(
            registry.priority_list("Service").unwrap(),
            &["selector".to_string(), "ports".to_string()]
        );
        assert!(registry.is_ignored("Service", "clusterIP"));
        assert!(!registry.is_ignored("Deployment", "clusterIP"));
        assert!(registry.is_system_populated("uid"));
        assert!(registry.is_data_kind("Secret"));
        assert!(registry.allows_empty_mapping("emptyDir"));
        assert!(registry.is_mode_field("defaultMode"));
        assert!(!registry.is_mode_field("replicas"));
        assert_eq!(registry.default_for("defaultMode"), Some(&Value::int(420)));
        assert!(registry.default_for("replicas").is_none());
    }

    #[test]
    fn overlay_replaces_keys_and_extends_sets() {
        let registry = PolicyRegistry::builtin()
            .with_overlay(
                r#"
priorities:
  Service: [ports, selector]
  CronJob: [schedule, jobTemplate]
defaults:
  concurrencyPolicy: Allow
ignore:
  Service: [clusterIP]
systemPopulated: [managedFields]
modeFields: [fsMode]
"#,
            )
            .unwrap();

        assert_eq!(
            registry.priority_list("Service").unwrap(),
            &["ports".to_string(), "selector".to_string()]
        );
        assert!(registry.is_context("CronJob"));
        assert!(registry.is_context("containers"));
        assert_eq!(
            registry.default_for("concurrencyPolicy"),
            Some(&Value::string("Allow"))
        );
        assert!(!registry.is_ignored("Service", "clusterIPs"));
        assert!(registry.is_system_populated("managedFields"));
        assert!(registry.is_system_populated("uid"));
        assert!(registry.is_mode_field("fsMode"));
        assert!(registry.is_mode_field("mode"));
    }

    #[test]
    fn overlay_rejects_mapping_defaults() {
        let err = PolicyRegistry::builtin()
            .with_overlay("defaults:\n  resources:\n    limits: {}\n")
            .unwrap_err();
        assert!(matches!(err, PolicyError::InvalidDefault { field } if field == "resources"));
    }

    #[test]
    fn overlay_rejects_unknown_tables() {
        let err = PolicyRegistry::builtin()
            .with_overlay("order: {}\n")
            .unwrap_err();
        assert!(matches!(err, PolicyError::Parse(_)));
    }
}
