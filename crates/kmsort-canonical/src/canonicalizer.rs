use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::trace;

use crate::defaults::is_default;
use crate::error::CanonicalizeError;
use crate::registry::{PolicyRegistry, TEMPLATE_CONTEXT, TEMPLATE_SPEC_CONTEXT};
use crate::value::{octal_literal, Mapping, OrderedValue, Scalar, Value};

/// Maximum nesting depth accepted before giving up.
pub const MAX_DEPTH: usize = 128;

/// Recursive tree walker that orders fields and elides defaults.
///
/// Stateless apart from the borrowed registry; the same instance can be used
/// for any number of documents.
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer<'a> {
    registry: &'a PolicyRegistry,
}

impl<'a> Canonicalizer<'a> {
    /// Creates a canonicalizer backed by `registry`.
    pub fn new(registry: &'a PolicyRegistry) -> Self {
        Self { registry }
    }

    /// Registry this canonicalizer reads its rules from.
    pub fn registry(&self) -> &'a PolicyRegistry {
        self.registry
    }

    /// Canonicalizes `value` found under `context`.
    pub fn canonicalize(
        &self,
        context: &str,
        value: &Value,
    ) -> Result<OrderedValue, CanonicalizeError> {
        self.canonicalize_at(context, value, 0)
    }

    /// Canonicalizes a mapping under `context`.
    pub fn canonicalize_mapping(
        &self,
        context: &str,
        map: &Mapping,
    ) -> Result<OrderedValue, CanonicalizeError> {
        self.mapping_at(context, map, 0)
    }

    /// Canonicalizes the spec of a `kind` object, dropping the fields
    /// ignored for that kind first.
    pub fn canonicalize_spec(
        &self,
        kind: &str,
        spec: &Mapping,
    ) -> Result<OrderedValue, CanonicalizeError> {
        self.spec_at(kind, spec, 0)
    }

    fn canonicalize_at(
        &self,
        context: &str,
        value: &Value,
        depth: usize,
    ) -> Result<OrderedValue, CanonicalizeError> {
        if depth > MAX_DEPTH {
            return Err(CanonicalizeError::RecursionLimitExceeded {
                max_depth: MAX_DEPTH,
            });
        }
        if context == TEMPLATE_CONTEXT && !matches!(value, Value::Mapping(_)) {
            return Err(CanonicalizeError::shape(context, "mapping", value.shape()));
        }

        match value {
            Value::Mapping(map) => self.mapping_at(context, map, depth),
            Value::Sequence(items) => {
                // Every object element reuses the list field's own rules.
                let mut ordered = Vec::with_capacity(items.len());
                for item in items {
                    ordered.push(match item {
                        Value::Mapping(map) => self.mapping_at(context, map, depth + 1)?,
                        other => OrderedValue::verbatim(other),
                    });
                }
                Ok(OrderedValue::Sequence(ordered))
            }
            Value::Scalar(scalar) => Ok(OrderedValue::Scalar(scalar.clone())),
        }
    }

    fn mapping_at(
        &self,
        context: &str,
        map: &Mapping,
        depth: usize,
    ) -> Result<OrderedValue, CanonicalizeError> {
        if depth > MAX_DEPTH {
            return Err(CanonicalizeError::RecursionLimitExceeded {
                max_depth: MAX_DEPTH,
            });
        }
        if context == TEMPLATE_CONTEXT {
            return self.template_at(map, depth);
        }

        let mut remaining: BTreeMap<&str, Cow<'_, Value>> = map
            .iter()
            .map(|(key, value)| (key.as_str(), self.resolve_mode(key, value)))
            .collect();
        let mut output = Vec::with_capacity(map.len());

        if let Some(priority) = self.registry.priority_list(context) {
            for field in priority {
                if let Some(value) = remaining.remove(field.as_str()) {
                    let ordered = self.canonicalize_at(field, &value, depth + 1)?;
                    output.push((field.clone(), ordered));
                }
            }
        }

        // BTreeMap iteration is already lexicographic.
        for (field, value) in remaining {
            let value = value.as_ref();
            if self.registry.is_context(field) {
                let ordered = self.canonicalize_at(field, value, depth + 1)?;
                output.push((field.to_string(), ordered));
                continue;
            }

            let mut terminal = OrderedValue::verbatim(value);
            if let Value::Mapping(child) = value {
                if !child.is_empty() || self.registry.allows_empty_mapping(field) {
                    let ordered = self.mapping_at(field, child, depth + 1)?;
                    if !ordered.keys().is_empty() || self.registry.allows_empty_mapping(field) {
                        output.push((field.to_string(), ordered));
                        continue;
                    }
                    // Emptied by elision: judged like a literal `{}`.
                    terminal = ordered;
                }
            }

            if self.registry.is_system_populated(field) {
                trace!(context, field, "dropping system-populated field");
            } else if is_default(self.registry, field, value) {
                trace!(context, field, "dropping field equal to its default");
            } else {
                output.push((field.to_string(), terminal));
            }
        }

        Ok(OrderedValue::Mapping(output))
    }

    /// Pod templates keep only `metadata` and `spec`, in that order.
    fn template_at(&self, map: &Mapping, depth: usize) -> Result<OrderedValue, CanonicalizeError> {
        let mut output = Vec::with_capacity(2);

        if let Some(metadata) = map.get("metadata") {
            let metadata = expect_mapping("template.metadata", metadata)?;
            output.push((
                "metadata".to_string(),
                self.mapping_at("metadata", metadata, depth + 1)?,
            ));
        }
        if let Some(spec) = map.get("spec") {
            let spec = expect_mapping("template.spec", spec)?;
            output.push((
                "spec".to_string(),
                self.spec_at(TEMPLATE_SPEC_CONTEXT, spec, depth + 1)?,
            ));
        }

        Ok(OrderedValue::Mapping(output))
    }

    fn spec_at(
        &self,
        kind: &str,
        spec: &Mapping,
        depth: usize,
    ) -> Result<OrderedValue, CanonicalizeError> {
        let kept: Mapping = spec
            .iter()
            .filter(|(field, _)| !self.registry.is_ignored(kind, field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        self.mapping_at(kind, &kept, depth)
    }

    /// File modes written as `0644` load as strings; read them as octal.
    fn resolve_mode<'v>(&self, field: &str, value: &'v Value) -> Cow<'v, Value> {
        match value {
            Value::Scalar(Scalar::String(text)) if self.registry.is_mode_field(field) => {
                match octal_literal(text) {
                    Some(mode) => Cow::Owned(Value::int(mode)),
                    None => Cow::Borrowed(value),
                }
            }
            _ => Cow::Borrowed(value),
        }
    }
}

fn expect_mapping<'v>(context: &str, value: &'v Value) -> Result<&'v Mapping, CanonicalizeError> {
    value
        .as_mapping()
        .ok_or_else(|| CanonicalizeError::shape(context, "mapping", value.shape()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Value {
        Value::try_from(serde_yaml::from_str::<serde_yaml::Value>(text).unwrap()).unwrap()
    }

    #[test]
    fn priority_fields_come_first_then_alphabetical() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse("zeta: 1\nports: []\nalpha: 2\nselector: {app: x}\n");

        let ordered = canonicalizer.canonicalize("Service", &value).unwrap();
        assert_eq!(ordered.keys(), vec!["selector", "ports", "alpha", "zeta"]);
    }

    #[test]
    fn list_elements_reuse_the_list_context() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse(
            "containers:\n  - ports: []\n    image: nginx\n    name: web\n  - plain\n",
        );

        let ordered = canonicalizer.canonicalize("spec", &value).unwrap();
        let OrderedValue::Sequence(items) = ordered.get("containers").unwrap() else {
            panic!("containers should stay a sequence");
        };
        assert_eq!(items[0].keys(), vec!["name", "image", "ports"]);
        assert_eq!(items[1], OrderedValue::verbatim(&Value::string("plain")));
    }

    #[test]
    fn terminal_fields_drop_system_and_default_values() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse(
            "name: demo\nuid: abc\ncreationTimestamp: null\nlabels: {app: demo}\n",
        );

        let ordered = canonicalizer.canonicalize("metadata", &value).unwrap();
        assert_eq!(ordered.keys(), vec!["name", "labels"]);

        let pod_spec = parse("dnsPolicy: ClusterFirst\nrestartPolicy: Never\n");
        let ordered = canonicalizer.canonicalize("Template", &pod_spec).unwrap();
        assert_eq!(ordered.keys(), vec!["restartPolicy"]);
    }

    #[test]
    fn empty_mappings_are_kept() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse("emptyDir: {}\nname: cache\nsecurityContext: {}\n");

        let ordered = canonicalizer.canonicalize("volumes", &value).unwrap();
        assert_eq!(ordered.keys(), vec!["name", "emptyDir", "securityContext"]);
        assert_eq!(ordered.get("emptyDir"), Some(&OrderedValue::Mapping(vec![])));
    }

    #[test]
    fn template_keeps_only_metadata_and_spec() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse(
            "spec:\n  containers: []\n  nodeSelector: {disk: ssd}\nextra: dropped\nmetadata:\n  labels: {app: x}\n",
        );

        let ordered = canonicalizer.canonicalize("template", &value).unwrap();
        assert_eq!(ordered.keys(), vec!["metadata", "spec"]);
        assert_eq!(
            ordered.get("spec").unwrap().keys(),
            vec!["nodeSelector", "containers"]
        );
    }

    #[test]
    fn template_must_be_a_mapping() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse("template:\n  metadata: [a]\n");

        let err = canonicalizer.canonicalize("Deployment", &value).unwrap_err();
        assert!(matches!(
            err,
            CanonicalizeError::Shape { ref context, found: "sequence", .. } if context == "template.metadata"
        ));
    }

    #[test]
    fn scalar_template_is_a_shape_error() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse("replicas: 1\ntemplate: oops\n");

        let err = canonicalizer.canonicalize("Deployment", &value).unwrap_err();
        assert!(matches!(
            err,
            CanonicalizeError::Shape { ref context, expected: "mapping", found: "scalar" } if context == "template"
        ));
    }

    #[test]
    fn sequence_template_is_a_shape_error() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse("template:\n  - metadata: {name: a}\n    extra: kept\n");

        let err = canonicalizer.canonicalize("StatefulSet", &value).unwrap_err();
        assert!(matches!(
            err,
            CanonicalizeError::Shape { ref context, found: "sequence", .. } if context == "template"
        ));
    }

    #[test]
    fn ignored_fields_are_dropped_from_kind_and_template_specs() {
        let registry = PolicyRegistry::builtin()
            .with_overlay("ignore:\n  Template: [hostname]\n  Deployment: [paused]\n")
            .unwrap();
        let canonicalizer = Canonicalizer::new(&registry);
        let spec = parse(
            "paused: true\nreplicas: 1\ntemplate:\n  spec:\n    hostname: a\n    containers: []\n",
        );

        let ordered = canonicalizer
            .canonicalize_spec("Deployment", spec.as_mapping().unwrap())
            .unwrap();
        assert_eq!(ordered.keys(), vec!["replicas", "template"]);
        let template = ordered.get("template").unwrap();
        assert_eq!(template.get("spec").unwrap().keys(), vec!["containers"]);
    }

    #[test]
    fn leading_zero_modes_are_octal() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse(
            "configMap:\n  name: cfg\n  defaultMode: 0644\nsecret:\n  defaultMode: 0600\n  secretName: s\n",
        );

        let ordered = canonicalizer.canonicalize("volumes", &value).unwrap();
        assert_eq!(ordered.get("configMap").unwrap().keys(), vec!["name"]);
        assert_eq!(
            ordered.get("secret").unwrap().get("defaultMode"),
            Some(&OrderedValue::Scalar(Scalar::Int(384)))
        );
    }

    #[test]
    fn leading_zero_strings_outside_mode_fields_stay_text() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse("zipCode: 0644\n");

        let ordered = canonicalizer.canonicalize("spec", &value).unwrap();
        assert_eq!(
            ordered.get("zipCode"),
            Some(&OrderedValue::Scalar(Scalar::String("0644".to_string())))
        );
    }

    #[test]
    fn scalars_pass_through_registered_contexts() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let value = parse("strategy: null\n");

        let ordered = canonicalizer.canonicalize("StatefulSet", &value).unwrap();
        assert_eq!(ordered.keys(), vec!["strategy"]);
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let registry = PolicyRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);
        let mut value = Value::string("leaf");
        for _ in 0..(MAX_DEPTH + 2) {
            let mut map = Mapping::new();
            map.insert("nested".to_string(), value);
            value = Value::Mapping(map);
        }

        let err = canonicalizer.canonicalize("root", &value).unwrap_err();
        assert!(matches!(err, CanonicalizeError::RecursionLimitExceeded { .. }));
    }
}
