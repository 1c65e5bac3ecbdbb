use crate::canonicalizer::Canonicalizer;
use crate::error::CanonicalizeError;
use crate::value::{Mapping, OrderedValue, Scalar, Value};

/// Payload section of a manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestBody<'v> {
    /// Desired state of a workload kind.
    Spec(&'v Mapping),
    /// `data` of a data-bearing kind.
    Data(&'v Mapping),
    /// `stringData` of a data-bearing kind, used when `data` is empty.
    StringData(&'v Mapping),
}

/// Typed view over a top-level document.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest<'v> {
    /// `apiVersion`, empty string when absent.
    pub api_version: Scalar,
    /// `kind`, empty string when absent.
    pub kind: Scalar,
    /// `metadata`, empty when absent.
    pub metadata: Option<&'v Mapping>,
    /// `spec`, `data` or `stringData`, chosen by kind.
    pub body: Option<ManifestBody<'v>>,
}

impl<'v> Manifest<'v> {
    /// Builds the view; `data_kind` decides between `spec` and the data maps.
    pub fn from_value(
        value: &'v Value,
        data_kind: impl Fn(&str) -> bool,
    ) -> Result<Self, CanonicalizeError> {
        let doc = value
            .as_mapping()
            .ok_or_else(|| CanonicalizeError::shape("document", "mapping", value.shape()))?;

        let api_version = top_scalar(doc, "apiVersion")?;
        let kind = top_scalar(doc, "kind")?;
        let metadata = optional_mapping(doc, "metadata")?;

        let body = if data_kind(&kind.to_key()) {
            match optional_mapping(doc, "data")? {
                Some(data) if !data.is_empty() => Some(ManifestBody::Data(data)),
                _ => optional_mapping(doc, "stringData")?
                    .filter(|data| !data.is_empty())
                    .map(ManifestBody::StringData),
            }
        } else {
            optional_mapping(doc, "spec")?.map(ManifestBody::Spec)
        };

        Ok(Self {
            api_version,
            kind,
            metadata,
            body,
        })
    }
}

fn top_scalar(doc: &Mapping, field: &str) -> Result<Scalar, CanonicalizeError> {
    match doc.get(field) {
        None | Some(Value::Scalar(Scalar::Null)) => Ok(Scalar::String(String::new())),
        Some(Value::Scalar(scalar)) => Ok(scalar.clone()),
        Some(other) => Err(CanonicalizeError::shape(field, "scalar", other.shape())),
    }
}

fn optional_mapping<'v>(
    doc: &'v Mapping,
    field: &str,
) -> Result<Option<&'v Mapping>, CanonicalizeError> {
    match doc.get(field) {
        None | Some(Value::Scalar(Scalar::Null)) => Ok(None),
        Some(Value::Mapping(map)) => Ok(Some(map)),
        Some(other) => Err(CanonicalizeError::shape(field, "mapping", other.shape())),
    }
}

/// Orders the fixed top-level keys and dispatches nested parts into the
/// [`Canonicalizer`].
#[derive(Debug, Clone, Copy)]
pub struct ManifestAssembler<'a> {
    canonicalizer: Canonicalizer<'a>,
}

impl<'a> ManifestAssembler<'a> {
    /// Creates an assembler on top of `canonicalizer`.
    pub fn new(canonicalizer: Canonicalizer<'a>) -> Self {
        Self { canonicalizer }
    }

    /// Canonicalizes a whole parsed document.
    pub fn assemble_value(&self, value: &Value) -> Result<OrderedValue, CanonicalizeError> {
        let registry = self.canonicalizer.registry();
        let manifest = Manifest::from_value(value, |kind| registry.is_data_kind(kind))?;
        self.assemble(&manifest)
    }

    /// Emits `apiVersion`, `kind`, `metadata` and then the body.
    pub fn assemble(&self, manifest: &Manifest<'_>) -> Result<OrderedValue, CanonicalizeError> {
        let kind = manifest.kind.to_key();

        let metadata = match manifest.metadata {
            Some(map) => self.canonicalizer.canonicalize_mapping("metadata", map)?,
            None => OrderedValue::Mapping(Vec::new()),
        };
        let mut output = vec![
            (
                "apiVersion".to_string(),
                OrderedValue::Scalar(manifest.api_version.clone()),
            ),
            ("kind".to_string(), OrderedValue::Scalar(manifest.kind.clone())),
            ("metadata".to_string(), metadata),
        ];

        match manifest.body {
            Some(ManifestBody::Data(data)) => {
                output.push(("data".to_string(), OrderedValue::verbatim_mapping(data)));
            }
            Some(ManifestBody::StringData(data)) => {
                output.push(("stringData".to_string(), OrderedValue::verbatim_mapping(data)));
            }
            Some(ManifestBody::Spec(spec)) => {
                output.push((
                    "spec".to_string(),
                    self.canonicalizer.canonicalize_spec(&kind, spec)?,
                ));
            }
            None => {}
        }

        Ok(OrderedValue::Mapping(output))
    }
}
