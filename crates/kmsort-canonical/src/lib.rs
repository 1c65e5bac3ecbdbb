//! Canonical field ordering for Kubernetes-style manifests.
//!
//! Semantically identical manifests always serialize to the same bytes:
//! well-known fields come first in a fixed order, everything else follows
//! alphabetically, and fields that only restate a cluster default or were
//! filled in by the cluster are dropped.
//!
//! ```rust
//! use kmsort_canonical::{canonicalize_document, PolicyRegistry};
//!
//! let registry = PolicyRegistry::builtin();
//! let text = "kind: Service\napiVersion: v1\nmetadata: {name: web, uid: x}\n\
//!             spec: {type: ClusterIP, ports: [], selector: {app: web}}\n";
//!
//! let canonical = canonicalize_document(&registry, text)?;
//! assert_eq!(
//!     canonical,
//!     "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\nspec:\n  selector:\n    app: web\n  ports: []\n"
//! );
//! # Ok::<(), kmsort_canonical::CanonicalizeError>(())
//! ```
#![deny(missing_docs)]

/// Text-level document and stream entry points.
pub mod batch;
/// Recursive field ordering.
pub mod canonicalizer;
/// Default-value elision.
pub mod defaults;
/// Error types.
pub mod error;
/// Top-level manifest layout.
pub mod manifest;
/// Ordering, default and ignore tables.
pub mod registry;
/// Generic and ordered document trees.
pub mod value;

pub use batch::{
    canonicalize_batch, canonicalize_document, split_documents, BatchMode, BatchOutput,
    DOCUMENT_SEPARATOR,
};
pub use canonicalizer::Canonicalizer;
pub use defaults::is_default;
pub use error::{BatchError, CanonicalizeError, PolicyError};
pub use manifest::{Manifest, ManifestAssembler, ManifestBody};
pub use registry::PolicyRegistry;
pub use value::{Mapping, OrderedValue, Scalar, Value};
