use thiserror::Error;

use crate::domain::{ObjectMeta, QueueKey};

/// Failure to derive a work key from an object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("object has no name")]
    MissingName,

    #[error("malformed key: {0}")]
    Malformed(String),

    #[error("{0}")]
    Other(String),
}

/// Build the canonical `<namespace>/<name>` key for an object.
///
/// Cluster-scoped objects (no namespace, or an empty one) are keyed by name only.
///
/// # Examples
/// ```
/// use recon_model::{Labels, ObjectMeta, meta_namespace_key};
///
/// struct Secret { ns: String, name: String, labels: Labels }
///
/// impl ObjectMeta for Secret {
///     fn namespace(&self) -> Option<&str> { Some(&self.ns) }
///     fn name(&self) -> &str { &self.name }
///     fn labels(&self) -> &Labels { &self.labels }
/// }
///
/// let s = Secret { ns: "test".into(), name: "test-secret".into(), labels: Labels::new() };
/// assert_eq!(meta_namespace_key(&s).unwrap(), "test/test-secret");
/// ```
pub fn meta_namespace_key<O: ObjectMeta + ?Sized>(obj: &O) -> Result<QueueKey, KeyError> {
    let name = obj.name();
    if name.trim().is_empty() {
        return Err(KeyError::MissingName);
    }
    match obj.namespace() {
        Some(ns) if !ns.is_empty() => Ok(format!("{ns}/{name}")),
        _ => Ok(name.to_string()),
    }
}

/// Split a key produced by [`meta_namespace_key`] back into `(namespace, name)`.
///
/// Rules:
/// - `"name"` yields `(None, "name")`;
/// - `"ns/name"` yields `(Some("ns"), "name")`;
/// - anything with more than one `/` or an empty segment is rejected.
pub fn split_meta_namespace_key(key: &str) -> Result<(Option<&str>, &str), KeyError> {
    let mut parts = key.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) if !name.is_empty() => Ok((None, name)),
        (Some(ns), Some(name), None) if !ns.is_empty() && !name.is_empty() => {
            Ok((Some(ns), name))
        }
        _ => Err(KeyError::Malformed(key.to_string())),
    }
}
