use crate::domain::Labels;

/// Minimal metadata view over a domain object.
///
/// Event sources are generic over their object type; this trait is what the
/// stock key functions (see [`crate::meta_namespace_key`]) and label filters need.
pub trait ObjectMeta {
    /// Namespace of the object, `None` for cluster-scoped objects.
    fn namespace(&self) -> Option<&str>;

    /// Object name. An empty name marks a malformed object.
    fn name(&self) -> &str;

    /// Labels attached to the object.
    fn labels(&self) -> &Labels;
}
