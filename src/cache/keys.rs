//! Cache key definitions.

use std::fmt;

use crate::client::Resource;
use crate::domain::{ListQuery, QueryParams};

/// Identifies one request: a resource, an optional item id and its parameters.
///
/// Parameters are sorted and blank values dropped, so semantically equal
/// requests share a key whatever order their filters were set in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    resource: Resource,
    item: Option<String>,
    params: QueryParams,
}

impl ResourceKey {
    /// Key of a list request.
    pub fn collection(resource: Resource, query: &ListQuery) -> Self {
        Self::with_params(resource, query.params())
    }

    pub fn with_params(resource: Resource, params: QueryParams) -> Self {
        Self {
            resource,
            item: None,
            params,
        }
    }

    /// Key of a single-entity request.
    pub fn item(resource: Resource, id: impl Into<String>) -> Self {
        Self {
            resource,
            item: Some(id.into().trim().to_string()),
            params: QueryParams::new(),
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item.as_deref()
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn is_collection(&self) -> bool {
        self.item.is_none()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource.path())?;
        if let Some(item) = &self.item {
            write!(f, "/{item}")?;
        }
        if !self.params.is_empty() {
            write!(f, "?{}", self.params)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::FilterField;

    use super::*;

    #[test]
    fn equivalent_queries_share_a_key() {
        let a = ListQuery::new()
            .filter(FilterField::Tag, "")
            .filter(FilterField::Search, "")
            .page(1);
        let b = ListQuery::new();
        assert_eq!(
            ResourceKey::collection(Resource::Blogs, &a),
            ResourceKey::collection(Resource::Blogs, &b)
        );
    }

    #[test]
    fn filter_order_does_not_matter() {
        let a = ListQuery::new()
            .filter(FilterField::Tag, "math")
            .filter(FilterField::Year, "2024");
        let b = ListQuery::new()
            .filter(FilterField::Year, "2024")
            .filter(FilterField::Tag, "math");
        let key_a = ResourceKey::collection(Resource::Blogs, &a);
        assert_eq!(key_a, ResourceKey::collection(Resource::Blogs, &b));
        assert_eq!(key_a.to_string(), "blogs?page=1&tag=math&year=2024");
    }

    #[test]
    fn resource_and_page_distinguish_keys() {
        let query = ListQuery::new();
        assert_ne!(
            ResourceKey::collection(Resource::Blogs, &query),
            ResourceKey::collection(Resource::Tags, &query)
        );
        assert_ne!(
            ResourceKey::collection(Resource::Blogs, &query),
            ResourceKey::collection(Resource::Blogs, &query.clone().page(2))
        );
    }

    #[test]
    fn item_keys_render_as_paths() {
        let key = ResourceKey::item(Resource::Blogs, " intro-to-rust ");
        assert_eq!(key.to_string(), "blogs/intro-to-rust");
        assert!(!key.is_collection());
    }
}
