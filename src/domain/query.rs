//! Filter and query parameter types shared by list screens, hooks and the client.

use std::collections::BTreeMap;
use std::fmt;

use url::form_urlencoded;

/// A filter a list screen can narrow its results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Search,
    Tag,
    Status,
    AuthorId,
    Year,
}

impl FilterField {
    pub const ALL: [FilterField; 5] = [
        FilterField::Search,
        FilterField::Tag,
        FilterField::Status,
        FilterField::AuthorId,
        FilterField::Year,
    ];

    /// Query parameter name sent to the API.
    pub fn param(self) -> &'static str {
        match self {
            FilterField::Search => "search",
            FilterField::Tag => "tag",
            FilterField::Status => "status",
            FilterField::AuthorId => "author_id",
            FilterField::Year => "year",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param())
    }
}

/// Current filter values of a list screen. `None` means "not filtered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterState {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub status: Option<String>,
    pub author_id: Option<String>,
    pub year: Option<String>,
}

impl FilterState {
    pub fn get(&self, field: FilterField) -> Option<&str> {
        match field {
            FilterField::Search => self.search.as_deref(),
            FilterField::Tag => self.tag.as_deref(),
            FilterField::Status => self.status.as_deref(),
            FilterField::AuthorId => self.author_id.as_deref(),
            FilterField::Year => self.year.as_deref(),
        }
    }

    /// Builder-style setter. Blank values clear the field.
    pub fn with(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    /// Sets `field`, returning whether the stored value changed.
    pub fn set(&mut self, field: FilterField, value: Option<String>) -> bool {
        let value = normalize(value);
        let slot = self.slot_mut(field);
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    /// Number of fields holding a non-default value.
    pub fn active_count(&self) -> usize {
        FilterField::ALL
            .iter()
            .filter(|field| self.get(**field).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    fn slot_mut(&mut self, field: FilterField) -> &mut Option<String> {
        match field {
            FilterField::Search => &mut self.search,
            FilterField::Tag => &mut self.tag,
            FilterField::Status => &mut self.status,
            FilterField::AuthorId => &mut self.author_id,
            FilterField::Year => &mut self.year,
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == raw.len() {
            Some(raw)
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Sorted, non-empty query parameters.
///
/// Insertion order never matters and blank values are dropped, so two
/// semantically identical parameter sets always compare and render equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match normalize(Some(value.into())) {
            Some(value) => {
                self.0.insert(key, value);
            }
            None => {
                self.0.remove(&key);
            }
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.iter() {
            serializer.append_pair(key, value);
        }
        f.write_str(&serializer.finish())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Complete parameter set of a list request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub filters: FilterState,
    pub page: u32,
    pub per_page: Option<u32>,
    /// Resource-specific parameters such as `domain_id` for mentions.
    pub extra: QueryParams,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: FilterState::default(),
            page: 1,
            per_page: None,
            extra: QueryParams::default(),
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.filters.set(field, Some(value.into()));
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key, value);
        self
    }

    pub fn params(&self) -> QueryParams {
        let mut params = self.extra.clone();
        for field in FilterField::ALL {
            if let Some(value) = self.filters.get(field) {
                params.insert(field.param(), value);
            }
        }
        params.insert("page", self.page.to_string());
        if let Some(per_page) = self.per_page {
            params.insert("per_page", per_page.to_string());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filter_values_are_unset() {
        let mut filters = FilterState::default();
        assert!(!filters.set(FilterField::Tag, Some("   ".into())));
        assert_eq!(filters.tag, None);

        assert!(filters.set(FilterField::Tag, Some(" math ".into())));
        assert_eq!(filters.get(FilterField::Tag), Some("math"));

        assert!(!filters.set(FilterField::Tag, Some("math".into())));
    }

    #[test]
    fn active_count_ignores_unset_fields() {
        let filters = FilterState::default()
            .with(FilterField::Tag, "math")
            .with(FilterField::Year, "2024")
            .with(FilterField::Search, "");
        assert_eq!(filters.active_count(), 2);
    }

    #[test]
    fn params_are_order_independent() {
        let a: QueryParams = [("tag", "math"), ("search", "intro"), ("page", "1")]
            .into_iter()
            .collect();
        let b: QueryParams = [("page", "1"), ("search", "intro"), ("tag", "math")]
            .into_iter()
            .collect();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "page=1&search=intro&tag=math");
    }

    #[test]
    fn empty_filters_match_absent_filters() {
        let explicit = ListQuery::new()
            .filter(FilterField::Tag, "")
            .filter(FilterField::Search, "")
            .page(1);
        assert_eq!(explicit.params(), ListQuery::new().params());
    }

    #[test]
    fn params_are_url_encoded() {
        let query = ListQuery::new().filter(FilterField::Search, "génie civil & co");
        assert_eq!(
            query.params().to_string(),
            "page=1&search=g%C3%A9nie+civil+%26+co"
        );
    }
}
