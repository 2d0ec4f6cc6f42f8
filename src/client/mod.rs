//! Resource client: typed access to the content API's REST endpoints.
//!
//! [`ResourceClient`] is the transport seam (JSON in, JSON out);
//! [`ResourceApi`] layers resource paths, pagination and entity decoding on top.

mod api;
mod error;
mod http;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::Method;

use crate::domain::QueryParams;

pub use api::ResourceApi;
pub use error::ClientError;
pub use http::HttpResourceClient;

/// Entity types exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Blogs,
    Tags,
    Writers,
    Domains,
    Mentions,
    Formations,
    AcademicYears,
    Offerings,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Blogs,
        Resource::Tags,
        Resource::Writers,
        Resource::Domains,
        Resource::Mentions,
        Resource::Formations,
        Resource::AcademicYears,
        Resource::Offerings,
    ];

    /// Collection path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Blogs => "blogs",
            Resource::Tags => "tags",
            Resource::Writers => "writers",
            Resource::Domains => "domaines",
            Resource::Mentions => "mentions",
            Resource::Formations => "formations",
            Resource::AcademicYears => "annees-academiques",
            Resource::Offerings => "offres-formations",
        }
    }

    fn english_alias(self) -> &'static str {
        match self {
            Resource::Domains => "domains",
            Resource::AcademicYears => "academic-years",
            Resource::Offerings => "offerings",
            other => other.path(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Resource::ALL
            .into_iter()
            .find(|resource| resource.path() == needle || resource.english_alias() == needle)
            .ok_or_else(|| {
                let known: Vec<&str> = Resource::ALL.iter().map(|r| r.path()).collect();
                format!("unknown resource `{value}` (expected one of: {})", known.join(", "))
            })
    }
}

/// Transport used by [`ResourceApi`].
///
/// Paths are relative to the API base URL. `send_json` returns `None` for
/// empty (e.g. 204) responses.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get_json(
        &self,
        path: &str,
        query: &QueryParams,
    ) -> Result<serde_json::Value, ClientError>;

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_parses_paths_and_aliases() {
        assert_eq!("domaines".parse::<Resource>(), Ok(Resource::Domains));
        assert_eq!("domains".parse::<Resource>(), Ok(Resource::Domains));
        assert_eq!("Offerings".parse::<Resource>(), Ok(Resource::Offerings));
        assert_eq!(
            "annees-academiques".parse::<Resource>(),
            Ok(Resource::AcademicYears)
        );
        assert!("students".parse::<Resource>().is_err());
    }
}
