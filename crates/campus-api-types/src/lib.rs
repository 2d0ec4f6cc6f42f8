//! Wire types for the campus content API.
//!
//! Entities mirror the JSON documents returned by the API. Field names follow
//! the API's English spelling; French spellings used by some endpoints are
//! accepted as aliases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type EntityId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Writer {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    pub id: EntityId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    /// Publication timestamp as sent by the API (not reparsed).
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub author: Option<Writer>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: EntityId,
    #[serde(alias = "nom")]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: EntityId,
    #[serde(alias = "nom")]
    pub name: String,
    #[serde(default, alias = "domaine_id")]
    pub domain_id: Option<EntityId>,
    #[serde(default, alias = "domaine")]
    pub domain: Option<Domain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    pub id: EntityId,
    #[serde(alias = "titre", alias = "nom")]
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "niveau")]
    pub level: Option<String>,
    #[serde(default)]
    pub mention_id: Option<EntityId>,
    #[serde(default)]
    pub mention: Option<Mention>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYear {
    pub id: EntityId,
    #[serde(alias = "libelle")]
    pub label: String,
    #[serde(default, alias = "date_debut")]
    pub starts_on: Option<String>,
    #[serde(default, alias = "date_fin")]
    pub ends_on: Option<String>,
    #[serde(default, alias = "en_cours")]
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    pub id: EntityId,
    pub formation_id: EntityId,
    #[serde(alias = "annee_academique_id")]
    pub academic_year_id: EntityId,
    #[serde(default)]
    pub formation: Option<Formation>,
    #[serde(default, alias = "annee_academique")]
    pub academic_year: Option<AcademicYear>,
    #[serde(default, alias = "places")]
    pub seats: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Pagination metadata attached to every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub current_page: u32,
    pub last_page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

/// `{data, meta, links?}` body of list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
    #[serde(default)]
    pub links: Option<PageLinks>,
}

/// Body of item endpoints: either wrapped in `data` or the bare entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ItemEnvelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(value) => value,
        }
    }
}

/// Error body. `errors` is only populated for 422 validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}
