//! Client-side data layer for the campus content API.
//!
//! Views read resources through [`hooks::ResourceHook`], which key their
//! requests into the shared [`cache::CacheStore`]. List screens drive their
//! hook through a [`list::ListController`].

pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod hooks;
pub mod infra;
pub mod list;
