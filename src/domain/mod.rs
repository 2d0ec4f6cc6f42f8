pub mod pagination;
pub mod query;

pub use pagination::{PaginatedResult, PaginationError};
pub use query::{FilterField, FilterState, ListQuery, QueryParams};
