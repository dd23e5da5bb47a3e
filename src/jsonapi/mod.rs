//! JSON:API document model, query parameters and request/response plumbing.

pub mod document;
pub mod extract;
pub mod query;
pub mod resource;

pub use document::{Document, Linkage, ResourceIdentifier, ResourceObject};
pub use extract::{JsonApi, JsonApiBody};
pub use query::{Page, ResourceQuery, SortField};
pub use resource::{LinkBuilder, Resource};

/// The JSON:API media type
pub const MEDIA_TYPE: &str = "application/vnd.api+json";
