pub mod events;
pub mod items;

use serde_json::json;

use crate::{
    errors::ServiceError,
    jsonapi::{document::Links, Document, ResourceObject, ResourceQuery},
    services::ListParams,
    AppState,
};

/// Parses a resource id from the URL; ids that are not integers name nothing
pub(crate) fn parse_id(raw: &str, kind: &str) -> Result<i32, ServiceError> {
    raw.parse::<i32>()
        .map_err(|_| ServiceError::NotFound(format!("{} {} not found", kind, raw)))
}

/// Collection parameters from the query string, bounded by configuration
pub(crate) fn list_params(
    state: &AppState,
    query: &ResourceQuery,
    sortable: &[&str],
) -> Result<ListParams, ServiceError> {
    Ok(ListParams {
        ids: query.id_filter(),
        sort: query.sort_fields(sortable)?,
        page: query.page(
            u64::from(state.config.api_default_page_size),
            u64::from(state.config.api_max_page_size),
        )?,
    })
}

pub(crate) fn collection_document(
    data: Vec<ResourceObject>,
    included: Vec<ResourceObject>,
    links: Links,
    record_count: u64,
) -> Document {
    let mut document = Document::collection(data).with_included(included);
    document.links = links;
    document.meta = Some(json!({ "record_count": record_count }));
    document
}
