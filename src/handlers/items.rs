use crate::{
    entities::{item, item::ItemAttributes},
    errors::ServiceError,
    jsonapi::{
        Document, JsonApi, JsonApiBody, Linkage, Resource, ResourceObject, ResourceQuery,
    },
    services::items::SORTABLE,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde_json::{json, Map, Value};

use super::{collection_document, list_params, parse_id};

/// Relationship paths accepted by `include` on item endpoints
pub const INCLUDABLE: &[&str] = &["events"];

const WRITABLE: &[&str] = &["name"];
const READ_ONLY: &[&str] = &["created_at", "updated_at"];

impl Resource for item::Model {
    const TYPE: &'static str = "items";
    const RELATIONSHIPS: &'static [&'static str] = &["events"];

    fn resource_id(&self) -> String {
        self.id.to_string()
    }

    fn attributes(&self) -> Map<String, Value> {
        let mut attributes = Map::new();
        attributes.insert("name".into(), json!(self.name));
        attributes.insert("created_at".into(), json!(self.created_at));
        attributes.insert("updated_at".into(), json!(self.updated_at));
        attributes
    }
}

/// Adds `events` linkage to each item and returns the events to include
async fn include_events(
    state: &AppState,
    records: &[item::Model],
    objects: &mut [ResourceObject],
    includes: &[String],
) -> Result<Vec<ResourceObject>, ServiceError> {
    if !includes.iter().any(|path| path == "events") {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = records.iter().map(|record| record.id).collect();
    let events = state.items.events_for_items(&ids).await?;

    for (record, object) in records.iter().zip(objects.iter_mut()) {
        let linkage = events
            .iter()
            .filter(|event| event.item_id == record.id)
            .map(|event| event.identifier())
            .collect();
        object.set_linkage("events", Linkage::ToMany(linkage));
    }

    Ok(events
        .iter()
        .map(|event| event.to_resource_object(&state.links))
        .collect())
}

async fn single_item_document(
    state: &AppState,
    record: item::Model,
    includes: &[String],
) -> Result<Document, ServiceError> {
    let mut objects = vec![record.to_resource_object(&state.links)];
    let included = include_events(state, std::slice::from_ref(&record), &mut objects, includes).await?;

    let self_link = state.links.resource(item::Model::TYPE, &record.resource_id());
    let object = objects.pop().ok_or_else(|| {
        ServiceError::InternalError("resource object missing from document".to_string())
    })?;

    Ok(Document::resource(object)
        .with_included(included)
        .with_self_link(self_link))
}

/// GET /items
pub async fn list_items(
    State(state): State<AppState>,
    query: ResourceQuery,
) -> Result<JsonApi, ServiceError> {
    let includes = query.includes(INCLUDABLE)?;
    let params = list_params(&state, &query, SORTABLE)?;
    let page = params.page;

    let paged = state.items.list_items(params).await?;

    let mut data: Vec<ResourceObject> = paged
        .records
        .iter()
        .map(|record| record.to_resource_object(&state.links))
        .collect();
    let included = include_events(&state, &paged.records, &mut data, &includes).await?;

    let links = query.pagination_links(
        &state.links.collection(item::Model::TYPE),
        page,
        paged.record_count,
    );

    Ok(JsonApi::ok(collection_document(
        data,
        included,
        links,
        paged.record_count,
    )))
}

/// GET /items/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: ResourceQuery,
) -> Result<JsonApi, ServiceError> {
    let includes = query.includes(INCLUDABLE)?;
    let id = parse_id(&raw_id, "Item")?;

    let record = state.items.get_item(id).await?;
    Ok(JsonApi::ok(single_item_document(&state, record, &includes).await?))
}

/// POST /items
pub async fn create_item(
    State(state): State<AppState>,
    JsonApiBody(resource): JsonApiBody,
) -> Result<JsonApi, ServiceError> {
    resource.expect_type(item::Model::TYPE)?;
    resource.expect_no_id()?;
    resource.check_attributes(WRITABLE, READ_ONLY)?;
    resource.check_relationships(&[])?;

    let attributes = ItemAttributes {
        name: resource.string_attribute("name")?.flatten(),
    };
    let created = state.items.create_item(attributes).await?;

    let location = state.links.resource(item::Model::TYPE, &created.resource_id());
    let document = single_item_document(&state, created, &[]).await?;
    Ok(JsonApi::created(document, location))
}

/// PATCH /items/:id
pub async fn update_item(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    JsonApiBody(resource): JsonApiBody,
) -> Result<JsonApi, ServiceError> {
    let id = parse_id(&raw_id, "Item")?;
    resource.expect_type(item::Model::TYPE)?;
    resource.expect_id(&raw_id)?;
    resource.check_attributes(WRITABLE, READ_ONLY)?;
    resource.check_relationships(&[])?;

    let updated = state
        .items
        .update_item(id, resource.string_attribute("name")?)
        .await?;

    Ok(JsonApi::ok(single_item_document(&state, updated, &[]).await?))
}

/// DELETE /items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let id = parse_id(&raw_id, "Item")?;
    state.items.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /items/:id/events
pub async fn item_events(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: ResourceQuery,
) -> Result<JsonApi, ServiceError> {
    let includes = query.includes(super::events::INCLUDABLE)?;
    let id = parse_id(&raw_id, "Item")?;
    let params = list_params(&state, &query, crate::services::events::SORTABLE)?;
    let page = params.page;

    state.items.get_item(id).await?;
    let paged = state.events.list_events(Some(id), params).await?;

    let data = paged
        .records
        .iter()
        .map(|record| record.to_resource_object(&state.links))
        .collect();
    let included = super::events::include_items(&state, &paged.records, &includes).await?;

    let links = query.pagination_links(
        &state.links.related(item::Model::TYPE, &raw_id, "events"),
        page,
        paged.record_count,
    );

    Ok(JsonApi::ok(collection_document(
        data,
        included,
        links,
        paged.record_count,
    )))
}

/// GET /items/:id/relationships/events
///
/// Linkage is paged like the related collection; `self` and `related` stay
/// the bare relationship URLs.
pub async fn item_event_relationships(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: ResourceQuery,
) -> Result<JsonApi, ServiceError> {
    let id = parse_id(&raw_id, "Item")?;
    let params = list_params(&state, &query, crate::services::events::SORTABLE)?;
    let page = params.page;

    state.items.get_item(id).await?;
    let paged = state.events.list_events(Some(id), params).await?;

    let mut document = Document::identifiers(
        paged
            .records
            .iter()
            .map(|event| event.identifier())
            .collect(),
    );
    let base = state.links.relationship(item::Model::TYPE, &raw_id, "events");
    let mut links = query.pagination_links(&base, page, paged.record_count);
    links.remove("self");
    links.extend(
        state
            .links
            .relationship_links(item::Model::TYPE, &raw_id, "events"),
    );
    document.links = links;
    document.meta = Some(json!({ "record_count": paged.record_count }));

    Ok(JsonApi::ok(document))
}

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/:id",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/items/:id/events", get(item_events))
        .route(
            "/items/:id/relationships/events",
            get(item_event_relationships),
        )
}
