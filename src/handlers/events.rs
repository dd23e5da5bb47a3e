use crate::{
    entities::{event, item},
    errors::ServiceError,
    jsonapi::{
        document::{Linkage, RequestResource},
        Document, JsonApi, JsonApiBody, Resource, ResourceObject, ResourceQuery,
    },
    services::events::SORTABLE,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::{collection_document, list_params, parse_id};

/// Relationship paths accepted by `include` on event endpoints
pub const INCLUDABLE: &[&str] = &["item"];

const READ_ONLY: &[&str] = &["time", "created_at", "updated_at"];
const WRITABLE_RELATIONSHIPS: &[&str] = &["item"];

impl Resource for event::Model {
    const TYPE: &'static str = "events";
    const RELATIONSHIPS: &'static [&'static str] = &["item"];

    fn resource_id(&self) -> String {
        self.id.to_string()
    }

    fn attributes(&self) -> Map<String, Value> {
        let mut attributes = Map::new();
        attributes.insert("time".into(), json!(self.time()));
        attributes.insert("created_at".into(), json!(self.created_at));
        attributes.insert("updated_at".into(), json!(self.updated_at));
        attributes
    }

    fn linkage(&self) -> BTreeMap<&'static str, Linkage> {
        BTreeMap::from([(
            "item",
            Linkage::ToOne(Some(crate::jsonapi::ResourceIdentifier::new(
                item::Model::TYPE,
                self.item_id,
            ))),
        )])
    }
}

fn missing_item() -> ServiceError {
    ServiceError::ReferentialIntegrity("item must exist".to_string())
}

/// Item id named by the request's `item` relationship, `None` when absent
fn item_reference(resource: &RequestResource) -> Result<Option<i32>, ServiceError> {
    match resource.to_one("item")? {
        None => Ok(None),
        Some(None) => Err(missing_item()),
        Some(Some(identifier)) if identifier.kind != item::Model::TYPE => {
            Err(ServiceError::ReferentialIntegrity(format!(
                "item must be a resource of type '{}'",
                item::Model::TYPE
            )))
        }
        Some(Some(identifier)) => identifier
            .id
            .parse::<i32>()
            .map(Some)
            .map_err(|_| missing_item()),
    }
}

/// Items owning `records`, when `include=item` was requested
pub(crate) async fn include_items(
    state: &AppState,
    records: &[event::Model],
    includes: &[String],
) -> Result<Vec<ResourceObject>, ServiceError> {
    if !includes.iter().any(|path| path == "item") {
        return Ok(Vec::new());
    }

    let mut ids: Vec<i32> = records.iter().map(|record| record.item_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let items = state.events.items_by_ids(&ids).await?;
    Ok(items
        .iter()
        .map(|item| item.to_resource_object(&state.links))
        .collect())
}

async fn single_event_document(
    state: &AppState,
    record: event::Model,
    includes: &[String],
) -> Result<Document, ServiceError> {
    let included = include_items(state, std::slice::from_ref(&record), includes).await?;
    let self_link = state.links.resource(event::Model::TYPE, &record.resource_id());

    Ok(Document::resource(record.to_resource_object(&state.links))
        .with_included(included)
        .with_self_link(self_link))
}

/// GET /events
pub async fn list_events(
    State(state): State<AppState>,
    query: ResourceQuery,
) -> Result<JsonApi, ServiceError> {
    let includes = query.includes(INCLUDABLE)?;
    let params = list_params(&state, &query, SORTABLE)?;
    let page = params.page;

    let paged = state.events.list_events(None, params).await?;

    let data = paged
        .records
        .iter()
        .map(|record| record.to_resource_object(&state.links))
        .collect();
    let included = include_items(&state, &paged.records, &includes).await?;

    let links = query.pagination_links(
        &state.links.collection(event::Model::TYPE),
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

/// GET /events/:id
pub async fn get_event(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: ResourceQuery,
) -> Result<JsonApi, ServiceError> {
    let includes = query.includes(INCLUDABLE)?;
    let id = parse_id(&raw_id, "Event")?;

    let record = state.events.get_event(id).await?;
    Ok(JsonApi::ok(single_event_document(&state, record, &includes).await?))
}

/// POST /events
pub async fn create_event(
    State(state): State<AppState>,
    JsonApiBody(resource): JsonApiBody,
) -> Result<JsonApi, ServiceError> {
    resource.expect_type(event::Model::TYPE)?;
    resource.expect_no_id()?;
    resource.check_attributes(&[], READ_ONLY)?;
    resource.check_relationships(WRITABLE_RELATIONSHIPS)?;

    let created = state.events.create_event(item_reference(&resource)?).await?;

    let location = state.links.resource(event::Model::TYPE, &created.resource_id());
    let document = single_event_document(&state, created, &[]).await?;
    Ok(JsonApi::created(document, location))
}

/// PATCH /events/:id
pub async fn update_event(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    JsonApiBody(resource): JsonApiBody,
) -> Result<JsonApi, ServiceError> {
    let id = parse_id(&raw_id, "Event")?;
    resource.expect_type(event::Model::TYPE)?;
    resource.expect_id(&raw_id)?;
    resource.check_attributes(&[], READ_ONLY)?;
    resource.check_relationships(WRITABLE_RELATIONSHIPS)?;

    let updated = state
        .events
        .update_event(id, item_reference(&resource)?)
        .await?;

    Ok(JsonApi::ok(single_event_document(&state, updated, &[]).await?))
}

/// DELETE /events/:id
pub async fn delete_event(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let id = parse_id(&raw_id, "Event")?;
    state.events.delete_event(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /events/:id/item
pub async fn event_item(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<JsonApi, ServiceError> {
    let id = parse_id(&raw_id, "Event")?;
    let owner = state.events.item_for_event(id).await?;

    let document = Document::resource(owner.to_resource_object(&state.links))
        .with_self_link(state.links.related(event::Model::TYPE, &raw_id, "item"));
    Ok(JsonApi::ok(document))
}

/// GET /events/:id/relationships/item
pub async fn event_item_relationship(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<JsonApi, ServiceError> {
    let id = parse_id(&raw_id, "Event")?;
    let record = state.events.get_event(id).await?;

    let mut document = Document::identifier(Some(crate::jsonapi::ResourceIdentifier::new(
        item::Model::TYPE,
        record.item_id,
    )));
    document.links = state
        .links
        .relationship_links(event::Model::TYPE, &raw_id, "item");

    Ok(JsonApi::ok(document))
}

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:id",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/events/:id/item", get(event_item))
        .route("/events/:id/relationships/item", get(event_item_relationship))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::jsonapi::document::RequestDocument;
    use chrono::Utc;

    fn parse(body: Value) -> RequestResource {
        serde_json::from_value::<RequestDocument>(body).unwrap().data
    }

    #[test]
    fn item_reference_reads_linkage() {
        let resource = parse(json!({
            "data": {"type": "events", "relationships": {"item": {"data": {"type": "items", "id": "12"}}}}
        }));
        assert_eq!(item_reference(&resource).unwrap(), Some(12));

        let resource = parse(json!({"data": {"type": "events"}}));
        assert_eq!(item_reference(&resource).unwrap(), None);
    }

    #[test]
    fn item_reference_rejects_null_and_foreign_types() {
        let resource = parse(json!({
            "data": {"type": "events", "relationships": {"item": {"data": null}}}
        }));
        assert_matches!(
            item_reference(&resource),
            Err(ServiceError::ReferentialIntegrity(_))
        );

        let resource = parse(json!({
            "data": {"type": "events", "relationships": {"item": {"data": {"type": "events", "id": "1"}}}}
        }));
        assert_matches!(
            item_reference(&resource),
            Err(ServiceError::ReferentialIntegrity(_))
        );
    }

    #[test]
    fn event_attributes_expose_time_as_created_at() {
        let now = Utc::now();
        let record = event::Model {
            id: 3,
            item_id: 8,
            created_at: now,
            updated_at: now,
        };

        let attributes = record.attributes();
        assert_eq!(attributes["time"], attributes["created_at"]);

        let object = record.to_resource_object(&crate::jsonapi::LinkBuilder::default());
        assert_eq!(
            object.relationships["item"].data,
            Some(Linkage::ToOne(Some(crate::jsonapi::ResourceIdentifier::new(
                "items", 8
            ))))
        );
    }
}
