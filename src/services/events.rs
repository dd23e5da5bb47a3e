use crate::{
    db::DbPool,
    entities::{event, item},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{order_of, ListParams, Paged};

/// Fields accepted by `sort` on event collections
pub const SORTABLE: &[&str] = &["id", "created_at", "updated_at", "time"];

fn sort_column(field: &str) -> Option<event::Column> {
    match field {
        "id" => Some(event::Column::Id),
        "created_at" | "time" => Some(event::Column::CreatedAt),
        "updated_at" => Some(event::Column::UpdatedAt),
        _ => None,
    }
}

fn missing_item() -> ServiceError {
    ServiceError::ReferentialIntegrity("item must exist".to_string())
}

/// Fails unless `item_id` names a stored item
async fn ensure_item_exists<C: ConnectionTrait>(db: &C, item_id: i32) -> Result<(), ServiceError> {
    item::Entity::find_by_id(item_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(missing_item)
}

/// Service for managing events
#[derive(Clone)]
pub struct EventService {
    db_pool: Arc<DbPool>,
}

impl EventService {
    /// Creates a new event service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Records an event against an existing item
    #[instrument(skip(self))]
    pub async fn create_event(&self, item_id: Option<i32>) -> Result<event::Model, ServiceError> {
        let item_id = item_id.ok_or_else(missing_item)?;

        let created = self
            .db_pool
            .transaction::<_, event::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    ensure_item_exists(txn, item_id).await?;

                    let created = event::ActiveModel {
                        item_id: Set(item_id),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                    Ok(created)
                })
            })
            .await?;

        info!(event_id = created.id, item_id, "Event created");
        Ok(created)
    }

    /// Gets an event by ID
    #[instrument(skip(self))]
    pub async fn get_event(&self, id: i32) -> Result<event::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        event::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Event {} not found", id)))
    }

    /// Lists one page of events, optionally only those of `item_id`
    #[instrument(skip(self))]
    pub async fn list_events(
        &self,
        item_id: Option<i32>,
        params: ListParams,
    ) -> Result<Paged<event::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = event::Entity::find();

        if let Some(item_id) = item_id {
            query = query.filter(event::Column::ItemId.eq(item_id));
        }
        if let Some(ids) = params.ids {
            query = query.filter(event::Column::Id.is_in(ids));
        }
        for field in &params.sort {
            if let Some(column) = sort_column(&field.field) {
                query = query.order_by(column, order_of(field));
            }
        }
        query = query.order_by_asc(event::Column::Id);

        let paginator = query.paginate(db, params.page.size);
        let record_count = paginator.num_items().await?;
        let records = paginator.fetch_page(params.page.index()).await?;

        Ok(Paged {
            records,
            record_count,
        })
    }

    /// Reassigns an event to another item; `None` leaves it where it is
    #[instrument(skip(self))]
    pub async fn update_event(
        &self,
        id: i32,
        item_id: Option<i32>,
    ) -> Result<event::Model, ServiceError> {
        let updated = self
            .db_pool
            .transaction::<_, event::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let existing = event::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::NotFound(format!("Event {} not found", id)))?;

                    let mut active: event::ActiveModel = existing.into();
                    if let Some(item_id) = item_id {
                        ensure_item_exists(txn, item_id).await?;
                        active.item_id = Set(item_id);
                    }

                    Ok(active.update(txn).await?)
                })
            })
            .await?;

        info!(event_id = id, item_id = updated.item_id, "Event updated");
        Ok(updated)
    }

    /// Deletes an event
    #[instrument(skip(self))]
    pub async fn delete_event(&self, id: i32) -> Result<(), ServiceError> {
        let existing = self.get_event(id).await?;
        let db = self.db_pool.as_ref();
        existing.delete(db).await?;

        info!(event_id = id, "Event deleted");
        Ok(())
    }

    /// The item an event belongs to
    #[instrument(skip(self))]
    pub async fn item_for_event(&self, id: i32) -> Result<item::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let (_, owner) = event::Entity::find_by_id(id)
            .find_also_related(item::Entity)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Event {} not found", id)))?;

        owner.ok_or_else(|| ServiceError::InternalError(format!("Event {} has no item", id)))
    }

    /// Items owning any of `item_ids`, for compound documents
    #[instrument(skip(self))]
    pub async fn items_by_ids(&self, item_ids: &[i32]) -> Result<Vec<item::Model>, ServiceError> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let db = self.db_pool.as_ref();
        let items = item::Entity::find()
            .filter(item::Column::Id.is_in(item_ids.iter().copied()))
            .order_by_asc(item::Column::Id)
            .all(db)
            .await?;
        Ok(items)
    }
}
