use crate::{
    config::ItemDeletePolicy,
    db::DbPool,
    entities::{event, item, item::ItemAttributes},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::{order_of, ListParams, Paged};

/// Fields accepted by `sort` on the items collection
pub const SORTABLE: &[&str] = &["id", "name", "created_at", "updated_at"];

fn sort_column(field: &str) -> Option<item::Column> {
    match field {
        "id" => Some(item::Column::Id),
        "name" => Some(item::Column::Name),
        "created_at" => Some(item::Column::CreatedAt),
        "updated_at" => Some(item::Column::UpdatedAt),
        _ => None,
    }
}

/// Service for managing items
#[derive(Clone)]
pub struct ItemService {
    db_pool: Arc<DbPool>,
    delete_policy: ItemDeletePolicy,
}

impl ItemService {
    /// Creates a new item service instance
    pub fn new(db_pool: Arc<DbPool>, delete_policy: ItemDeletePolicy) -> Self {
        Self {
            db_pool,
            delete_policy,
        }
    }

    pub fn delete_policy(&self) -> ItemDeletePolicy {
        self.delete_policy
    }

    /// Creates a new item after checking name presence
    #[instrument(skip(self))]
    pub async fn create_item(&self, attributes: ItemAttributes) -> Result<item::Model, ServiceError> {
        attributes.validate()?;
        let name = attributes.name.unwrap_or_default();

        let db = self.db_pool.as_ref();
        let created = item::ActiveModel {
            name: Set(name),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(item_id = created.id, "Item created");
        Ok(created)
    }

    /// Gets an item by ID
    #[instrument(skip(self))]
    pub async fn get_item(&self, id: i32) -> Result<item::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        item::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", id)))
    }

    /// Lists one page of items
    #[instrument(skip(self))]
    pub async fn list_items(&self, params: ListParams) -> Result<Paged<item::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = item::Entity::find();

        if let Some(ids) = params.ids {
            query = query.filter(item::Column::Id.is_in(ids));
        }
        for field in &params.sort {
            if let Some(column) = sort_column(&field.field) {
                query = query.order_by(column, order_of(field));
            }
        }
        query = query.order_by_asc(item::Column::Id);

        let paginator = query.paginate(db, params.page.size);
        let record_count = paginator.num_items().await?;
        let records = paginator.fetch_page(params.page.index()).await?;

        Ok(Paged {
            records,
            record_count,
        })
    }

    /// Applies a partial update; `name` is `None` when the request left it out
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        id: i32,
        name: Option<Option<String>>,
    ) -> Result<item::Model, ServiceError> {
        let existing = self.get_item(id).await?;

        let merged = ItemAttributes {
            name: name.unwrap_or_else(|| Some(existing.name.clone())),
        };
        merged.validate()?;

        let mut active: item::ActiveModel = existing.into();
        active.name = Set(merged.name.unwrap_or_default());

        let db = self.db_pool.as_ref();
        let updated = active.update(db).await?;

        info!(item_id = id, "Item updated");
        Ok(updated)
    }

    /// Deletes an item, honouring the configured policy for its events
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: i32) -> Result<(), ServiceError> {
        let policy = self.delete_policy;

        self.db_pool
            .transaction::<_, (), ServiceError>(|txn| {
                Box::pin(async move {
                    let existing = item::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", id)))?;

                    let events = event::Entity::find()
                        .filter(event::Column::ItemId.eq(id))
                        .count(txn)
                        .await?;

                    match policy {
                        ItemDeletePolicy::Restrict if events > 0 => {
                            warn!(item_id = id, events, "Refusing to delete item with events");
                            return Err(ServiceError::Conflict(format!(
                                "Item {} still has {} event(s)",
                                id, events
                            )));
                        }
                        ItemDeletePolicy::Restrict => {}
                        ItemDeletePolicy::Cascade => {
                            let removed = event::Entity::delete_many()
                                .filter(event::Column::ItemId.eq(id))
                                .exec(txn)
                                .await?;
                            info!(item_id = id, events = removed.rows_affected, "Deleted events of item");
                        }
                    }

                    existing.delete(txn).await.map_err(|e| match e.sql_err() {
                        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                            ServiceError::Conflict(format!("Item {} still has events", id))
                        }
                        _ => e.into(),
                    })?;
                    Ok(())
                })
            })
            .await?;

        info!(item_id = id, policy = %policy, "Item deleted");
        Ok(())
    }

    /// Events belonging to any of `item_ids`, for compound documents
    #[instrument(skip(self))]
    pub async fn events_for_items(&self, item_ids: &[i32]) -> Result<Vec<event::Model>, ServiceError> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let db = self.db_pool.as_ref();
        let events = event::Entity::find()
            .filter(event::Column::ItemId.is_in(item_ids.iter().copied()))
            .order_by_asc(event::Column::Id)
            .all(db)
            .await?;
        Ok(events)
    }
}
