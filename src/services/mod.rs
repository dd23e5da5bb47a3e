// Resource services
pub mod events;
pub mod items;

use sea_orm::Order;

use crate::jsonapi::{Page, SortField};

/// Collection selection shared by every list operation
#[derive(Debug, Clone)]
pub struct ListParams {
    /// Restrict to these ids (`filter[id]`)
    pub ids: Option<Vec<i32>>,
    pub sort: Vec<SortField>,
    pub page: Page,
}

/// One page of records plus the size of the whole collection
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub records: Vec<T>,
    pub record_count: u64,
}

pub(crate) fn order_of(field: &SortField) -> Order {
    if field.descending {
        Order::Desc
    } else {
        Order::Asc
    }
}
