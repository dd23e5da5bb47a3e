use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;

use super::document::Links;
use crate::errors::ServiceError;

/// Query parameters understood by every collection and resource endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceQuery {
    pub include: Option<String>,
    pub sort: Option<String>,
    #[serde(rename = "page[number]")]
    pub page_number: Option<String>,
    #[serde(rename = "page[size]")]
    pub page_size: Option<String>,
    #[serde(rename = "filter[id]")]
    pub filter_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

/// One-based page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub size: u64,
}

impl Page {
    /// Zero-based index as used by the paginator
    pub fn index(&self) -> u64 {
        self.number - 1
    }

    pub fn last(&self, record_count: u64) -> u64 {
        record_count.div_ceil(self.size).max(1)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|part| !part.is_empty())
}

fn invalid(parameter: &str, message: String) -> ServiceError {
    ServiceError::InvalidParameter {
        parameter: parameter.to_string(),
        message,
    }
}

fn parse_positive(raw: &str, parameter: &str) -> Result<u64, ServiceError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(invalid(
            parameter,
            format!("{} must be a positive integer", parameter),
        )),
    }
}

impl ResourceQuery {
    /// Relationship paths requested through `include`
    pub fn includes(&self, allowed: &[&str]) -> Result<Vec<String>, ServiceError> {
        let Some(raw) = self.include.as_deref() else {
            return Ok(Vec::new());
        };

        let mut includes = Vec::new();
        for path in split_list(raw) {
            if !allowed.contains(&path) {
                return Err(invalid(
                    "include",
                    format!("'{}' is not a valid include path", path),
                ));
            }
            if !includes.iter().any(|existing| existing == path) {
                includes.push(path.to_string());
            }
        }
        Ok(includes)
    }

    pub fn sort_fields(&self, allowed: &[&str]) -> Result<Vec<SortField>, ServiceError> {
        let Some(raw) = self.sort.as_deref() else {
            return Ok(Vec::new());
        };

        split_list(raw)
            .map(|part| {
                let (field, descending) = match part.strip_prefix('-') {
                    Some(field) => (field, true),
                    None => (part, false),
                };
                if allowed.contains(&field) {
                    Ok(SortField {
                        field: field.to_string(),
                        descending,
                    })
                } else {
                    Err(invalid(
                        "sort",
                        format!("'{}' is not a valid sort field", field),
                    ))
                }
            })
            .collect()
    }

    /// Requested page; the size is clamped to `max_size` and the row offset
    /// must fit a signed 64-bit SQL `OFFSET`
    pub fn page(&self, default_size: u64, max_size: u64) -> Result<Page, ServiceError> {
        let number = match self.page_number.as_deref() {
            Some(raw) => parse_positive(raw, "page[number]")?,
            None => 1,
        };
        let size = match self.page_size.as_deref() {
            Some(raw) => parse_positive(raw, "page[size]")?,
            None => default_size,
        };
        let page = Page {
            number,
            size: size.min(max_size).max(1),
        };

        match page.index().checked_mul(page.size) {
            Some(offset) if offset <= i64::MAX as u64 => Ok(page),
            _ => Err(invalid(
                "page[number]",
                format!("page[number] {} is out of range", number),
            )),
        }
    }

    /// Ids from `filter[id]`; ids that are not integers can never match
    pub fn id_filter(&self) -> Option<Vec<i32>> {
        self.filter_id.as_deref().map(|raw| {
            split_list(raw)
                .filter_map(|id| id.parse::<i32>().ok())
                .collect()
        })
    }

    /// Query string for `page` that keeps every other parameter of this query
    pub fn page_query(&self, page: Page) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Some(include) = &self.include {
            serializer.append_pair("include", include);
        }
        if let Some(sort) = &self.sort {
            serializer.append_pair("sort", sort);
        }
        if let Some(filter) = &self.filter_id {
            serializer.append_pair("filter[id]", filter);
        }
        serializer.append_pair("page[number]", &page.number.to_string());
        serializer.append_pair("page[size]", &page.size.to_string());
        serializer.finish()
    }

    /// `self`, `first`, `prev`, `next` and `last` links for a paged collection
    pub fn pagination_links(&self, base: &str, page: Page, record_count: u64) -> Links {
        let last = page.last(record_count);
        let href = |number: u64| format!("{}?{}", base, self.page_query(Page { number, ..page }));

        let mut links = Links::new();
        links.insert("self", href(page.number));
        links.insert("first", href(1));
        links.insert("last", href(last));
        if page.number > 1 {
            links.insert("prev", href((page.number - 1).min(last)));
        }
        if page.number < last {
            links.insert("next", href(page.number + 1));
        }
        links
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ResourceQuery
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Query::<ResourceQuery>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))
    }
}
