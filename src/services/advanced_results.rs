//! Generic listing pipeline shared by every collection endpoint:
//! translate the query string, fetch one page, expand relations, project.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::models::{Bootcamp, BootcampSummary, Course, Review};
use crate::error::ApiError;
use crate::filter::{project, Collection, Filter, ListQuery};
use crate::state::AppState;
use crate::store::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

impl Pagination {
    /// `next` exists while `page * limit` is short of the total, `prev` on every page but the first.
    pub fn for_page(query: &ListQuery, total: u64) -> Self {
        let end = u64::from(query.page) * u64::from(query.limit);
        Self {
            next: (end < total).then(|| PageLink { page: query.page + 1, limit: query.limit }),
            prev: (query.offset() > 0).then(|| PageLink { page: query.page - 1, limit: query.limit }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Listing {
    pub data: Vec<Value>,
    pub pagination: Pagination,
}

pub struct AdvancedResults<'a> {
    state: &'a AppState,
    collection: Collection,
}

impl<'a> AdvancedResults<'a> {
    pub fn new(state: &'a AppState, collection: Collection) -> Self {
        Self { state, collection }
    }

    /// Runs a listing request end to end.
    pub async fn list(&self, pairs: &[(String, String)]) -> Result<Listing, ApiError> {
        let filter = Filter::new(self.collection.schema(), self.state.config.query.max_limit);
        let query = filter.parse(pairs)?;
        tracing::debug!(
            "Listing {:?}: {} conditions, page {} limit {}",
            self.collection,
            query.conditions.len(),
            query.page,
            query.limit
        );

        let total_mode = self.state.config.query.total_count;
        let store = &self.state.store;
        let select = query.select.as_deref();

        let (data, total) = match self.collection {
            Collection::Bootcamps => {
                let Page { items, total } = store.list_bootcamps(&query, total_mode).await?;
                (self.expand_bootcamps(items, select).await?, total)
            }
            Collection::Courses => {
                let Page { items, total } = store.list_courses(&query, total_mode).await?;
                let owners = self.summaries(items.iter().map(|c| c.bootcamp)).await?;
                let data = items
                    .iter()
                    .map(|c| with_summary(to_document(c)?, c.bootcamp, &owners, select))
                    .collect::<Result<Vec<_>, ApiError>>()?;
                (data, total)
            }
            Collection::Reviews => {
                let Page { items, total } = store.list_reviews(&query, total_mode).await?;
                let owners = self.summaries(items.iter().map(|r| r.bootcamp)).await?;
                let data = items
                    .iter()
                    .map(|r| with_summary(to_document(r)?, r.bootcamp, &owners, select))
                    .collect::<Result<Vec<_>, ApiError>>()?;
                (data, total)
            }
        };

        Ok(Listing { data, pagination: Pagination::for_page(&query, total) })
    }

    /// Attaches every course of each bootcamp after projection; `courses` is a virtual field.
    async fn expand_bootcamps(&self, bootcamps: Vec<Bootcamp>, select: Option<&[String]>) -> Result<Vec<Value>, ApiError> {
        let ids: Vec<Uuid> = bootcamps.iter().map(|b| b.id).collect();
        let mut by_bootcamp: HashMap<Uuid, Vec<Course>> = HashMap::new();
        for course in self.state.store.courses_for_bootcamps(&ids).await? {
            by_bootcamp.entry(course.bootcamp).or_default().push(course);
        }

        bootcamps
            .iter()
            .map(|bootcamp| -> Result<Value, ApiError> {
                let mut doc = project(to_document(bootcamp)?, select);
                let courses = by_bootcamp.remove(&bootcamp.id).unwrap_or_default();
                doc.insert("courses".to_string(), to_value(&courses)?);
                Ok(Value::Object(doc))
            })
            .collect()
    }

    async fn summaries(&self, ids: impl Iterator<Item = Uuid>) -> Result<HashMap<Uuid, BootcampSummary>, ApiError> {
        let mut ids: Vec<Uuid> = ids.collect();
        ids.sort_unstable();
        ids.dedup();
        let bootcamps = self.state.store.get_bootcamps(&ids).await?;
        Ok(bootcamps.iter().map(|b| (b.id, BootcampSummary::from(b))).collect())
    }
}

/// Replaces the bootcamp reference with `{id, name, description}` when it survived projection.
fn with_summary(
    doc: Map<String, Value>,
    bootcamp_id: Uuid,
    owners: &HashMap<Uuid, BootcampSummary>,
    select: Option<&[String]>,
) -> Result<Value, ApiError> {
    let mut doc = project(doc, select);
    if doc.contains_key("bootcamp") {
        if let Some(summary) = owners.get(&bootcamp_id) {
            doc.insert("bootcamp".to_string(), to_value(summary)?);
        }
    }
    Ok(Value::Object(doc))
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Map<String, Value>, ApiError> {
    match to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::server_error()),
    }
}

pub fn to_value<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!("Failed to serialize document: {}", e);
        ApiError::server_error()
    })
}

/// A course or review with its bootcamp reference expanded to a summary.
pub async fn expand_one<T: Serialize>(state: &AppState, record: &T, bootcamp_id: Uuid) -> Result<Value, ApiError> {
    let mut doc = to_document(record)?;
    if let Some(bootcamp) = state.store.get_bootcamp(bootcamp_id).await? {
        doc.insert("bootcamp".to_string(), to_value(&BootcampSummary::from(&bootcamp))?);
    }
    Ok(Value::Object(doc))
}

pub async fn expand_course(state: &AppState, course: &Course) -> Result<Value, ApiError> {
    expand_one(state, course, course.bootcamp).await
}

pub async fn expand_review(state: &AppState, review: &Review) -> Result<Value, ApiError> {
    expand_one(state, review, review.bootcamp).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, BOOTCAMPS};
    use serde_json::json;

    fn query(page: &str, limit: &str) -> ListQuery {
        Filter::new(&BOOTCAMPS, 100)
            .parse(&[("page".to_string(), page.to_string()), ("limit".to_string(), limit.to_string())])
            .unwrap()
    }

    #[test]
    fn first_page_has_only_next() {
        let p = Pagination::for_page(&query("1", "2"), 5);
        assert_eq!(serde_json::to_value(&p).unwrap(), json!({"next": {"page": 2, "limit": 2}}));
    }

    #[test]
    fn middle_page_has_both_links() {
        let p = Pagination::for_page(&query("2", "2"), 5);
        assert_eq!(p.next, Some(PageLink { page: 3, limit: 2 }));
        assert_eq!(p.prev, Some(PageLink { page: 1, limit: 2 }));
    }

    #[test]
    fn last_page_has_only_prev() {
        let p = Pagination::for_page(&query("3", "2"), 5);
        assert_eq!(p.next, None);
        assert_eq!(p.prev, Some(PageLink { page: 2, limit: 2 }));

        let exact = Pagination::for_page(&query("2", "2"), 4);
        assert_eq!(exact.next, None);
    }

    #[test]
    fn empty_result_has_no_links() {
        let p = Pagination::for_page(&query("1", "25"), 0);
        assert_eq!(serde_json::to_value(&p).unwrap(), json!({}));
    }
}
