//! Evaluates a translated [`ListQuery`] against serialized documents.
//!
//! Used by the in-memory store so that both backends answer the same query
//! string the same way. Ordering mirrors PostgreSQL defaults: NULLs sort
//! last ascending and first descending.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::schema::{FieldDef, FieldKind, ResourceSchema};
use super::types::{FilterCondition, FilterOp, FilterOrderInfo, FilterValue, SortDirection};

/// Looks up a dotted API path such as `location.state`.
pub fn lookup<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    if current.is_null() { None } else { Some(current) }
}

pub fn matches_all(doc: &Map<String, Value>, conditions: &[FilterCondition]) -> bool {
    conditions.iter().all(|c| matches(doc, c))
}

fn matches(doc: &Map<String, Value>, condition: &FilterCondition) -> bool {
    let Some(actual) = lookup(doc, condition.field.name) else {
        return false;
    };
    let values = condition.operand.values();

    if condition.field.kind == FieldKind::TextList {
        let items: Vec<&str> = actual
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        return values.iter().any(|v| match v {
            FilterValue::Text(t) => items.contains(&t.as_str()),
            _ => false,
        });
    }

    match condition.operator {
        FilterOp::In => values
            .iter()
            .any(|v| compare(condition.field, actual, v) == Some(Ordering::Equal)),
        op => {
            let Some(ord) = compare(condition.field, actual, &values[0]) else {
                return false;
            };
            match op {
                FilterOp::Eq => ord == Ordering::Equal,
                FilterOp::Gt => ord == Ordering::Greater,
                FilterOp::Gte => ord != Ordering::Less,
                FilterOp::Lt => ord == Ordering::Less,
                FilterOp::Lte => ord != Ordering::Greater,
                FilterOp::In => false,
            }
        }
    }
}

fn compare(field: &FieldDef, actual: &Value, expected: &FilterValue) -> Option<Ordering> {
    match (field.kind, expected) {
        (FieldKind::Text, FilterValue::Text(t)) => Some(actual.as_str()?.cmp(t.as_str())),
        (FieldKind::Number | FieldKind::Integer, FilterValue::Number(n)) => actual.as_f64()?.partial_cmp(n),
        (FieldKind::Number | FieldKind::Integer, FilterValue::Integer(i)) => actual.as_f64()?.partial_cmp(&(*i as f64)),
        (FieldKind::Bool, FilterValue::Bool(b)) => Some(actual.as_bool()?.cmp(b)),
        (FieldKind::Timestamp, FilterValue::Timestamp(t)) => Some(as_timestamp(actual)?.cmp(t)),
        (FieldKind::Id, FilterValue::Id(id)) => Some(Uuid::parse_str(actual.as_str()?).ok()?.cmp(id)),
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.as_str()?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn compare_values(field: &FieldDef, a: &Value, b: &Value) -> Ordering {
    let ord = match field.kind {
        FieldKind::Number | FieldKind::Integer => a.as_f64().partial_cmp(&b.as_f64()),
        FieldKind::Bool => a.as_bool().partial_cmp(&b.as_bool()),
        FieldKind::Timestamp => as_timestamp(a).partial_cmp(&as_timestamp(b)),
        FieldKind::Id => a
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .partial_cmp(&b.as_str().and_then(|s| Uuid::parse_str(s).ok())),
        FieldKind::Text => a.as_str().partial_cmp(&b.as_str()),
        FieldKind::TextList => Some(a.to_string().cmp(&b.to_string())),
    };
    ord.unwrap_or(Ordering::Equal)
}

/// Orders two documents by the requested keys, tie-breaking on `id`.
pub fn compare_documents(
    schema: &ResourceSchema,
    a: &Map<String, Value>,
    b: &Map<String, Value>,
    order: &[FilterOrderInfo],
) -> Ordering {
    for info in order {
        let ord = match (lookup(a, info.field.name), lookup(b, info.field.name)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => compare_values(info.field, x, y),
        };
        let ord = match info.sort {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    let id = schema.id_field();
    match (lookup(a, id.name), lookup(b, id.name)) {
        (Some(x), Some(y)) => compare_values(id, x, y),
        _ => Ordering::Equal,
    }
}

pub fn sort_documents(schema: &ResourceSchema, docs: &mut [Map<String, Value>], order: &[FilterOrderInfo]) {
    docs.sort_by(|a, b| compare_documents(schema, a, b, order));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter::Filter;
    use crate::filter::schema::BOOTCAMPS;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn camps() -> Vec<Map<String, Value>> {
        vec![
            doc(json!({"id": Uuid::from_u128(1).to_string(), "name": "Alpha", "averageCost": 9000, "housing": true,
                "careers": ["Web Development", "Business"], "location": {"state": "MA"}})),
            doc(json!({"id": Uuid::from_u128(2).to_string(), "name": "Beta", "averageCost": 12000, "housing": false,
                "careers": ["Data Science"], "location": {"state": "VT"}})),
            doc(json!({"id": Uuid::from_u128(3).to_string(), "name": "Gamma", "averageCost": null, "housing": true,
                "careers": ["UI/UX"], "location": {"state": "MA"}})),
        ]
    }

    fn run(query: &[(&str, &str)]) -> Vec<String> {
        let pairs: Vec<(String, String)> = query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let q = Filter::new(&BOOTCAMPS, 100).parse(&pairs).unwrap();
        let mut docs: Vec<_> = camps().into_iter().filter(|d| matches_all(d, &q.conditions)).collect();
        sort_documents(&BOOTCAMPS, &mut docs, &q.order);
        docs.iter().map(|d| d["name"].as_str().unwrap().to_string()).collect()
    }

    #[test]
    fn numeric_ranges_skip_nulls() {
        assert_eq!(run(&[("averageCost[lte]", "10000"), ("sort", "name")]), vec!["Alpha"]);
        assert_eq!(run(&[("averageCost[gt]", "0"), ("sort", "-averageCost")]), vec!["Beta", "Alpha"]);
    }

    #[test]
    fn careers_contain_and_overlap() {
        assert_eq!(run(&[("careers", "Business")]), vec!["Alpha"]);
        assert_eq!(run(&[("careers[in]", "UI/UX,Data Science"), ("sort", "name")]), vec!["Beta", "Gamma"]);
    }

    #[test]
    fn nested_paths_and_booleans() {
        assert_eq!(run(&[("location.state", "MA"), ("housing", "true"), ("sort", "-name")]), vec!["Gamma", "Alpha"]);
    }

    #[test]
    fn nulls_sort_last_ascending_first_descending() {
        assert_eq!(run(&[("sort", "averageCost")]), vec!["Alpha", "Beta", "Gamma"]);
        assert_eq!(run(&[("sort", "-averageCost")]), vec!["Gamma", "Beta", "Alpha"]);
    }
}
