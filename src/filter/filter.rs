use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::schema::{FieldDef, FieldKind, ResourceSchema};
use super::types::{FilterCondition, FilterOp, FilterOperand, FilterValue, ListQuery, SqlResult};

/// Query-string keys that shape the result instead of filtering it.
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Translates raw query-string pairs into a typed [`ListQuery`] for one collection.
pub struct Filter {
    schema: &'static ResourceSchema,
    max_limit: u32,
}

impl Filter {
    pub fn new(schema: &'static ResourceSchema, max_limit: u32) -> Self {
        Self { schema, max_limit }
    }

    pub fn parse(&self, pairs: &[(String, String)]) -> Result<ListQuery, FilterError> {
        let mut conditions = Vec::new();
        let mut select = None;
        let mut sort = None;
        let mut page = None;
        let mut limit = None;

        for (key, value) in pairs {
            match key.as_str() {
                "select" => select = Some(Self::parse_select(value)),
                "sort" => sort = Some(value.as_str()),
                "page" => page = Some(Self::parse_positive(value).ok_or_else(|| FilterError::InvalidPage(value.clone()))?),
                "limit" => limit = Some(Self::parse_positive(value).ok_or_else(|| FilterError::InvalidLimit(value.clone()))?),
                _ => self.push_condition(&mut conditions, key, value)?,
            }
        }

        let order = match sort {
            Some(fields) => FilterOrder::parse(self.schema, fields)?,
            None => FilterOrder::default_order(self.schema),
        };

        let requested = limit.unwrap_or(self.schema.default_limit);
        let applied_limit = if requested > self.max_limit {
            tracing::debug!("Limit {} exceeds max {}, capping to max", requested, self.max_limit);
            self.max_limit
        } else {
            requested
        };

        Ok(ListQuery {
            conditions,
            select,
            order,
            page: page.unwrap_or(1),
            limit: applied_limit,
        })
    }

    fn parse_select(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn parse_positive(value: &str) -> Option<u32> {
        value.trim().parse::<u32>().ok().filter(|n| *n >= 1)
    }

    fn push_condition(&self, conditions: &mut Vec<FilterCondition>, key: &str, value: &str) -> Result<(), FilterError> {
        let (name, operator) = Self::split_key(key)?;
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| FilterError::UnknownField(name.to_string()))?;

        let comparable = !matches!(field.kind, FieldKind::Bool | FieldKind::TextList);
        if matches!(operator, FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte) && !comparable {
            return Err(FilterError::OperatorNotAllowed {
                field: field.name.to_string(),
                operator: key.to_string(),
            });
        }

        if operator == FilterOp::In {
            let parsed = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|v| Self::parse_value(field, v))
                .collect::<Result<Vec<_>, _>>()?;

            // Repeated `field[in]` keys accumulate into one condition
            if let Some(existing) = conditions
                .iter_mut()
                .find(|c| c.field == field && c.operator == FilterOp::In)
            {
                if let FilterOperand::List(values) = &mut existing.operand {
                    values.extend(parsed);
                }
                return Ok(());
            }
            conditions.push(FilterCondition { field, operator, operand: FilterOperand::List(parsed) });
        } else {
            let parsed = Self::parse_value(field, value.trim())?;
            conditions.push(FilterCondition { field, operator, operand: FilterOperand::Single(parsed) });
        }
        Ok(())
    }

    /// `averageCost[lte]` -> (`averageCost`, Lte); `housing` -> (`housing`, Eq).
    fn split_key(key: &str) -> Result<(&str, FilterOp), FilterError> {
        match key.find('[') {
            Some(open) if key.ends_with(']') => {
                let op_key = &key[open + 1..key.len() - 1];
                let op = FilterOp::from_key(op_key)
                    .ok_or_else(|| FilterError::UnsupportedOperator(op_key.to_string()))?;
                Ok((&key[..open], op))
            }
            Some(_) => Err(FilterError::UnknownField(key.to_string())),
            None => Ok((key, FilterOp::Eq)),
        }
    }

    fn parse_value(field: &FieldDef, raw: &str) -> Result<FilterValue, FilterError> {
        let invalid = || FilterError::InvalidValue { field: field.name.to_string(), value: raw.to_string() };
        Ok(match field.kind {
            FieldKind::Text | FieldKind::TextList => FilterValue::Text(raw.to_string()),
            FieldKind::Number => FilterValue::Number(raw.parse::<f64>().ok().filter(|n| n.is_finite()).ok_or_else(invalid)?),
            FieldKind::Integer => FilterValue::Integer(raw.parse::<i64>().map_err(|_| invalid())?),
            FieldKind::Bool => match raw {
                "true" => FilterValue::Bool(true),
                "false" => FilterValue::Bool(false),
                _ => return Err(invalid()),
            },
            FieldKind::Timestamp => FilterValue::Timestamp(parse_timestamp(raw).ok_or_else(invalid)?),
            FieldKind::Id => FilterValue::Id(Uuid::parse_str(raw).map_err(|_| invalid())?),
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

impl ListQuery {
    pub fn to_sql(&self, schema: &'static ResourceSchema) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, 0);
        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", schema.table),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            FilterOrder::generate(schema, &self.order),
            format!("LIMIT {} OFFSET {}", self.limit, self.offset()),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    pub fn to_count_sql(schema: &'static ResourceSchema, conditions: &[FilterCondition]) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(conditions, 0);
        let query = if where_clause.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", schema.table)
        } else {
            format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", schema.table, where_clause)
        };
        SqlResult { query, params }
    }
}

/// Restricts a document to the selected top-level fields. `id` is always kept.
pub fn project(doc: Map<String, Value>, select: Option<&[String]>) -> Map<String, Value> {
    let Some(fields) = select else { return doc };
    doc.into_iter()
        .filter(|(k, _)| {
            k == "id"
                || fields
                    .iter()
                    .any(|f| f == k || f.split('.').next() == Some(k.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::schema::{BOOTCAMPS, COURSES};
    use crate::filter::types::SortDirection;
    use serde_json::json;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn reserved_keys_never_become_conditions() {
        let filter = Filter::new(&BOOTCAMPS, 100);
        let q = filter
            .parse(&pairs(&[
                ("select", "name,description"),
                ("sort", "-name"),
                ("page", "2"),
                ("limit", "5"),
                ("housing", "true"),
            ]))
            .unwrap();
        assert_eq!(q.conditions.len(), 1);
        assert_eq!(q.conditions[0].field.name, "housing");
        for reserved in RESERVED_KEYS {
            assert!(q.conditions.iter().all(|c| c.field.name != reserved));
        }
        assert_eq!(q.select.as_deref(), Some(&["name".to_string(), "description".to_string()][..]));
        assert_eq!(q.order[0].sort, SortDirection::Desc);
        assert_eq!((q.page, q.limit, q.offset()), (2, 5, 5));
    }

    #[test]
    fn bracket_operators_are_typed() {
        let filter = Filter::new(&BOOTCAMPS, 100);
        let q = filter
            .parse(&pairs(&[("averageCost[lte]", "10000"), ("careers[in]", "Business,UI/UX")]))
            .unwrap();
        assert_eq!(q.conditions[0].operator, FilterOp::Lte);
        assert_eq!(q.conditions[0].operand, FilterOperand::Single(FilterValue::Integer(10000)));
        assert_eq!(q.conditions[1].operator, FilterOp::In);
        assert_eq!(q.conditions[1].operand.values().len(), 2);
    }

    #[test]
    fn repeated_in_keys_accumulate() {
        let filter = Filter::new(&COURSES, 100);
        let q = filter
            .parse(&pairs(&[("minimumSkill[in]", "beginner"), ("minimumSkill[in]", "advanced")]))
            .unwrap();
        assert_eq!(q.conditions.len(), 1);
        assert_eq!(q.conditions[0].operand.values().len(), 2);
    }

    #[test]
    fn rejects_unknown_fields_operators_and_bad_values() {
        let filter = Filter::new(&BOOTCAMPS, 100);
        assert_eq!(
            filter.parse(&pairs(&[("price", "1")])).unwrap_err(),
            FilterError::UnknownField("price".into())
        );
        assert_eq!(
            filter.parse(&pairs(&[("averageCost[ne]", "1")])).unwrap_err(),
            FilterError::UnsupportedOperator("ne".into())
        );
        assert!(matches!(
            filter.parse(&pairs(&[("averageCost[gt]", "lots")])),
            Err(FilterError::InvalidValue { .. })
        ));
        assert!(matches!(
            filter.parse(&pairs(&[("housing[gt]", "true")])),
            Err(FilterError::OperatorNotAllowed { .. })
        ));
        assert!(matches!(filter.parse(&pairs(&[("page", "0")])), Err(FilterError::InvalidPage(_))));
        assert!(matches!(filter.parse(&pairs(&[("limit", "-3")])), Err(FilterError::InvalidLimit(_))));
    }

    #[test]
    fn defaults_and_limit_cap() {
        let q = Filter::new(&BOOTCAMPS, 100).parse(&[]).unwrap();
        assert_eq!((q.page, q.limit), (1, 25));
        assert_eq!(q.order[0].field.name, "createdAt");
        assert_eq!(q.order[0].sort, SortDirection::Desc);

        let q = Filter::new(&COURSES, 50).parse(&pairs(&[("limit", "500")])).unwrap();
        assert_eq!(q.limit, 50);
        assert_eq!(Filter::new(&COURSES, 50).parse(&[]).unwrap().limit, 10);
    }

    #[test]
    fn builds_select_and_count_sql() {
        let q = Filter::new(&BOOTCAMPS, 100)
            .parse(&pairs(&[("location.state", "MA"), ("page", "3"), ("limit", "2")]))
            .unwrap();
        let sql = q.to_sql(&BOOTCAMPS);
        assert_eq!(
            sql.query,
            "SELECT * FROM \"bootcamps\" WHERE \"state\" = $1 ORDER BY \"created_at\" DESC, \"id\" ASC LIMIT 2 OFFSET 4"
        );
        assert_eq!(sql.params, vec![FilterValue::Text("MA".into())]);

        let count = ListQuery::to_count_sql(&BOOTCAMPS, &q.conditions);
        assert_eq!(count.query, "SELECT COUNT(*) AS count FROM \"bootcamps\" WHERE \"state\" = $1");
        assert_eq!(ListQuery::to_count_sql(&BOOTCAMPS, &[]).query, "SELECT COUNT(*) AS count FROM \"bootcamps\"");
    }

    #[test]
    fn projection_keeps_id_and_nested_roots() {
        let doc = json!({"id": "x", "name": "A", "description": "B", "location": {"city": "Boston"}});
        let Value::Object(map) = doc else { unreachable!() };
        let selected = vec!["name".to_string(), "location.city".to_string()];
        let out = project(map.clone(), Some(&selected));
        assert_eq!(out.len(), 3);
        assert!(out.contains_key("id") && out.contains_key("location") && !out.contains_key("description"));
        assert_eq!(project(map, None).len(), 4);
    }

    #[test]
    fn parses_dates() {
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("2024-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
