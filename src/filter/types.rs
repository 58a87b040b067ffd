use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::schema::FieldDef;

/// Comparison operators accepted in `field[op]=value` query keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "in" => FilterOp::In,
            _ => return None,
        })
    }

    pub fn to_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "IN",
        }
    }
}

/// A filter value already coerced to the field's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Id(Uuid),
}

impl FilterValue {
    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::Text(s) => Value::String(s.clone()),
            FilterValue::Number(n) => serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            FilterValue::Integer(i) => Value::from(*i),
            FilterValue::Bool(b) => Value::Bool(*b),
            FilterValue::Timestamp(t) => Value::String(t.to_rfc3339()),
            FilterValue::Id(id) => Value::String(id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOperand {
    Single(FilterValue),
    List(Vec<FilterValue>),
}

impl FilterOperand {
    pub fn values(&self) -> &[FilterValue] {
        match self {
            FilterOperand::Single(v) => std::slice::from_ref(v),
            FilterOperand::List(vs) => vs,
        }
    }
}

/// One parsed `{field, operator, value}` entry of the filter AST.
#[derive(Debug, Clone)]
pub struct FilterCondition {
    pub field: &'static FieldDef,
    pub operator: FilterOp,
    pub operand: FilterOperand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub field: &'static FieldDef,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<FilterValue>,
}

/// Fully translated listing request.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub conditions: Vec<FilterCondition>,
    pub select: Option<Vec<String>>,
    pub order: Vec<FilterOrderInfo>,
    pub page: u32,
    pub limit: u32,
}

impl ListQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}
