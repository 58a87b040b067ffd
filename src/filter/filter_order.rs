use super::error::FilterError;
use super::schema::ResourceSchema;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parses `sort=-averageCost,name`: comma-separated fields, `-` prefix for descending.
    pub fn parse(schema: &'static ResourceSchema, sort: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in sort.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let (name, sort) = match trimmed.strip_prefix('-') {
                Some(rest) => (rest, SortDirection::Desc),
                None => (trimmed.strip_prefix('+').unwrap_or(trimmed), SortDirection::Asc),
            };
            let field = schema
                .field(name)
                .ok_or_else(|| FilterError::UnknownField(name.to_string()))?;
            out.push(FilterOrderInfo { field, sort });
        }
        Ok(out)
    }

    /// Newest first.
    pub fn default_order(schema: &'static ResourceSchema) -> Vec<FilterOrderInfo> {
        vec![FilterOrderInfo { field: schema.created_at_field(), sort: SortDirection::Desc }]
    }

    /// Always ends with the id so that paging over equal sort keys is stable.
    pub fn generate(schema: &'static ResourceSchema, infos: &[FilterOrderInfo]) -> String {
        let id = schema.id_field();
        let mut parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.field.column, i.sort.to_sql()))
            .collect();
        if !infos.iter().any(|i| i.field == id) {
            parts.push(format!("\"{}\" ASC", id.column));
        }
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::schema::BOOTCAMPS;

    #[test]
    fn parses_mixed_directions() {
        let order = FilterOrder::parse(&BOOTCAMPS, "-averageCost, name").unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(order[0].field.column, "average_cost");
        assert_eq!(order[0].sort, SortDirection::Desc);
        assert_eq!(order[1].sort, SortDirection::Asc);
        assert_eq!(
            FilterOrder::generate(&BOOTCAMPS, &order),
            "ORDER BY \"average_cost\" DESC, \"name\" ASC, \"id\" ASC"
        );
    }

    #[test]
    fn rejects_unknown_sort_field() {
        let err = FilterOrder::parse(&BOOTCAMPS, "-price").unwrap_err();
        assert_eq!(err, FilterError::UnknownField("price".to_string()));
    }

    #[test]
    fn default_is_newest_first() {
        let sql = FilterOrder::generate(&BOOTCAMPS, &FilterOrder::default_order(&BOOTCAMPS));
        assert_eq!(sql, "ORDER BY \"created_at\" DESC, \"id\" ASC");
    }
}
