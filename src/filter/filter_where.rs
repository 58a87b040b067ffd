use super::schema::FieldKind;
use super::types::{FilterCondition, FilterOp, FilterValue};

/// Renders parsed conditions into a parameterised WHERE clause.
pub struct FilterWhere {
    param_values: Vec<FilterValue>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Returns an empty clause (no `WHERE`) when there are no conditions.
    pub fn generate(conditions: &[FilterCondition], starting_param_index: usize) -> (String, Vec<FilterValue>) {
        let mut filter_where = Self::new(starting_param_index);
        let parts: Vec<String> = conditions
            .iter()
            .map(|c| filter_where.build_sql_condition(c))
            .collect();
        (parts.join(" AND "), filter_where.param_values)
    }

    fn build_sql_condition(&mut self, condition: &FilterCondition) -> String {
        let quoted_column = format!("\"{}\"", condition.field.column);
        let values = condition.operand.values();
        let is_list = condition.field.kind == FieldKind::TextList;

        match (condition.operator, is_list) {
            (FilterOp::In, _) if values.is_empty() => "1=0".to_string(),
            (FilterOp::In, true) => {
                let params = self.params(values);
                format!("{} && ARRAY[{}]::text[]", quoted_column, params.join(", "))
            }
            (FilterOp::In, false) => {
                let params = self.params(values);
                format!("{} IN ({})", quoted_column, params.join(", "))
            }
            (FilterOp::Eq, true) => {
                let p = self.param(values[0].clone());
                format!("{} = ANY({})", p, quoted_column)
            }
            (op, _) => {
                let p = self.param(values[0].clone());
                format!("{} {} {}", quoted_column, op.to_sql(), p)
            }
        }
    }

    fn params(&mut self, values: &[FilterValue]) -> Vec<String> {
        values.iter().map(|v| self.param(v.clone())).collect()
    }

    fn param(&mut self, value: FilterValue) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}
