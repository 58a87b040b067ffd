use sqlx::{self, postgres::PgArguments, FromRow, PgPool, Row};

use crate::database::manager::DatabaseError;
use crate::filter::types::{FilterCondition, FilterValue, ListQuery, SqlResult};
use crate::filter::ResourceSchema;

/// Runs a translated listing query against one table and maps rows to `T`.
pub struct QueryBuilder<T> {
    schema: &'static ResourceSchema,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(schema: &'static ResourceSchema) -> Self {
        Self { schema, _phantom: std::marker::PhantomData }
    }

    pub async fn select_page(&self, pool: &PgPool, query: &ListQuery) -> Result<Vec<T>, DatabaseError> {
        let sql_result = query.to_sql(self.schema);
        tracing::debug!("list query: {}", sql_result.query);
        self.fetch_all(pool, &sql_result).await
    }

    pub async fn fetch_all(&self, pool: &PgPool, sql_result: &SqlResult) -> Result<Vec<T>, DatabaseError> {
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    /// Counts either the filtered set or the whole table.
    pub async fn count(&self, pool: &PgPool, query: &ListQuery, filtered: bool) -> Result<u64, DatabaseError> {
        let conditions: &[FilterCondition] = if filtered { &query.conditions[..] } else { &[] };
        let sql_result = ListQuery::to_count_sql(self.schema, conditions);

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }
}

pub fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q FilterValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        FilterValue::Text(s) => q.bind(s.as_str()),
        FilterValue::Number(n) => q.bind(*n),
        FilterValue::Integer(i) => q.bind(*i),
        FilterValue::Bool(b) => q.bind(*b),
        FilterValue::Timestamp(t) => q.bind(*t),
        FilterValue::Id(id) => q.bind(*id),
    }
}

pub fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q FilterValue,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        FilterValue::Text(s) => q.bind(s.as_str()),
        FilterValue::Number(n) => q.bind(*n),
        FilterValue::Integer(i) => q.bind(*i),
        FilterValue::Bool(b) => q.bind(*b),
        FilterValue::Timestamp(t) => q.bind(*t),
        FilterValue::Id(id) => q.bind(*id),
    }
}
