use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{BootcampStore, CourseStore, Page, ReviewStore, Store, StoreError, UserStore};
use crate::config::TotalCount;
use crate::database::models::{Bootcamp, BootcampRow, Course, CourseRow, Review, User, UserRow};
use crate::database::{DatabaseManager, QueryBuilder};
use crate::filter::{ListQuery, BOOTCAMPS, COURSES, REVIEWS};

const OWNER_LIMIT_INDEX: &str = "bootcamps_one_per_publisher";

/// PostgreSQL-backed store. Uniqueness and references are enforced by `sql/schema.sql`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Translates constraint violations into store errors.
fn map_write_error(err: sqlx::Error, owner: Uuid) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or_default().to_string();
        match db.code().as_deref() {
            Some("23505") if constraint == OWNER_LIMIT_INDEX => return StoreError::OwnerLimit(owner),
            Some("23505") => return StoreError::Duplicate(constraint),
            Some("23503") => return StoreError::MissingReference(constraint),
            _ => {}
        }
    }
    err.into()
}

async fn page<T, R>(
    pool: &PgPool,
    builder: QueryBuilder<R>,
    query: &ListQuery,
    total: TotalCount,
) -> Result<Page<T>, StoreError>
where
    T: Send,
    R: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin + Into<T>,
{
    let rows = builder.select_page(pool, query).await?;
    let total = builder.count(pool, query, total == TotalCount::Filtered).await?;
    Ok(Page { items: rows.into_iter().map(Into::into).collect(), total })
}

#[async_trait]
impl BootcampStore for PgStore {
    async fn list_bootcamps(&self, query: &ListQuery, total: TotalCount) -> Result<Page<Bootcamp>, StoreError> {
        page(&self.pool, QueryBuilder::<BootcampRow>::new(&BOOTCAMPS), query, total).await
    }

    async fn get_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, StoreError> {
        let row = sqlx::query_as::<_, BootcampRow>("SELECT * FROM bootcamps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn get_bootcamps(&self, ids: &[Uuid]) -> Result<Vec<Bootcamp>, StoreError> {
        let rows = sqlx::query_as::<_, BootcampRow>("SELECT * FROM bootcamps WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_bootcamp(&self, b: &Bootcamp) -> Result<(), StoreError> {
        let careers: Vec<String> = b.careers.iter().map(|c| c.as_str().to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO bootcamps (
                id, name, slug, description, website, phone, email, address,
                longitude, latitude, formatted_address, street, city, state, zipcode, country,
                careers, average_rating, average_cost, photo,
                housing, job_assistance, job_guarantee, accept_gi,
                user_id, admin_owned, created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8,
                $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20,
                $21, $22, $23, $24,
                $25, $26, $27
            )
            "#,
        )
        .bind(b.id)
        .bind(&b.name)
        .bind(&b.slug)
        .bind(&b.description)
        .bind(&b.website)
        .bind(&b.phone)
        .bind(&b.email)
        .bind(&b.address)
        .bind(b.location.longitude())
        .bind(b.location.latitude())
        .bind(&b.location.formatted_address)
        .bind(&b.location.street)
        .bind(&b.location.city)
        .bind(&b.location.state)
        .bind(&b.location.zipcode)
        .bind(&b.location.country)
        .bind(careers)
        .bind(b.average_rating)
        .bind(b.average_cost)
        .bind(&b.photo)
        .bind(b.housing)
        .bind(b.job_assistance)
        .bind(b.job_guarantee)
        .bind(b.accept_gi)
        .bind(b.user)
        .bind(b.admin_owned)
        .bind(b.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, b.user))?;
        Ok(())
    }

    async fn update_bootcamp(&self, b: &Bootcamp) -> Result<bool, StoreError> {
        let careers: Vec<String> = b.careers.iter().map(|c| c.as_str().to_string()).collect();
        let result = sqlx::query(
            r#"
            UPDATE bootcamps SET
                name = $2, slug = $3, description = $4, website = $5, phone = $6, email = $7,
                careers = $8, housing = $9, job_assistance = $10, job_guarantee = $11, accept_gi = $12
            WHERE id = $1
            "#,
        )
        .bind(b.id)
        .bind(&b.name)
        .bind(&b.slug)
        .bind(&b.description)
        .bind(&b.website)
        .bind(&b.phone)
        .bind(&b.email)
        .bind(careers)
        .bind(b.housing)
        .bind(b.job_assistance)
        .bind(b.job_guarantee)
        .bind(b.accept_gi)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, b.user))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM bootcamps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE bootcamps SET photo = $2 WHERE id = $1")
            .bind(id)
            .bind(photo)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_average_cost(&self, id: Uuid, average_cost: Option<i32>) -> Result<(), StoreError> {
        sqlx::query("UPDATE bootcamps SET average_cost = $2 WHERE id = $1")
            .bind(id)
            .bind(average_cost)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_average_rating(&self, id: Uuid, average_rating: Option<f64>) -> Result<(), StoreError> {
        sqlx::query("UPDATE bootcamps SET average_rating = $2 WHERE id = $1")
            .bind(id)
            .bind(average_rating)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn bootcamps_within(&self, longitude: f64, latitude: f64, radius: f64) -> Result<Vec<Bootcamp>, StoreError> {
        // Haversine angle in radians, same formula as geo::angular_distance
        let rows = sqlx::query_as::<_, BootcampRow>(
            r#"
            SELECT * FROM bootcamps
            WHERE 2 * asin(least(1.0, sqrt(
                power(sin(radians(latitude - $2) / 2), 2)
                + cos(radians($2)) * cos(radians(latitude)) * power(sin(radians(longitude - $1) / 2), 2)
            ))) <= $3
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(longitude)
        .bind(latitude)
        .bind(radius)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CourseStore for PgStore {
    async fn list_courses(&self, query: &ListQuery, total: TotalCount) -> Result<Page<Course>, StoreError> {
        page(&self.pool, QueryBuilder::<CourseRow>::new(&COURSES), query, total).await
    }

    async fn courses_for_bootcamps(&self, bootcamp_ids: &[Uuid]) -> Result<Vec<Course>, StoreError> {
        let rows = sqlx::query_as::<_, CourseRow>(
            "SELECT * FROM courses WHERE bootcamp_id = ANY($1) ORDER BY created_at DESC, id ASC",
        )
        .bind(bootcamp_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        let row = sqlx::query_as::<_, CourseRow>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_course(&self, c: &Course) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO courses (id, title, description, weeks, tuition, minimum_skill,
                                 scholarship_available, bootcamp_id, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(c.id)
        .bind(&c.title)
        .bind(&c.description)
        .bind(&c.weeks)
        .bind(c.tuition)
        .bind(c.minimum_skill.as_str())
        .bind(c.scholarship_available)
        .bind(c.bootcamp)
        .bind(c.user)
        .bind(c.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, c.user))?;
        Ok(())
    }

    async fn update_course(&self, c: &Course) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE courses SET title = $2, description = $3, weeks = $4, tuition = $5,
                               minimum_skill = $6, scholarship_available = $7
            WHERE id = $1
            "#,
        )
        .bind(c.id)
        .bind(&c.title)
        .bind(&c.description)
        .bind(&c.weeks)
        .bind(c.tuition)
        .bind(c.minimum_skill.as_str())
        .bind(c.scholarship_available)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, c.user))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_courses_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM courses WHERE bootcamp_id = $1")
            .bind(bootcamp_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn average_tuition(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError> {
        let avg: Option<f64> = sqlx::query_scalar("SELECT AVG(tuition)::float8 FROM courses WHERE bootcamp_id = $1")
            .bind(bootcamp_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(avg)
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn list_reviews(&self, query: &ListQuery, total: TotalCount) -> Result<Page<Review>, StoreError> {
        page(&self.pool, QueryBuilder::<Review>::new(&REVIEWS), query, total).await
    }

    async fn reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE bootcamp_id = $1 ORDER BY created_at DESC, id ASC",
        )
        .bind(bootcamp_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_review(&self, r: &Review) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, title, text, rating, bootcamp_id, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(r.id)
        .bind(&r.title)
        .bind(&r.text)
        .bind(r.rating)
        .bind(r.bootcamp)
        .bind(r.user)
        .bind(r.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, r.user))?;
        Ok(())
    }

    async fn update_review(&self, r: &Review) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE reviews SET title = $2, text = $3, rating = $4 WHERE id = $1")
            .bind(r.id)
            .bind(&r.title)
            .bind(&r.text)
            .bind(r.rating)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, r.user))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM reviews WHERE bootcamp_id = $1")
            .bind(bootcamp_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn average_rating(&self, bootcamp_id: Uuid) -> Result<Option<f64>, StoreError> {
        let avg: Option<f64> = sqlx::query_scalar("SELECT AVG(rating)::float8 FROM reviews WHERE bootcamp_id = $1")
            .bind(bootcamp_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(avg)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, u: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, password_hash,
                               reset_password_token, reset_password_expire, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(u.id)
        .bind(&u.name)
        .bind(&u.email)
        .bind(u.role.as_str())
        .bind(&u.password_hash)
        .bind(&u.reset_password_token)
        .bind(u.reset_password_expire)
        .bind(u.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, u.id))?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE reset_password_token = $1 AND reset_password_expire > now()",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_user(&self, u: &User) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET name = $2, email = $3, role = $4, password_hash = $5,
                             reset_password_token = $6, reset_password_expire = $7
            WHERE id = $1
            "#,
        )
        .bind(u.id)
        .bind(&u.name)
        .bind(&u.email)
        .bind(u.role.as_str())
        .bind(&u.password_hash)
        .bind(&u.reset_password_token)
        .bind(u.reset_password_expire)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, u.id))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        DatabaseManager::health_check(&self.pool).await?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        sqlx::query("TRUNCATE reviews, courses, bootcamps, users")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
