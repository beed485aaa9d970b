//! Specialization repository
//!
//! A specialization links one expert to one category. Each expert has at
//! most one primary specialization; promoting one demotes the others in
//! the same transaction, and a partial unique index backs the rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Category, DbError};
use crate::models::{Pagination, VerificationStatus};

const DETAIL_SELECT: &str = r#"
    SELECT s.*,
        to_jsonb(c) || jsonb_build_object(
            'parent', (SELECT to_jsonb(p) FROM categories p WHERE p.id = c.parent_category_id)
        ) AS category,
        jsonb_build_object(
            'id', e.id, 'user_id', e.user_id,
            'first_name', e.first_name, 'last_name', e.last_name,
            'average_rating', e.average_rating::float8,
            'verification_status', e.verification_status,
            'user_name', u.name, 'user_image', u.image
        ) AS expert
    FROM specializations s
    JOIN categories c ON c.id = s.category_id
    JOIN experts e ON e.id = s.expert_id
    JOIN users u ON u.id = e.user_id
    WHERE TRUE"#;

const PRIMARY_FIRST: &str = " ORDER BY s.is_primary DESC, s.created_at ASC";

const ONE_PRIMARY_INDEX: &str = "specializations_one_primary_idx";

/// Conflict message for a unique violation on `constraint`.
fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(ONE_PRIMARY_INDEX) => "Expert already has a primary specialization",
        _ => "Specialization already exists",
    }
}

fn on_unique(err: sqlx::Error) -> DbError {
    let message = conflict_message(DbError::unique_constraint(&err));
    DbError::on_unique(err, message)
}

/// Specialization record from database
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Specialization {
    pub id: Uuid,
    pub expert_id: Uuid,
    pub category_id: Uuid,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category embedded in a specialization, with its own parent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWithParent {
    #[serde(flatten)]
    pub category: Category,
    pub parent: Option<Category>,
}

/// Expert embedded in a specialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertBrief {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub average_rating: Option<f64>,
    pub verification_status: VerificationStatus,
    pub user_name: String,
    pub user_image: Option<String>,
}

/// Specialization with its category and expert
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SpecializationDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub specialization: Specialization,
    pub category: Json<CategoryWithParent>,
    pub expert: Json<ExpertBrief>,
}

/// List filter for specializations
#[derive(Debug, Clone, Default)]
pub struct SpecializationQuery {
    pub expert_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub is_primary: Option<bool>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &SpecializationQuery) {
    if let Some(expert_id) = query.expert_id {
        qb.push(" AND s.expert_id = ");
        qb.push_bind(expert_id);
    }
    if let Some(category_id) = query.category_id {
        qb.push(" AND s.category_id = ");
        qb.push_bind(category_id);
    }
    if let Some(is_primary) = query.is_primary {
        qb.push(" AND s.is_primary = ");
        qb.push_bind(is_primary);
    }
}

/// Specialization repository
pub struct SpecializationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SpecializationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn by_expert(&self, expert_id: Uuid) -> Result<Vec<SpecializationDetail>, DbError> {
        let query = SpecializationQuery {
            expert_id: Some(expert_id),
            ..Default::default()
        };
        self.all_matching(&query).await
    }

    pub async fn by_category(&self, category_id: Uuid) -> Result<Vec<SpecializationDetail>, DbError> {
        let query = SpecializationQuery {
            category_id: Some(category_id),
            ..Default::default()
        };
        self.all_matching(&query).await
    }

    async fn all_matching(&self, query: &SpecializationQuery) -> Result<Vec<SpecializationDetail>, DbError> {
        let mut qb = QueryBuilder::new(DETAIL_SELECT);
        push_filters(&mut qb, query);
        qb.push(PRIMARY_FIRST);
        let rows = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(rows)
    }

    pub async fn list(
        &self,
        query: &SpecializationQuery,
        page: Pagination,
    ) -> Result<(Vec<SpecializationDetail>, i64), DbError> {
        let items = page_query(query, page)
            .build_query_as()
            .fetch_all(self.pool)
            .await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM specializations s WHERE TRUE");
        push_filters(&mut count, query);
        let (total,): (i64,) = count.build_query_as().fetch_one(self.pool).await?;

        Ok((items, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<SpecializationDetail, DbError> {
        let mut qb = QueryBuilder::new(DETAIL_SELECT);
        qb.push(" AND s.id = ");
        qb.push_bind(id);
        qb.build_query_as()
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Specialization", id))
    }

    /// The expert's primary specialization, if one is set.
    pub async fn primary_for_expert(&self, expert_id: Uuid) -> Result<Option<SpecializationDetail>, DbError> {
        let mut qb = QueryBuilder::new(DETAIL_SELECT);
        qb.push(" AND s.is_primary AND s.expert_id = ");
        qb.push_bind(expert_id);
        let row = qb.build_query_as().fetch_optional(self.pool).await?;
        Ok(row)
    }

    /// Owning user of the expert behind specialization `id`.
    pub async fn owner_of(&self, id: Uuid) -> Result<Uuid, DbError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT e.user_id FROM specializations s JOIN experts e ON e.id = s.expert_id WHERE s.id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.map(|(user_id,)| user_id)
            .ok_or_else(|| DbError::not_found("Specialization", id))
    }

    pub async fn create(
        &self,
        expert_id: Uuid,
        category_id: Uuid,
        is_primary: bool,
    ) -> Result<Specialization, DbError> {
        let mut tx = self.pool.begin().await?;

        let (expert_exists, category_active): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM experts WHERE id = $1),
                EXISTS(SELECT 1 FROM categories WHERE id = $2 AND is_active)
            "#,
        )
        .bind(expert_id)
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;
        if !expert_exists {
            return Err(DbError::not_found("Expert", expert_id));
        }
        if !category_active {
            return Err(DbError::not_found("Category", category_id));
        }

        if is_primary {
            clear_primary(&mut tx, expert_id, None).await?;
        }

        let created = sqlx::query_as::<_, Specialization>(
            r#"
            INSERT INTO specializations (expert_id, category_id, is_primary)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(expert_id)
        .bind(category_id)
        .bind(is_primary)
        .fetch_one(&mut *tx)
        .await
        .map_err(on_unique)?;

        tx.commit().await?;
        tracing::debug!(specialization = %created.id, expert = %expert_id, "specialization created");
        Ok(created)
    }

    /// Set or clear the primary flag. Setting it demotes the expert's
    /// other specializations.
    pub async fn update(&self, id: Uuid, is_primary: bool) -> Result<Specialization, DbError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Specialization>(
            "SELECT * FROM specializations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Specialization", id))?;

        if is_primary {
            clear_primary(&mut tx, current.expert_id, Some(id)).await?;
        }

        let updated = sqlx::query_as::<_, Specialization>(
            r#"
            UPDATE specializations SET is_primary = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_primary)
        .fetch_one(&mut *tx)
        .await
        .map_err(on_unique)?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn set_primary(&self, id: Uuid) -> Result<Specialization, DbError> {
        self.update(id, true).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Specialization, DbError> {
        sqlx::query_as::<_, Specialization>("DELETE FROM specializations WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Specialization", id))
    }
}

/// One page of matches, primary first then oldest first.
fn page_query<'q>(query: &SpecializationQuery, page: Pagination) -> QueryBuilder<'q, Postgres> {
    let mut qb = QueryBuilder::new(DETAIL_SELECT);
    push_filters(&mut qb, query);
    qb.push(PRIMARY_FIRST);
    qb.push(", s.id LIMIT ");
    qb.push_bind(page.limit());
    qb.push(" OFFSET ");
    qb.push_bind(page.offset());
    qb
}

async fn clear_primary(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    expert_id: Uuid,
    except: Option<Uuid>,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        UPDATE specializations SET is_primary = FALSE, updated_at = NOW()
        WHERE expert_id = $1 AND is_primary AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(expert_id)
    .bind(except)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_bind_in_order() {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM specializations s WHERE TRUE");
        push_filters(
            &mut qb,
            &SpecializationQuery {
                expert_id: Some(Uuid::new_v4()),
                category_id: None,
                is_primary: Some(true),
            },
        );
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM specializations s WHERE TRUE AND s.expert_id = $1 AND s.is_primary = $2"
        );
    }

    #[test]
    fn pages_list_primary_first_then_oldest() {
        let query = SpecializationQuery {
            expert_id: None,
            category_id: Some(Uuid::new_v4()),
            is_primary: None,
        };
        let qb = page_query(&query, Pagination::default());
        assert!(qb.sql().ends_with(
            "AND s.category_id = $1 ORDER BY s.is_primary DESC, s.created_at ASC, s.id LIMIT $2 OFFSET $3"
        ));
    }

    #[test]
    fn unique_conflicts_name_the_rule() {
        assert_eq!(
            conflict_message(Some("specializations_one_primary_idx")),
            "Expert already has a primary specialization"
        );
        assert_eq!(
            conflict_message(Some("specializations_expert_id_category_id_key")),
            "Specialization already exists"
        );
        assert_eq!(conflict_message(None), "Specialization already exists");
    }

    #[test]
    fn category_json_with_parent_decodes() {
        let detail: CategoryWithParent = serde_json::from_value(serde_json::json!({
            "id": Uuid::nil(),
            "name": "Cardiology",
            "description": null,
            "parent_category_id": null,
            "is_active": true,
            "is_primary": false,
            "created_at": "2025-01-01T10:00:00+00:00",
            "updated_at": "2025-01-01T10:00:00+00:00",
            "parent": null
        }))
        .unwrap();
        assert_eq!(detail.category.name, "Cardiology");
        assert!(detail.parent.is_none());
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires database"]
    async fn one_primary_per_expert(pool: PgPool) {
        use crate::db::{CategoryRepo, ExpertRepo, UserRepo};
        use crate::models::{ExpertProfileInput, NewCategory, NewExpert, PhoneNumber};

        let user = UserRepo::new(&pool)
            .upsert_verified_phone(&PhoneNumber::new("9876543210").unwrap(), Some("Asha"))
            .await
            .unwrap();
        let profile = ExpertProfileInput {
            first_name: Some("Asha".into()),
            last_name: Some("Rao".into()),
            ..Default::default()
        };
        let expert = ExpertRepo::new(&pool)
            .create(NewExpert::new(user.id, profile).unwrap())
            .await
            .unwrap();
        let categories = CategoryRepo::new(&pool);
        let a = categories
            .create(NewCategory::new("Cardiology", None, None, false).unwrap())
            .await
            .unwrap();
        let b = categories
            .create(NewCategory::new("Neurology", None, None, false).unwrap())
            .await
            .unwrap();

        let repo = SpecializationRepo::new(&pool);
        let first = repo.create(expert.id, a.id, true).await.unwrap();
        let second = repo.create(expert.id, b.id, true).await.unwrap();

        let listed = repo.by_expert(expert.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].specialization.id, second.id);
        assert!(!listed[1].specialization.is_primary);

        repo.set_primary(first.id).await.unwrap();
        let primary = repo.primary_for_expert(expert.id).await.unwrap().unwrap();
        assert_eq!(primary.specialization.id, first.id);
        assert_eq!(primary.expert.0.user_name, "Asha");

        let duplicate = repo.create(expert.id, a.id, false).await;
        assert!(matches!(duplicate, Err(DbError::Conflict(_))));
        assert_eq!(repo.owner_of(first.id).await.unwrap(), user.id);
    }
}
