//! Category repository
//!
//! Categories form a tree. Reads embed the parent and the direct children
//! as JSON subqueries so a page of categories is one round trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::DbError;
use crate::models::{CategoryChanges, CategorySortField, NewCategory, Pagination, ParentFilter, SortOrder};

/// Category record from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_category_id: Option<Uuid>,
    pub is_active: bool,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category with its parent and direct children
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryWithRelations {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub parent: Option<Json<Category>>,
    pub children: Json<Vec<Category>>,
}

/// Category with the number of experts specialized in it
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub expert_count: i64,
}

/// List filter for categories
#[derive(Debug, Clone)]
pub struct CategoryQuery {
    pub parent: Option<ParentFilter>,
    pub active_only: bool,
    pub sort_by: CategorySortField,
    pub sort_order: SortOrder,
}

impl Default for CategoryQuery {
    fn default() -> Self {
        Self {
            parent: None,
            active_only: true,
            sort_by: CategorySortField::Name,
            sort_order: SortOrder::Asc,
        }
    }
}

/// Start a category SELECT with embedded parent and children.
fn push_select(qb: &mut QueryBuilder<'_, Postgres>, children_active_only: bool) {
    qb.push(
        "SELECT c.*, \
         (SELECT to_jsonb(p) FROM categories p WHERE p.id = c.parent_category_id) AS parent, \
         COALESCE((SELECT jsonb_agg(to_jsonb(ch) ORDER BY ch.name) FROM categories ch \
         WHERE ch.parent_category_id = c.id AND (ch.is_active OR NOT ",
    );
    qb.push_bind(children_active_only);
    qb.push(")), '[]'::jsonb) AS children FROM categories c WHERE TRUE");
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &CategoryQuery) {
    if query.active_only {
        qb.push(" AND c.is_active");
    }
    match query.parent {
        Some(ParentFilter::Root) => {
            qb.push(" AND c.parent_category_id IS NULL");
        }
        Some(ParentFilter::Id(id)) => {
            qb.push(" AND c.parent_category_id = ");
            qb.push_bind(id);
        }
        None => {}
    }
}

fn list_query(query: &CategoryQuery, page: Pagination) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("");
    push_select(&mut qb, query.active_only);
    push_filters(&mut qb, query);
    qb.push(" ORDER BY ")
        .push(query.sort_by.column())
        .push(" ")
        .push(query.sort_order.as_sql())
        .push(", c.id LIMIT ");
    qb.push_bind(page.limit());
    qb.push(" OFFSET ");
    qb.push_bind(page.offset());
    qb
}

fn count_query(query: &CategoryQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM categories c WHERE TRUE");
    push_filters(&mut qb, query);
    qb
}

/// Category repository
pub struct CategoryRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Page of categories plus the total matching count.
    pub async fn list(
        &self,
        query: &CategoryQuery,
        page: Pagination,
    ) -> Result<(Vec<CategoryWithRelations>, i64), DbError> {
        let items = list_query(query, page)
            .build_query_as::<CategoryWithRelations>()
            .fetch_all(self.pool)
            .await?;
        let (total,): (i64,) = count_query(query)
            .build_query_as()
            .fetch_one(self.pool)
            .await?;
        Ok((items, total))
    }

    /// Single category with its parent and active children.
    pub async fn get(&self, id: Uuid) -> Result<CategoryWithRelations, DbError> {
        let mut qb = QueryBuilder::new("");
        push_select(&mut qb, true);
        qb.push(" AND c.id = ");
        qb.push_bind(id);
        qb.build_query_as::<CategoryWithRelations>()
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Active top-level categories with their active children.
    pub async fn roots(&self) -> Result<Vec<CategoryWithRelations>, DbError> {
        let mut qb = QueryBuilder::new("");
        push_select(&mut qb, true);
        qb.push(" AND c.is_active AND c.parent_category_id IS NULL ORDER BY c.name");
        let rows = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(rows)
    }

    pub async fn children(
        &self,
        parent_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<CategoryWithRelations>, DbError> {
        let mut qb = QueryBuilder::new("");
        push_select(&mut qb, active_only);
        qb.push(" AND c.parent_category_id = ");
        qb.push_bind(parent_id);
        if active_only {
            qb.push(" AND c.is_active");
        }
        qb.push(" ORDER BY c.name");
        let rows = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(rows)
    }

    pub async fn create(&self, new: NewCategory) -> Result<Category, DbError> {
        if let Some(parent_id) = new.parent_category_id {
            self.ensure_exists(parent_id, "Parent category").await?;
        }

        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, parent_category_id, is_primary)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new.name.as_str())
        .bind(new.description)
        .bind(new.parent_category_id)
        .bind(new.is_primary)
        .fetch_one(self.pool)
        .await
        .map_err(|e| DbError::on_unique(e, "Category name already exists"))
    }

    /// Apply changes, refusing a parent that would close a cycle.
    pub async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Category, DbError> {
        let mut tx = self.pool.begin().await?;

        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists.0 {
            return Err(DbError::not_found("Category", id));
        }

        if let Some(parent_id) = changes.parent_category_id {
            let parent: (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                    .bind(parent_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !parent.0 {
                return Err(DbError::not_found("Parent category", parent_id));
            }

            let (is_descendant,): (bool,) = sqlx::query_as(
                r#"
                WITH RECURSIVE descendants AS (
                    SELECT id FROM categories WHERE parent_category_id = $1
                    UNION
                    SELECT c.id FROM categories c
                    JOIN descendants d ON c.parent_category_id = d.id
                )
                SELECT EXISTS(SELECT 1 FROM descendants WHERE id = $2)
                "#,
            )
            .bind(id)
            .bind(parent_id)
            .fetch_one(&mut *tx)
            .await?;
            if is_descendant {
                return Err(DbError::Invalid(
                    "Category cannot be moved under one of its own subcategories".into(),
                ));
            }
        }

        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                parent_category_id = COALESCE($4, parent_category_id),
                is_active = COALESCE($5, is_active),
                is_primary = COALESCE($6, is_primary),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name.map(|n| n.into_string()))
        .bind(changes.description)
        .bind(changes.parent_category_id)
        .bind(changes.is_active)
        .bind(changes.is_primary)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::on_unique(e, "Category name already exists"))?;

        tx.commit().await?;
        Ok(category)
    }

    /// Delete a leaf category nobody is specialized in.
    pub async fn delete(&self, id: Uuid) -> Result<Category, DbError> {
        let mut tx = self.pool.begin().await?;

        let (exists, has_children, has_specializations): (bool, bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM categories WHERE id = $1),
                EXISTS(SELECT 1 FROM categories WHERE parent_category_id = $1),
                EXISTS(SELECT 1 FROM specializations WHERE category_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if !exists {
            return Err(DbError::not_found("Category", id));
        }
        if has_children {
            return Err(DbError::Conflict(
                "Cannot delete category with subcategories".into(),
            ));
        }
        if has_specializations {
            return Err(DbError::Conflict(
                "Cannot delete category with active specializations".into(),
            ));
        }

        let deleted = sqlx::query_as::<_, Category>("DELETE FROM categories WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted)
    }

    /// Active categories with the number of experts in each.
    pub async fn with_expert_count(&self) -> Result<Vec<CategoryWithCount>, DbError> {
        let rows = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.*, COUNT(DISTINCT s.expert_id) AS expert_count
            FROM categories c
            LEFT JOIN specializations s ON s.category_id = c.id
            WHERE c.is_active
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn ensure_exists(&self, id: Uuid, resource: &'static str) -> Result<(), DbError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        if !exists {
            return Err(DbError::not_found(resource, id));
        }
        Ok(())
    }
}
