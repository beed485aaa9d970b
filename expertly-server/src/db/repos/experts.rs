//! Expert repository
//!
//! Search is the heaviest query in the service: every filter is optional,
//! so the WHERE clause is assembled with `QueryBuilder` and every value is
//! a bound parameter. The same filter function feeds the COUNT query so
//! page totals always agree with the page contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::users::{UserSummary, USER_SUMMARY_JSON};
use super::DbError;
use crate::models::{
    AccountStatus, Experience, ExpertChanges, ExpertFilter, Gender, NewExpert, Pagination,
    PaymentAccount, SocialMediaLink, VerificationStatus,
};

/// Expert columns with NUMERIC values read as float8.
const EXPERT_COLUMNS: &str = "e.id, e.user_id, e.first_name, e.last_name, e.dob, e.gender, \
     e.state, e.city, e.pin_code, e.bio, e.demo_video_url, e.skills, e.languages, \
     e.social_media_links, e.experiences, e.payment_account, e.account_status, \
     e.verification_status, e.total_sessions, e.years_of_experience, \
     e.per_hour_rate::float8 AS per_hour_rate, e.average_rating::float8 AS average_rating, \
     e.last_login, e.created_at, e.updated_at";

/// JSON array of specialization summaries for expert alias `e`.
const SPECIALIZATIONS_JSON: &str = "COALESCE((SELECT json_agg(json_build_object(\
     'id', s.id, 'category_id', s.category_id, 'category_name', sc.name, \
     'is_primary', s.is_primary) ORDER BY s.is_primary DESC, s.created_at) \
     FROM specializations s JOIN categories sc ON sc.id = s.category_id \
     WHERE s.expert_id = e.id), '[]'::json)";

/// Expert record from database
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Expert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<Gender>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub pin_code: Option<String>,
    pub bio: Option<String>,
    pub demo_video_url: Option<String>,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub social_media_links: Json<Vec<SocialMediaLink>>,
    pub experiences: Json<Vec<Experience>>,
    /// Never part of an API response
    #[serde(skip_serializing)]
    pub payment_account: Option<Json<PaymentAccount>>,
    pub account_status: AccountStatus,
    pub verification_status: VerificationStatus,
    pub total_sessions: i32,
    pub years_of_experience: Option<i32>,
    pub per_hour_rate: Option<f64>,
    pub average_rating: Option<f64>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Specialization as embedded in an expert listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializationSummary {
    pub id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub is_primary: bool,
}

/// Expert with user summary and specializations
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExpertWithRelations {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub expert: Expert,
    pub user: Json<UserSummary>,
    pub specializations: Json<Vec<SpecializationSummary>>,
}

/// Aggregate counts for the admin dashboard
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExpertStatistics {
    pub total: i64,
    pub verified: i64,
    pub pending: i64,
    pub rejected: i64,
    pub active: i64,
    pub inactive: i64,
}

/// Escape LIKE metacharacters and wrap for substring matching.
fn contains_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Append WHERE conditions for `filter` to a query over `experts e`.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ExpertFilter) {
    if let Some(category_id) = filter.category_id {
        qb.push(" AND EXISTS (SELECT 1 FROM specializations fs WHERE fs.expert_id = e.id AND fs.category_id = ");
        qb.push_bind(category_id);
        qb.push(")");
    }
    if let Some(keyword) = filter.search_keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        let pattern = contains_pattern(keyword);
        qb.push(" AND (e.first_name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR e.last_name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR e.bio ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(status) = filter.account_status {
        qb.push(" AND e.account_status = ");
        qb.push_bind(status);
    }
    if let Some(status) = filter.verification_status {
        qb.push(" AND e.verification_status = ");
        qb.push_bind(status);
    }
    if let Some(city) = filter.city.as_deref().filter(|c| !c.trim().is_empty()) {
        qb.push(" AND e.city ILIKE ");
        qb.push_bind(contains_pattern(city.trim()));
    }
    if let Some(state) = filter.state.as_deref().filter(|s| !s.trim().is_empty()) {
        qb.push(" AND e.state ILIKE ");
        qb.push_bind(contains_pattern(state.trim()));
    }
    if let Some(min) = filter.min_rating {
        qb.push(" AND e.average_rating >= ");
        qb.push_bind(min);
        qb.push("::numeric");
    }
    if let Some(max) = filter.max_rating {
        qb.push(" AND e.average_rating <= ");
        qb.push_bind(max);
        qb.push("::numeric");
    }
    if let Some(min) = filter.min_rate {
        qb.push(" AND e.per_hour_rate >= ");
        qb.push_bind(min);
        qb.push("::numeric");
    }
    if let Some(max) = filter.max_rate {
        qb.push(" AND e.per_hour_rate <= ");
        qb.push_bind(max);
        qb.push("::numeric");
    }
    if !filter.skills.is_empty() {
        qb.push(" AND e.skills && ");
        qb.push_bind(filter.skills.clone());
        qb.push("::text[]");
    }
    if !filter.languages.is_empty() {
        let languages: Vec<String> = filter.languages.iter().map(|l| l.as_str().to_owned()).collect();
        qb.push(" AND e.languages && ");
        qb.push_bind(languages);
        qb.push("::text[]");
    }
    if let Some(years) = filter.min_years_of_experience {
        qb.push(" AND e.years_of_experience >= ");
        qb.push_bind(years);
    }
}

fn search_query(filter: &ExpertFilter, page: Pagination) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(EXPERT_COLUMNS)
        .push(", ")
        .push(USER_SUMMARY_JSON)
        .push(" AS \"user\", ")
        .push(SPECIALIZATIONS_JSON)
        .push(" AS specializations FROM experts e JOIN users u ON u.id = e.user_id WHERE TRUE");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY ")
        .push(filter.sort_by.column())
        .push(" ")
        .push(filter.order().as_sql())
        .push(" NULLS LAST, e.id LIMIT ");
    qb.push_bind(page.limit());
    qb.push(" OFFSET ");
    qb.push_bind(page.offset());
    qb
}

fn count_query(filter: &ExpertFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM experts e WHERE TRUE");
    push_filters(&mut qb, filter);
    qb
}

/// Single-profile select joined with relations, keyed on `column = $1`.
fn with_relations_by(column: &str) -> String {
    format!(
        "SELECT {EXPERT_COLUMNS}, {USER_SUMMARY_JSON} AS \"user\", \
         {SPECIALIZATIONS_JSON} AS specializations \
         FROM experts e JOIN users u ON u.id = e.user_id WHERE {column} = $1"
    )
}

/// Expert repository
pub struct ExpertRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ExpertRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, sorted page of experts plus the total matching count.
    pub async fn search(
        &self,
        filter: &ExpertFilter,
        page: Pagination,
    ) -> Result<(Vec<ExpertWithRelations>, i64), DbError> {
        let items = search_query(filter, page)
            .build_query_as::<ExpertWithRelations>()
            .fetch_all(self.pool)
            .await?;
        let (total,): (i64,) = count_query(filter)
            .build_query_as()
            .fetch_one(self.pool)
            .await?;
        tracing::debug!(total, returned = items.len(), "expert search");
        Ok((items, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<Expert, DbError> {
        sqlx::query_as::<_, Expert>(&format!("SELECT {EXPERT_COLUMNS} FROM experts e WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Expert", id))
    }

    /// Profile by id with its user summary and specializations.
    pub async fn get_with_user(&self, id: Uuid) -> Result<ExpertWithRelations, DbError> {
        sqlx::query_as::<_, ExpertWithRelations>(&with_relations_by("e.id"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Expert", id))
    }

    pub async fn get_by_user(&self, user_id: Uuid) -> Result<ExpertWithRelations, DbError> {
        sqlx::query_as::<_, ExpertWithRelations>(&with_relations_by("e.user_id"))
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Expert", user_id))
    }

    /// Insert a new profile. Status columns take their defaults
    /// (active, pending).
    pub async fn create(&self, new: NewExpert) -> Result<Expert, DbError> {
        let p = new.profile;
        let languages = p.language_labels();
        let sql = format!(
            r#"
            WITH e AS (
                INSERT INTO experts (
                    user_id, first_name, last_name, dob, gender, state, city, pin_code,
                    bio, demo_video_url, skills, languages, social_media_links,
                    experiences, payment_account, per_hour_rate, years_of_experience
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    COALESCE($11, '{{}}'::text[]), COALESCE($12, '{{}}'::text[]),
                    COALESCE($13, '[]'::jsonb), COALESCE($14, '[]'::jsonb),
                    $15, $16::numeric, $17
                )
                RETURNING *
            )
            SELECT {EXPERT_COLUMNS} FROM e
            "#
        );
        sqlx::query_as::<_, Expert>(&sql)
            .bind(new.user_id)
            .bind(p.first_name)
            .bind(p.last_name)
            .bind(p.dob)
            .bind(p.gender)
            .bind(p.state)
            .bind(p.city)
            .bind(p.pin_code)
            .bind(p.bio)
            .bind(p.demo_video_url)
            .bind(p.skills)
            .bind(languages)
            .bind(p.social_media_links.map(Json))
            .bind(p.experiences.map(Json))
            .bind(p.payment_account.map(Json))
            .bind(p.per_hour_rate)
            .bind(p.years_of_experience)
            .fetch_one(self.pool)
            .await
            .map_err(|e| DbError::on_unique(e, "Expert profile already exists for this user"))
    }

    /// Apply a partial update; absent fields keep their stored values.
    pub async fn update(&self, id: Uuid, changes: ExpertChanges) -> Result<Expert, DbError> {
        let p = changes.profile;
        let languages = p.language_labels();
        let sql = format!(
            r#"
            WITH e AS (
                UPDATE experts SET
                    first_name = COALESCE($2, first_name),
                    last_name = COALESCE($3, last_name),
                    dob = COALESCE($4, dob),
                    gender = COALESCE($5, gender),
                    state = COALESCE($6, state),
                    city = COALESCE($7, city),
                    pin_code = COALESCE($8, pin_code),
                    bio = COALESCE($9, bio),
                    demo_video_url = COALESCE($10, demo_video_url),
                    skills = COALESCE($11, skills),
                    languages = COALESCE($12, languages),
                    social_media_links = COALESCE($13, social_media_links),
                    experiences = COALESCE($14, experiences),
                    payment_account = COALESCE($15, payment_account),
                    per_hour_rate = COALESCE($16::numeric, per_hour_rate),
                    years_of_experience = COALESCE($17, years_of_experience),
                    account_status = COALESCE($18, account_status),
                    verification_status = COALESCE($19, verification_status),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {EXPERT_COLUMNS} FROM e
            "#
        );
        sqlx::query_as::<_, Expert>(&sql)
            .bind(id)
            .bind(p.first_name)
            .bind(p.last_name)
            .bind(p.dob)
            .bind(p.gender)
            .bind(p.state)
            .bind(p.city)
            .bind(p.pin_code)
            .bind(p.bio)
            .bind(p.demo_video_url)
            .bind(p.skills)
            .bind(languages)
            .bind(p.social_media_links.map(Json))
            .bind(p.experiences.map(Json))
            .bind(p.payment_account.map(Json))
            .bind(p.per_hour_rate)
            .bind(p.years_of_experience)
            .bind(changes.account_status)
            .bind(changes.verification_status)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Expert", id))
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        account_status: Option<AccountStatus>,
        verification_status: Option<VerificationStatus>,
    ) -> Result<Expert, DbError> {
        let changes = ExpertChanges {
            account_status,
            verification_status,
            ..Default::default()
        };
        self.update(id, changes).await
    }

    pub async fn update_rating(
        &self,
        id: Uuid,
        average_rating: Option<f64>,
        total_sessions: Option<i32>,
    ) -> Result<Expert, DbError> {
        let sql = format!(
            r#"
            WITH e AS (
                UPDATE experts SET
                    average_rating = COALESCE($2::numeric, average_rating),
                    total_sessions = COALESCE($3, total_sessions),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {EXPERT_COLUMNS} FROM e
            "#
        );
        sqlx::query_as::<_, Expert>(&sql)
            .bind(id)
            .bind(average_rating)
            .bind(total_sessions)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Expert", id))
    }

    /// Delete an expert with no specializations left.
    pub async fn delete(&self, id: Uuid) -> Result<Expert, DbError> {
        let mut tx = self.pool.begin().await?;

        let (has_specializations,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM specializations WHERE expert_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if has_specializations {
            return Err(DbError::Conflict(
                "Cannot delete expert with active specializations. Remove specializations first."
                    .into(),
            ));
        }

        let sql = format!(
            "WITH e AS (DELETE FROM experts WHERE id = $1 RETURNING *) SELECT {EXPERT_COLUMNS} FROM e"
        );
        let deleted = sqlx::query_as::<_, Expert>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Expert", id))?;

        tx.commit().await?;
        Ok(deleted)
    }

    pub async fn statistics(&self) -> Result<ExpertStatistics, DbError> {
        let stats = sqlx::query_as::<_, ExpertStatistics>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE verification_status = 'verified') AS verified,
                COUNT(*) FILTER (WHERE verification_status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE verification_status = 'rejected') AS rejected,
                COUNT(*) FILTER (WHERE account_status = 'active') AS active,
                COUNT(*) - COUNT(*) FILTER (WHERE account_status = 'active') AS inactive
            FROM experts
            "#,
        )
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpertSortField, Language, SortOrder};

    #[test]
    fn unfiltered_search_sorts_newest_first() {
        let qb = search_query(&ExpertFilter::default(), Pagination::default());
        let sql = qb.sql();
        assert!(sql.contains("AS \"user\""));
        assert!(sql.ends_with("ORDER BY e.created_at DESC NULLS LAST, e.id LIMIT $1 OFFSET $2"));
        assert_eq!(count_query(&ExpertFilter::default()).sql(), "SELECT COUNT(*) FROM experts e WHERE TRUE");
    }

    #[test]
    fn every_filter_is_bound() {
        let filter = ExpertFilter {
            category_id: Some(Uuid::new_v4()),
            search_keyword: Some("cardio".into()),
            account_status: Some(AccountStatus::Active),
            verification_status: Some(VerificationStatus::Verified),
            city: Some("Pune".into()),
            state: Some("MH".into()),
            min_rating: Some(3.5),
            max_rating: Some(5.0),
            min_rate: Some(100.0),
            max_rate: Some(2000.0),
            skills: vec!["ecg".into()],
            languages: vec![Language::Hindi],
            min_years_of_experience: Some(2),
            sort_by: ExpertSortField::AverageRating,
            sort_order: Some(SortOrder::Asc),
        };
        let sql = count_query(&filter).sql().to_owned();

        assert!(sql.contains("fs.category_id = $1"));
        assert!(sql.contains("e.first_name ILIKE $2 OR e.last_name ILIKE $3 OR e.bio ILIKE $4"));
        assert!(sql.contains("e.account_status = $5"));
        assert!(sql.contains("e.verification_status = $6"));
        assert!(sql.contains("e.city ILIKE $7"));
        assert!(sql.contains("e.state ILIKE $8"));
        assert!(sql.contains("e.average_rating >= $9::numeric"));
        assert!(sql.contains("e.average_rating <= $10::numeric"));
        assert!(sql.contains("e.per_hour_rate >= $11::numeric"));
        assert!(sql.contains("e.per_hour_rate <= $12::numeric"));
        assert!(sql.contains("e.skills && $13::text[]"));
        assert!(sql.contains("e.languages && $14::text[]"));
        assert!(sql.contains("e.years_of_experience >= $15"));
        assert!(!sql.contains("cardio"));

        let page = search_query(&filter, Pagination::default());
        assert!(page.sql().contains("ORDER BY e.average_rating ASC NULLS LAST"));
        assert!(page.sql().ends_with("LIMIT $16 OFFSET $17"));
    }

    #[test]
    fn blank_keyword_adds_nothing() {
        let filter = ExpertFilter {
            search_keyword: Some("   ".into()),
            city: Some("".into()),
            ..Default::default()
        };
        assert_eq!(count_query(&filter).sql(), "SELECT COUNT(*) FROM experts e WHERE TRUE");
    }

    #[test]
    fn like_patterns_are_escaped() {
        assert_eq!(contains_pattern("ab"), "%ab%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn specialization_summary_shape() {
        let value = serde_json::to_value(SpecializationSummary {
            id: Uuid::nil(),
            category_id: Uuid::nil(),
            category_name: "Cardiology".into(),
            is_primary: true,
        })
        .unwrap();
        assert_eq!(value["category_name"], "Cardiology");
    }

    #[test]
    fn single_lookups_carry_relations() {
        for column in ["e.id", "e.user_id"] {
            let sql = with_relations_by(column);
            assert!(sql.contains("AS \"user\""));
            assert!(sql.contains("AS specializations"));
            assert!(sql.ends_with(&format!("WHERE {column} = $1")));
        }
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires database"]
    async fn create_search_and_stats(pool: PgPool) {
        use crate::db::UserRepo;
        use crate::models::{ExpertProfileInput, PhoneNumber};

        let user = UserRepo::new(&pool)
            .upsert_verified_phone(&PhoneNumber::new("9876543210").unwrap(), Some("Asha"))
            .await
            .unwrap();
        let repo = ExpertRepo::new(&pool);
        let profile = ExpertProfileInput {
            first_name: Some("Asha".into()),
            last_name: Some("Rao".into()),
            city: Some("Pune".into()),
            skills: Some(vec!["ecg".into()]),
            languages: Some(vec![Language::Hindi]),
            per_hour_rate: Some(1500.0),
            ..Default::default()
        };
        let expert = repo
            .create(NewExpert::new(user.id, profile.clone()).unwrap())
            .await
            .unwrap();
        assert_eq!(expert.verification_status, VerificationStatus::Pending);
        assert_eq!(expert.per_hour_rate, Some(1500.0));

        let by_id = repo.get_with_user(expert.id).await.unwrap();
        let by_user = repo.get_by_user(user.id).await.unwrap();
        assert_eq!(by_id.expert.id, by_user.expert.id);
        assert_eq!(by_user.user.0.id, user.id);
        assert!(by_user.specializations.0.is_empty());

        let again = repo.create(NewExpert::new(user.id, profile).unwrap()).await;
        assert!(matches!(again, Err(DbError::Conflict(_))));

        let filter = ExpertFilter {
            city: Some("pun".into()),
            skills: vec!["ecg".into(), "mri".into()],
            max_rate: Some(2000.0),
            ..Default::default()
        };
        let (found, total) = repo.search(&filter, Pagination::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].user.0.id, user.id);

        let (none, total) = repo
            .search(&filter.clone().verified_only(), Pagination::default())
            .await
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(total, 0);

        repo.update_status(expert.id, Some(AccountStatus::Inactive), Some(VerificationStatus::Verified))
            .await
            .unwrap();
        let stats = repo.statistics().await.unwrap();
        assert_eq!((stats.total, stats.verified, stats.active, stats.inactive), (1, 1, 0, 1));
    }
}
