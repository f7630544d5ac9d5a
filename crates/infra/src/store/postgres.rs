//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` | `Unique` | Duplicate email/username/slug, second review by the same author |
//! | `23503` | `MissingReference` | Unknown category/genre id, title/review removed concurrently |
//! | Any other | `Backend` | Check violations, network errors, pool closed |
//!
//! Cascades (category detach, genre unlink, feedback removal) are `ON DELETE`
//! actions in `sql/schema.sql`.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use async_trait::async_trait;
use yamdb_auth::{NewUser, Role, User, Username};
use yamdb_core::{
    AuthorRef, Comment, CommentId, Email, NewComment, NewReference, NewReview, NewTitle,
    RatedTitle, ReferenceEntry, ReferenceId, ReferenceKind, ReleaseYear, Review, ReviewId, Score,
    Slug, Title, TitleId, UserId,
};

use super::{
    CommentStore, Constraint, Page, Pagination, ReferenceFilter, ReferenceStore, ReviewStore,
    StoreError, TitleFilter, TitleStore, UserFilter, UserStore,
};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, bio, role, is_active, \
     is_staff, is_superuser, password_hash, last_login, date_joined";

const TITLE_SELECT: &str = r#"
    SELECT
        t.id,
        t.name,
        t.year,
        t.description,
        t.category_id,
        c.name AS category_name,
        c.slug AS category_slug,
        (SELECT AVG(r.score)::float8 FROM reviews r WHERE r.title_id = t.id) AS rating
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
"#;

const TITLE_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR c.slug = $1)
      AND ($2::text IS NULL OR EXISTS (
            SELECT 1 FROM title_genres tg
            JOIN genres g ON g.id = tg.genre_id
            WHERE tg.title_id = t.id AND g.slug = $2))
      AND ($3::text IS NULL OR t.name ILIKE $3 ESCAPE '\')
      AND ($4::int IS NULL OR t.year = $4)
"#;

const REVIEW_COLUMNS: &str =
    "r.id, r.title_id, r.author_id, u.username AS author_username, r.score, r.text, r.pub_date";

const COMMENT_COLUMNS: &str =
    "c.id, c.review_id, c.author_id, u.username AS author_username, c.text, c.pub_date";

/// Postgres implementation of every store trait.
///
/// `PgPool` is reference counted, so clones share one pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes. Safe to run on every start.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_review(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews r JOIN users u ON u.id = r.author_id WHERE r.id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_review", e))?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn load_comment(&self, id: CommentId) -> Result<Option<Comment>, StoreError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON u.id = c.author_id WHERE c.id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_comment", e))?;
        row.as_ref().map(comment_from_row).transpose()
    }

    /// Attach genres to already loaded title rows, preserving their order.
    async fn hydrate_titles(&self, rows: Vec<PgRow>) -> Result<Vec<RatedTitle>, StoreError> {
        let mut titles = rows
            .iter()
            .map(rated_title_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        if titles.is_empty() {
            return Ok(titles);
        }

        let ids: Vec<i64> = titles.iter().map(|t| t.title.id.get()).collect();
        let genre_rows = sqlx::query(
            r#"
            SELECT tg.title_id, g.id, g.name, g.slug
            FROM title_genres tg
            JOIN genres g ON g.id = tg.genre_id
            WHERE tg.title_id = ANY($1)
            ORDER BY g.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_title_genres", e))?;

        for row in &genre_rows {
            let title_id: i64 = row.try_get("title_id").map_err(decode_error)?;
            let genre = reference_from_row(row)?;
            if let Some(rated) = titles.iter_mut().find(|t| t.title.id.get() == title_id) {
                rated.title.genres.push(genre);
            }
        }
        Ok(titles)
    }

    async fn load_title(&self, id: TitleId) -> Result<Option<RatedTitle>, StoreError> {
        let sql = format!("{TITLE_SELECT} WHERE t.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_title", e))?;
        match row {
            Some(row) => Ok(self.hydrate_titles(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, new), fields(username = %new.username.as_str()), err)]
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users
                (email, username, first_name, last_name, bio, role, is_staff, is_superuser, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(new.email.as_str())
            .bind(new.username.as_str())
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(&new.bio)
            .bind(new.role.as_str())
            .bind(new.is_staff)
            .bind(new.is_superuser)
            .bind(&new.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_user", e))?;
        user_from_row(&row)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_id", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_username", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self, filter: &UserFilter, page: Pagination) -> Result<Page<User>, StoreError> {
        let filter_sql = r#"
            WHERE ($1::text IS NULL OR username = $1)
              AND ($2::text IS NULL OR username ILIKE $2 ESCAPE '\')
        "#;
        let search = filter.search.as_deref().map(like_pattern);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users {filter_sql}"))
            .bind(filter.username.as_deref())
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users {filter_sql} ORDER BY id DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.username.as_deref())
            .bind(search.as_deref())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        let users = rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(users, count_to_u64(total), page))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            UPDATE users SET
                email = $2,
                username = $3,
                first_name = $4,
                last_name = $5,
                bio = $6,
                role = $7,
                is_active = $8,
                is_staff = $9,
                is_superuser = $10,
                password_hash = $11
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(user.id.get())
            .bind(user.email.as_str())
            .bind(user.username.as_str())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.bio)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(&user.password_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;
        match row {
            Some(row) => user_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self), err)]
    async fn record_login(
        &self,
        id: UserId,
        expected: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET last_login = $3 WHERE id = $1 AND last_login IS NOT DISTINCT FROM $2",
        )
        .bind(id.get())
        .bind(expected)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_login", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Categories and genres
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ReferenceStore for PostgresStore {
    #[instrument(skip(self, new), fields(kind = kind.as_str(), slug = %new.slug), err)]
    async fn create_reference(&self, kind: ReferenceKind, new: NewReference) -> Result<ReferenceEntry, StoreError> {
        let sql = format!(
            "INSERT INTO {} (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
            reference_table(kind)
        );
        let row = sqlx::query(&sql)
            .bind(&new.name)
            .bind(new.slug.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_reference", e))?;
        reference_from_row(&row)
    }

    async fn list_references(
        &self,
        kind: ReferenceKind,
        filter: &ReferenceFilter,
        page: Pagination,
    ) -> Result<Page<ReferenceEntry>, StoreError> {
        let table = reference_table(kind);
        let filter_sql = r#"
            WHERE ($1::text IS NULL OR name = $1)
              AND ($2::text IS NULL OR name ILIKE $2 ESCAPE '\')
        "#;
        let search = filter.search.as_deref().map(like_pattern);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} {filter_sql}"))
            .bind(filter.name.as_deref())
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_references", e))?;

        let sql = format!(
            "SELECT id, name, slug FROM {table} {filter_sql} ORDER BY id DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.name.as_deref())
            .bind(search.as_deref())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_references", e))?;

        let entries = rows.iter().map(reference_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(entries, count_to_u64(total), page))
    }

    async fn reference_by_slug(&self, kind: ReferenceKind, slug: &str) -> Result<Option<ReferenceEntry>, StoreError> {
        let sql = format!("SELECT id, name, slug FROM {} WHERE slug = $1", reference_table(kind));
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("reference_by_slug", e))?;
        row.as_ref().map(reference_from_row).transpose()
    }

    #[instrument(skip(self), fields(kind = kind.as_str()), err)]
    async fn delete_reference(&self, kind: ReferenceKind, slug: &str) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE slug = $1", reference_table(kind));
        let result = sqlx::query(&sql)
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_reference", e))?;
        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Titles
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TitleStore for PostgresStore {
    #[instrument(skip(self, new), fields(name = %new.name), err)]
    async fn create_title(&self, new: NewTitle) -> Result<Title, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO titles (name, year, description, category_id) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&new.name)
        .bind(year_to_i16(new.year))
        .bind(&new.description)
        .bind(new.category.map(|c| c.get()))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_title", e))?;

        link_genres(&mut tx, id, &new).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;

        self.load_title(TitleId::new(id))
            .await?
            .map(|rated| rated.title)
            .ok_or(StoreError::NotFound)
    }

    async fn title_by_id(&self, id: TitleId) -> Result<Option<RatedTitle>, StoreError> {
        self.load_title(id).await
    }

    async fn list_titles(&self, filter: &TitleFilter, page: Pagination) -> Result<Page<RatedTitle>, StoreError> {
        let name = filter.name.as_deref().map(like_pattern);
        // Out-of-range years cannot match any stored row.
        let year = filter.year.map(|y| i32::try_from(y).unwrap_or(-1));

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM titles t LEFT JOIN categories c ON c.id = t.category_id {TITLE_FILTER}"
        ))
        .bind(filter.category.as_deref())
        .bind(filter.genre.as_deref())
        .bind(name.as_deref())
        .bind(year)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_titles", e))?;

        let sql = format!("{TITLE_SELECT} {TITLE_FILTER} ORDER BY t.name, t.id LIMIT $5 OFFSET $6");
        let rows = sqlx::query(&sql)
            .bind(filter.category.as_deref())
            .bind(filter.genre.as_deref())
            .bind(name.as_deref())
            .bind(year)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_titles", e))?;

        let titles = self.hydrate_titles(rows).await?;
        Ok(Page::new(titles, count_to_u64(total), page))
    }

    #[instrument(skip(self, new), fields(title_id = %id), err)]
    async fn replace_title(&self, id: TitleId, new: NewTitle) -> Result<Title, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let updated = sqlx::query(
            "UPDATE titles SET name = $2, year = $3, description = $4, category_id = $5 WHERE id = $1",
        )
        .bind(id.get())
        .bind(&new.name)
        .bind(year_to_i16(new.year))
        .bind(&new.description)
        .bind(new.category.map(|c| c.get()))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_title", e))?;
        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("unlink_genres", e))?;
        link_genres(&mut tx, id.get(), &new).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;

        self.load_title(id)
            .await?
            .map(|rated| rated.title)
            .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn delete_title(&self, id: TitleId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_title", e))?;
        Ok(result.rows_affected() > 0)
    }
}

async fn link_genres(tx: &mut Transaction<'_, Postgres>, title_id: i64, new: &NewTitle) -> Result<(), StoreError> {
    let genres: Vec<i64> = new.unique_genres().iter().map(|g| g.get()).collect();
    if genres.is_empty() {
        return Ok(());
    }
    sqlx::query("INSERT INTO title_genres (title_id, genre_id) SELECT $1, UNNEST($2::bigint[])")
        .bind(title_id)
        .bind(&genres)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("link_genres", e))?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Reviews
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ReviewStore for PostgresStore {
    #[instrument(
        skip(self, new),
        fields(title_id = %new.title_id, author_id = %new.author_id),
        err
    )]
    async fn create_review(&self, new: NewReview) -> Result<Review, StoreError> {
        let sql = format!(
            r#"
            WITH r AS (
                INSERT INTO reviews (title_id, author_id, score, text, pub_date)
                VALUES ($1, $2, $3, $4, NOW())
                RETURNING *
            )
            SELECT {REVIEW_COLUMNS} FROM r JOIN users u ON u.id = r.author_id
            "#
        );
        let row = sqlx::query(&sql)
            .bind(new.title_id.get())
            .bind(new.author_id.get())
            .bind(i16::from(new.score.get()))
            .bind(new.text.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_review", e))?;
        review_from_row(&row)
    }

    async fn review_in_title(&self, title_id: TitleId, review_id: ReviewId) -> Result<Option<Review>, StoreError> {
        Ok(self
            .load_review(review_id)
            .await?
            .filter(|review| review.title_id == title_id))
    }

    async fn review_by_author(&self, title_id: TitleId, author_id: UserId) -> Result<Option<Review>, StoreError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews r JOIN users u ON u.id = r.author_id \
             WHERE r.title_id = $1 AND r.author_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(title_id.get())
            .bind(author_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("review_by_author", e))?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn list_reviews(&self, title_id: TitleId, page: Pagination) -> Result<Page<Review>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
            .bind(title_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_reviews", e))?;

        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews r JOIN users u ON u.id = r.author_id \
             WHERE r.title_id = $1 ORDER BY r.pub_date DESC, r.id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(title_id.get())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_reviews", e))?;

        let reviews = rows.iter().map(review_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(reviews, count_to_u64(total), page))
    }

    #[instrument(skip(self, text), err)]
    async fn update_review(&self, id: ReviewId, score: Score, text: Option<String>) -> Result<Review, StoreError> {
        let result = sqlx::query("UPDATE reviews SET score = $2, text = $3 WHERE id = $1")
            .bind(id.get())
            .bind(i16::from(score.get()))
            .bind(text.as_deref())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_review", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.load_review(id).await?.ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn delete_review(&self, id: ReviewId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_review", e))?;
        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Comments
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl CommentStore for PostgresStore {
    #[instrument(skip(self, new), fields(review_id = %new.review_id, author_id = %new.author_id), err)]
    async fn create_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        let sql = format!(
            r#"
            WITH c AS (
                INSERT INTO comments (review_id, author_id, text, pub_date)
                VALUES ($1, $2, $3, NOW())
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS} FROM c JOIN users u ON u.id = c.author_id
            "#
        );
        let row = sqlx::query(&sql)
            .bind(new.review_id.get())
            .bind(new.author_id.get())
            .bind(&new.text)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_comment", e))?;
        comment_from_row(&row)
    }

    async fn comment_in_review(&self, review_id: ReviewId, comment_id: CommentId) -> Result<Option<Comment>, StoreError> {
        Ok(self
            .load_comment(comment_id)
            .await?
            .filter(|comment| comment.review_id == Some(review_id)))
    }

    async fn list_comments(&self, review_id: ReviewId, page: Pagination) -> Result<Page<Comment>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = $1")
            .bind(review_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_comments", e))?;

        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.review_id = $1 ORDER BY c.pub_date DESC, c.id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(review_id.get())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_comments", e))?;

        let comments = rows.iter().map(comment_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(comments, count_to_u64(total), page))
    }

    #[instrument(skip(self, text), err)]
    async fn update_comment(&self, id: CommentId, text: String) -> Result<Comment, StoreError> {
        let result = sqlx::query("UPDATE comments SET text = $2 WHERE id = $1")
            .bind(id.get())
            .bind(&text)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_comment", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.load_comment(id).await?.ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn delete_comment(&self, id: CommentId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_comment", e))?;
        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let email: String = row.try_get("email").map_err(decode_error)?;
    let username: String = row.try_get("username").map_err(decode_error)?;
    let role: String = row.try_get("role").map_err(decode_error)?;

    Ok(User {
        id: UserId::new(row.try_get("id").map_err(decode_error)?),
        email: Email::parse(&email).map_err(corrupt_row)?,
        username: Username::parse(&username).map_err(corrupt_row)?,
        first_name: row.try_get("first_name").map_err(decode_error)?,
        last_name: row.try_get("last_name").map_err(decode_error)?,
        bio: row.try_get("bio").map_err(decode_error)?,
        role: role.parse::<Role>().map_err(corrupt_row)?,
        is_active: row.try_get("is_active").map_err(decode_error)?,
        is_staff: row.try_get("is_staff").map_err(decode_error)?,
        is_superuser: row.try_get("is_superuser").map_err(decode_error)?,
        password_hash: row.try_get("password_hash").map_err(decode_error)?,
        last_login: row.try_get::<Option<DateTime<Utc>>, _>("last_login").map_err(decode_error)?,
        date_joined: row.try_get("date_joined").map_err(decode_error)?,
    })
}

fn reference_from_row(row: &PgRow) -> Result<ReferenceEntry, StoreError> {
    let slug: String = row.try_get("slug").map_err(decode_error)?;
    Ok(ReferenceEntry {
        id: ReferenceId::new(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        slug: Slug::parse(&slug).map_err(corrupt_row)?,
    })
}

/// Decode a `TITLE_SELECT` row; genres are attached separately.
fn rated_title_from_row(row: &PgRow) -> Result<RatedTitle, StoreError> {
    let year: i16 = row.try_get("year").map_err(decode_error)?;
    let category_id: Option<i64> = row.try_get("category_id").map_err(decode_error)?;
    let category = match category_id {
        Some(id) => {
            let name: String = row.try_get("category_name").map_err(decode_error)?;
            let slug: String = row.try_get("category_slug").map_err(decode_error)?;
            Some(ReferenceEntry {
                id: ReferenceId::new(id),
                name,
                slug: Slug::parse(&slug).map_err(corrupt_row)?,
            })
        }
        None => None,
    };

    Ok(RatedTitle {
        title: Title {
            id: TitleId::new(row.try_get("id").map_err(decode_error)?),
            name: row.try_get("name").map_err(decode_error)?,
            year: ReleaseYear::new(i64::from(year)).map_err(corrupt_row)?,
            description: row.try_get("description").map_err(decode_error)?,
            genres: Vec::new(),
            category,
        },
        rating: row.try_get("rating").map_err(decode_error)?,
    })
}

fn review_from_row(row: &PgRow) -> Result<Review, StoreError> {
    let score: i16 = row.try_get("score").map_err(decode_error)?;
    Ok(Review {
        id: ReviewId::new(row.try_get("id").map_err(decode_error)?),
        title_id: TitleId::new(row.try_get("title_id").map_err(decode_error)?),
        author: AuthorRef {
            id: UserId::new(row.try_get("author_id").map_err(decode_error)?),
            username: row.try_get("author_username").map_err(decode_error)?,
        },
        score: Score::new(i64::from(score)).map_err(corrupt_row)?,
        text: row.try_get("text").map_err(decode_error)?,
        pub_date: row.try_get("pub_date").map_err(decode_error)?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, StoreError> {
    let review_id: Option<i64> = row.try_get("review_id").map_err(decode_error)?;
    Ok(Comment {
        id: CommentId::new(row.try_get("id").map_err(decode_error)?),
        review_id: review_id.map(ReviewId::new),
        author: AuthorRef {
            id: UserId::new(row.try_get("author_id").map_err(decode_error)?),
            username: row.try_get("author_username").map_err(decode_error)?,
        },
        text: row.try_get("text").map_err(decode_error)?,
        pub_date: row.try_get("pub_date").map_err(decode_error)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn reference_table(kind: ReferenceKind) -> &'static str {
    match kind {
        ReferenceKind::Category => "categories",
        ReferenceKind::Genre => "genres",
    }
}

fn year_to_i16(year: ReleaseYear) -> i16 {
    // ReleaseYear is bounded to 0..=32767.
    i16::try_from(year.get()).unwrap_or(i16::MAX)
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

/// Case-insensitive substring pattern for `ILIKE ... ESCAPE '\'`.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row: {err}"))
}

fn corrupt_row(err: yamdb_core::DomainError) -> StoreError {
    StoreError::Backend(format!("stored row violates domain rules: {err}"))
}

fn constraint_from_name(name: &str) -> Option<Constraint> {
    match name {
        "users_email_key" => Some(Constraint::UserEmail),
        "users_username_key" => Some(Constraint::UserUsername),
        "categories_slug_key" | "genres_slug_key" => Some(Constraint::ReferenceSlug),
        "reviews_author_title_key" => Some(Constraint::ReviewAuthorTitle),
        _ => None,
    }
}

fn missing_reference_from_name(name: &str) -> &'static str {
    match name {
        "titles_category_id_fkey" => "category",
        "title_genres_genre_id_fkey" => "genre",
        "title_genres_title_id_fkey" | "reviews_title_id_fkey" => "title",
        "comments_review_id_fkey" => "review",
        "reviews_author_id_fkey" | "comments_author_id_fkey" => "author",
        _ => "row",
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some("23505") => match constraint_from_name(&constraint) {
                    Some(c) => StoreError::Unique(c),
                    None => StoreError::Backend(format!(
                        "unexpected unique violation in {operation}: {}",
                        db_err.message()
                    )),
                },
                Some("23503") => StoreError::MissingReference(missing_reference_from_name(&constraint)),
                _ => StoreError::Backend(format!("database error in {operation}: {}", db_err.message())),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("{operation} failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("dr"), "%dr%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn unique_constraints_map_by_name() {
        assert_eq!(constraint_from_name("users_email_key"), Some(Constraint::UserEmail));
        assert_eq!(constraint_from_name("genres_slug_key"), Some(Constraint::ReferenceSlug));
        assert_eq!(
            constraint_from_name("reviews_author_title_key"),
            Some(Constraint::ReviewAuthorTitle)
        );
        assert_eq!(constraint_from_name("titles_pkey"), None);
    }

    #[test]
    fn foreign_keys_name_the_missing_side() {
        assert_eq!(missing_reference_from_name("titles_category_id_fkey"), "category");
        assert_eq!(missing_reference_from_name("title_genres_genre_id_fkey"), "genre");
        assert_eq!(missing_reference_from_name("comments_review_id_fkey"), "review");
    }

    #[test]
    fn schema_declares_every_named_constraint() {
        for name in [
            "users_email_key",
            "users_username_key",
            "categories_slug_key",
            "genres_slug_key",
            "reviews_author_title_key",
            "titles_category_id_fkey",
            "title_genres_genre_id_fkey",
            "comments_review_id_fkey",
        ] {
            assert!(SCHEMA.contains(name), "schema is missing {name}");
        }
    }
}
