use crate::models::{Link, LinkChanges, LinkId, NewLink, Profile};
use crate::storage::trait_def::unix_now;
use crate::storage::{Storage, StorageError, StorageResult};
use crate::validation::ProfileDraft;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id BIGSERIAL PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                display_order BIGINT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_owner ON links(owner_id, display_order)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                owner_id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                bio TEXT NOT NULL DEFAULT '',
                avatar_url TEXT,
                theme TEXT NOT NULL DEFAULT 'light',
                updated_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn list_links(&self, owner_id: &str) -> StorageResult<Vec<Link>> {
        let links = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, owner_id, title, url, display_order, is_active, created_at
            FROM links
            WHERE owner_id = $1
            ORDER BY display_order ASC NULLS LAST, id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn list_active_links(&self, owner_id: &str) -> StorageResult<Vec<Link>> {
        let links = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, owner_id, title, url, display_order, is_active, created_at
            FROM links
            WHERE owner_id = $1 AND is_active
            ORDER BY display_order ASC NULLS LAST, id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn create_link(&self, owner_id: &str, link: &NewLink) -> StorageResult<Link> {
        let created_at = unix_now()?;

        let link = sqlx::query_as::<_, Link>(
            r#"
            INSERT INTO links (owner_id, title, url, display_order, is_active, created_at)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            RETURNING id, owner_id, title, url, display_order, is_active, created_at
            "#,
        )
        .bind(owner_id)
        .bind(&link.title)
        .bind(&link.url)
        .bind(link.display_order)
        .bind(created_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn update_link(
        &self,
        owner_id: &str,
        id: LinkId,
        changes: &LinkChanges,
    ) -> StorageResult<Link> {
        let link = sqlx::query_as::<_, Link>(
            r#"
            UPDATE links
            SET title = COALESCE($1, title),
                url = COALESCE($2, url),
                display_order = COALESCE($3, display_order),
                is_active = COALESCE($4, is_active)
            WHERE id = $5 AND owner_id = $6
            RETURNING id, owner_id, title, url, display_order, is_active, created_at
            "#,
        )
        .bind(changes.title.as_deref())
        .bind(changes.url.as_deref())
        .bind(changes.display_order)
        .bind(changes.is_active)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        link.ok_or(StorageError::NotFound)
    }

    async fn delete_link(&self, owner_id: &str, id: LinkId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_profile(&self, owner_id: &str) -> StorageResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT owner_id, username, full_name, bio, avatar_url, theme, updated_at
            FROM profiles
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(profile)
    }

    async fn get_profile_by_username(&self, username: &str) -> StorageResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT owner_id, username, full_name, bio, avatar_url, theme, updated_at
            FROM profiles
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(profile)
    }

    async fn upsert_profile(
        &self,
        owner_id: &str,
        draft: &ProfileDraft,
    ) -> StorageResult<Profile> {
        let now = unix_now()?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (owner_id, username, full_name, bio, avatar_url, theme, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (owner_id) DO UPDATE SET
                username = EXCLUDED.username,
                full_name = EXCLUDED.full_name,
                bio = EXCLUDED.bio,
                avatar_url = COALESCE(EXCLUDED.avatar_url, profiles.avatar_url),
                theme = EXCLUDED.theme,
                updated_at = EXCLUDED.updated_at
            RETURNING owner_id, username, full_name, bio, avatar_url, theme, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(&draft.username)
        .bind(&draft.full_name)
        .bind(&draft.bio)
        .bind(draft.avatar_url.as_deref())
        .bind(draft.theme.as_str())
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(profile)
    }
}
