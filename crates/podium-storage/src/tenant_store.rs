//! Per-tenant store registry and store handle
//!
//! Each tenant owns a physically separate SQLite file holding its players,
//! competitions and score rows. Addressing is a pure function of the numeric
//! tenant ID; no lookup table exists. Stores are opened per request and are
//! cheap to open, keeping isolation simple.

use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use podium_core::{Competition, Error, Player, PlayerScore, Result, TenantId};

use crate::db_err;

/// Tenant store path, derived purely from the numeric tenant ID.
pub fn store_path(store_root: &Path, tenant_id: TenantId) -> PathBuf {
    store_root.join(format!("{tenant_id}.db"))
}

/// Fixed schema template run against every freshly provisioned store.
const TENANT_SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE player (
        id TEXT PRIMARY KEY,
        tenant_id INTEGER NOT NULL,
        display_name TEXT NOT NULL,
        is_disqualified INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE competition (
        id TEXT PRIMARY KEY,
        tenant_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        finished_at INTEGER,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE player_score (
        id TEXT PRIMARY KEY,
        tenant_id INTEGER NOT NULL,
        player_id TEXT NOT NULL,
        competition_id TEXT NOT NULL,
        score INTEGER NOT NULL,
        row_num INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX idx_player_score_competition \
     ON player_score (tenant_id, competition_id, row_num)",
    "CREATE INDEX idx_competition_created ON competition (tenant_id, created_at)",
];

/// Opens and provisions per-tenant stores under one store root.
#[derive(Debug, Clone)]
pub struct TenantStoreRegistry {
    store_root: PathBuf,
}

impl TenantStoreRegistry {
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        Self {
            store_root: store_root.into(),
        }
    }

    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    /// Lazily connect to an existing tenant store.
    pub async fn open(&self, tenant_id: TenantId) -> Result<TenantStore> {
        let path = store_path(&self.store_root, tenant_id);
        if !path.is_file() {
            return Err(Error::TenantNotFound(tenant_id.to_string()));
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&path)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await
            .map_err(db_err)?;

        debug!(%tenant_id, "opened tenant store");
        Ok(TenantStore { tenant_id, pool })
    }

    /// Create a fresh, empty store for a new tenant and run the schema
    /// template against it. Refuses to touch an already-addressed store.
    pub async fn provision(&self, tenant_id: TenantId) -> Result<()> {
        tokio::fs::create_dir_all(&self.store_root).await?;
        let path = store_path(&self.store_root, tenant_id);
        if path.exists() {
            return Err(Error::Validation(format!(
                "tenant store already exists: {}",
                path.display()
            )));
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await
            .map_err(db_err)?;

        for statement in TENANT_SCHEMA {
            sqlx::query(statement).execute(&pool).await.map_err(db_err)?;
        }
        pool.close().await;

        info!(%tenant_id, path = %path.display(), "provisioned tenant store");
        Ok(())
    }
}

/// Handle to one tenant's isolated store.
#[derive(Clone, Debug)]
pub struct TenantStore {
    tenant_id: TenantId,
    pool: SqlitePool,
}

impl TenantStore {
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub async fn insert_player(&self, player: &Player) -> Result<()> {
        sqlx::query(
            "INSERT INTO player (id, tenant_id, display_name, is_disqualified, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&player.id)
        .bind(player.tenant_id.0)
        .bind(&player.display_name)
        .bind(player.is_disqualified)
        .bind(player.created_at)
        .bind(player.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn player(&self, id: &str) -> Result<Player> {
        sqlx::query("SELECT * FROM player WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| player_from_row(&row))
            .transpose()?
            .ok_or_else(|| Error::PlayerNotFound(id.to_string()))
    }

    pub async fn list_players(&self) -> Result<Vec<Player>> {
        let rows = sqlx::query("SELECT * FROM player WHERE tenant_id = ? ORDER BY created_at DESC")
            .bind(self.tenant_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(player_from_row).collect()
    }

    /// One-way transition; there is no way back to qualified.
    pub async fn disqualify_player(&self, id: &str, now: i64) -> Result<Player> {
        // ensure the row exists so the update cannot silently no-op
        self.player(id).await?;
        sqlx::query("UPDATE player SET is_disqualified = 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        self.player(id).await
    }

    pub async fn insert_competition(&self, competition: &Competition) -> Result<()> {
        sqlx::query(
            "INSERT INTO competition (id, tenant_id, title, finished_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&competition.id)
        .bind(competition.tenant_id.0)
        .bind(&competition.title)
        .bind(competition.finished_at)
        .bind(competition.created_at)
        .bind(competition.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn competition(&self, id: &str) -> Result<Competition> {
        sqlx::query("SELECT * FROM competition WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| competition_from_row(&row))
            .transpose()?
            .ok_or_else(|| Error::CompetitionNotFound(id.to_string()))
    }

    /// Competitions newest first (report and billing order).
    pub async fn list_competitions(&self) -> Result<Vec<Competition>> {
        let rows =
            sqlx::query("SELECT * FROM competition WHERE tenant_id = ? ORDER BY created_at DESC")
                .bind(self.tenant_id.0)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.iter().map(competition_from_row).collect()
    }

    /// Competitions in creation order (per-player score report order).
    pub async fn list_competitions_asc(&self) -> Result<Vec<Competition>> {
        let rows =
            sqlx::query("SELECT * FROM competition WHERE tenant_id = ? ORDER BY created_at ASC")
                .bind(self.tenant_id.0)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.iter().map(competition_from_row).collect()
    }

    /// Set `finished_at`. The transition is one-way: finishing an already
    /// finished competition is a validation error.
    pub async fn finish_competition(&self, id: &str, now: i64) -> Result<Competition> {
        let competition = self.competition(id).await?;
        if competition.is_finished() {
            return Err(Error::Validation(format!(
                "competition is already finished: {id}"
            )));
        }
        sqlx::query("UPDATE competition SET finished_at = ?, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        self.competition(id).await
    }

    /// Atomically replace the whole score set of one competition:
    /// delete-then-insert inside one transaction. Callers must hold the
    /// tenant lock so readers never observe the empty window.
    pub async fn replace_scores(
        &self,
        competition_id: &str,
        rows: &[PlayerScore],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM player_score WHERE tenant_id = ? AND competition_id = ?")
            .bind(self.tenant_id.0)
            .bind(competition_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for ps in rows {
            sqlx::query(
                "INSERT INTO player_score \
                 (id, tenant_id, player_id, competition_id, score, row_num, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&ps.id)
            .bind(ps.tenant_id.0)
            .bind(&ps.player_id)
            .bind(&ps.competition_id)
            .bind(ps.score)
            .bind(ps.row_num)
            .bind(ps.created_at)
            .bind(ps.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    /// All score rows for one competition, highest `row_num` first. Feeds
    /// the ranking dedup, which keeps the first row it sees per player.
    pub async fn scores_desc_by_row_num(&self, competition_id: &str) -> Result<Vec<PlayerScore>> {
        let rows = sqlx::query(
            "SELECT * FROM player_score WHERE tenant_id = ? AND competition_id = ? \
             ORDER BY row_num DESC",
        )
        .bind(self.tenant_id.0)
        .bind(competition_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(score_from_row).collect()
    }

    /// Distinct players holding at least one score row in the competition.
    pub async fn scored_player_ids(&self, competition_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT player_id FROM player_score \
             WHERE tenant_id = ? AND competition_id = ?",
        )
        .bind(self.tenant_id.0)
        .bind(competition_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|row| row.try_get("player_id").map_err(db_err))
            .collect()
    }

    /// The authoritative score row for one (player, competition) pair: the
    /// one with the maximum `row_num`, regardless of timestamps.
    pub async fn latest_score(
        &self,
        competition_id: &str,
        player_id: &str,
    ) -> Result<Option<PlayerScore>> {
        sqlx::query(
            "SELECT * FROM player_score \
             WHERE tenant_id = ? AND competition_id = ? AND player_id = ? \
             ORDER BY row_num DESC LIMIT 1",
        )
        .bind(self.tenant_id.0)
        .bind(competition_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .map(|row| score_from_row(&row))
        .transpose()
    }
}

fn player_from_row(row: &SqliteRow) -> Result<Player> {
    Ok(Player {
        id: row.try_get("id").map_err(db_err)?,
        tenant_id: TenantId(row.try_get("tenant_id").map_err(db_err)?),
        display_name: row.try_get("display_name").map_err(db_err)?,
        is_disqualified: row.try_get("is_disqualified").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn competition_from_row(row: &SqliteRow) -> Result<Competition> {
    Ok(Competition {
        id: row.try_get("id").map_err(db_err)?,
        tenant_id: TenantId(row.try_get("tenant_id").map_err(db_err)?),
        title: row.try_get("title").map_err(db_err)?,
        finished_at: row.try_get("finished_at").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn score_from_row(row: &SqliteRow) -> Result<PlayerScore> {
    Ok(PlayerScore {
        id: row.try_get("id").map_err(db_err)?,
        tenant_id: TenantId(row.try_get("tenant_id").map_err(db_err)?),
        player_id: row.try_get("player_id").map_err(db_err)?,
        competition_id: row.try_get("competition_id").map_err(db_err)?,
        score: row.try_get("score").map_err(db_err)?,
        row_num: row.try_get("row_num").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}
