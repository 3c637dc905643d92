//! Central directory store
//!
//! A single SQLite database shared by all tenants, accessed through a
//! bounded connection pool. It owns the tenant registry, the cross-tenant
//! visit history and the ID dispenser's counter table.

use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use tracing::debug;

use podium_core::{Error, Result, Tenant, TenantId};

use crate::config::StoreConfig;
use crate::db_err;

const CENTRAL_DB_FILE: &str = "central.db";

#[derive(Clone)]
pub struct CentralStore {
    pool: SqlitePool,
}

impl CentralStore {
    /// Open (creating if missing) the central database under the store root
    /// and initialize its schema.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        tokio::fs::create_dir_all(config.store_root()).await?;
        let db_path = config.store_root().join(CENTRAL_DB_FILE);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.central_max_connections)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&db_path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await
            .map_err(db_err)?;

        Self::initialize_schema(&pool).await?;
        debug!(path = %db_path.display(), "opened central store");
        Ok(Self { pool })
    }

    async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tenant (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visit_history (
                player_id TEXT NOT NULL,
                tenant_id INTEGER NOT NULL,
                competition_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_visit_history_tenant_competition \
             ON visit_history (tenant_id, competition_id)",
        )
        .execute(pool)
        .await
        .map_err(db_err)?;

        // Single-row counter backing the ID dispenser. REPLACE against the
        // unique stub advances the AUTOINCREMENT rowid.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS id_generator (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stub TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a tenant row. The unique name constraint surfaces as
    /// `DuplicateTenant`.
    pub async fn insert_tenant(
        &self,
        name: &str,
        display_name: &str,
        now: i64,
    ) -> Result<Tenant> {
        let res = sqlx::query(
            "INSERT INTO tenant (name, display_name, created_at, updated_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(display_name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::DuplicateTenant(name.to_string())
            }
            _ => db_err(e),
        })?;

        Ok(Tenant {
            id: TenantId(res.last_insert_rowid()),
            name: name.to_string(),
            display_name: display_name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Remove a tenant row. Used to compensate when store provisioning fails
    /// after the directory insert succeeded.
    pub async fn delete_tenant(&self, id: TenantId) -> Result<()> {
        sqlx::query("DELETE FROM tenant WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn tenant_by_id(&self, id: TenantId) -> Result<Tenant> {
        sqlx::query("SELECT id, name, display_name, created_at, updated_at FROM tenant WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| tenant_from_row(&row))
            .transpose()?
            .ok_or_else(|| Error::TenantNotFound(id.to_string()))
    }

    pub async fn tenant_by_name(&self, name: &str) -> Result<Tenant> {
        sqlx::query(
            "SELECT id, name, display_name, created_at, updated_at FROM tenant WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .map(|row| tenant_from_row(&row))
        .transpose()?
        .ok_or_else(|| Error::TenantNotFound(name.to_string()))
    }

    /// All tenants, newest ID first. Feeds the descending-ID billing cursor.
    pub async fn list_tenants_desc(&self) -> Result<Vec<Tenant>> {
        let rows = sqlx::query(
            "SELECT id, name, display_name, created_at, updated_at FROM tenant ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(tenant_from_row).collect()
    }

    /// Append one ranking-view visit for billing.
    pub async fn record_visit(
        &self,
        player_id: &str,
        tenant_id: TenantId,
        competition_id: &str,
        now: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO visit_history (player_id, tenant_id, competition_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(player_id)
        .bind(tenant_id.0)
        .bind(competition_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Earliest visit timestamp per player for one (tenant, competition)
    /// pair.
    pub async fn first_visits(
        &self,
        tenant_id: TenantId,
        competition_id: &str,
    ) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT player_id, MIN(created_at) AS min_created_at FROM visit_history \
             WHERE tenant_id = ? AND competition_id = ? GROUP BY player_id",
        )
        .bind(tenant_id.0)
        .bind(competition_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                Ok((
                    row.try_get("player_id").map_err(db_err)?,
                    row.try_get("min_created_at").map_err(db_err)?,
                ))
            })
            .collect()
    }
}

fn tenant_from_row(row: &SqliteRow) -> Result<Tenant> {
    Ok(Tenant {
        id: TenantId(row.try_get("id").map_err(db_err)?),
        name: row.try_get("name").map_err(db_err)?,
        display_name: row.try_get("display_name").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}
