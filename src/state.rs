use crate::{
    config::RuntimeConfiguration,
    error::{
        GetDatabaseConnectionSnafu, MigrateSnafu, MissingBindingSnafu, OpenDatabaseSnafu,
        StudentsResult,
    },
};
use snafu::{OptionExt, ResultExt};
use sqlx::{Pool, Sqlite, pool::PoolConnection, sqlite::SqlitePoolOptions};

#[derive(Clone, Debug)]
pub struct StudentsState {
    pool: Option<Pool<Sqlite>>,
    config: RuntimeConfiguration,
}

impl StudentsState {
    pub async fn new(options: SqlitePoolOptions, config: RuntimeConfiguration) -> StudentsResult<Self> {
        let Some(db_config) = config.db_config() else {
            warn!("no `DB_URL` configured, requests will be answered with a missing binding error");
            return Ok(Self { pool: None, config });
        };

        let pool = options
            .max_connections(db_config.max_connections())
            .connect(db_config.get_db_url())
            .await
            .context(OpenDatabaseSnafu)?;

        sqlx::migrate!().run(&pool).await.context(MigrateSnafu)?;

        Ok(Self {
            pool: Some(pool),
            config,
        })
    }

    pub fn config(&self) -> &RuntimeConfiguration {
        &self.config
    }

    /// The bound database, or the error every route reports when nothing is bound.
    pub fn database(&self) -> StudentsResult<&Pool<Sqlite>> {
        self.pool.as_ref().context(MissingBindingSnafu)
    }

    pub async fn get_connection(&self) -> StudentsResult<PoolConnection<Sqlite>> {
        self.database()?
            .acquire()
            .await
            .context(GetDatabaseConnectionSnafu)
    }

    pub async fn sensible_shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("database pool closed");
        }
    }
}
