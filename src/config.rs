use crate::error::{BadEnvVarSnafu, ParseMaxConnectionsSnafu, StudentsResult};
use dotenvy::var;
use snafu::ResultExt;
use std::{env::VarError, sync::Arc};

const DEFAULT_SERVER_IP: &str = "127.0.0.1:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 15;

#[derive(Clone, Debug)]
pub struct RuntimeConfiguration {
    server_ip: String,
    db_config: Option<Arc<DbConfig>>,
}

impl RuntimeConfiguration {
    pub fn new() -> StudentsResult<Self> {
        Ok(Self {
            server_ip: optional_env_var("STUDENTS_SERVER_IP")?
                .unwrap_or_else(|| DEFAULT_SERVER_IP.to_string()),
            db_config: DbConfig::new()?.map(Arc::new),
        })
    }

    #[cfg(test)]
    pub fn with_database_url(url: Option<&str>) -> Self {
        Self {
            server_ip: DEFAULT_SERVER_IP.to_string(),
            db_config: url.map(|url| {
                Arc::new(DbConfig {
                    url: url.to_string(),
                    max_connections: 1,
                })
            }),
        }
    }

    pub fn server_ip(&self) -> &str {
        &self.server_ip
    }

    /// `None` when no database is bound, which every data request reports as a 500.
    pub fn db_config(&self) -> Option<Arc<DbConfig>> {
        self.db_config.clone()
    }
}

#[derive(Debug)]
pub struct DbConfig {
    url: String,
    max_connections: u32,
}

impl DbConfig {
    pub fn new() -> StudentsResult<Option<Self>> {
        let Some(url) = optional_env_var("DB_URL")? else {
            return Ok(None);
        };

        let max_connections = match optional_env_var("DB_MAX_CONNECTIONS")? {
            Some(original) => original
                .trim()
                .parse()
                .context(ParseMaxConnectionsSnafu { original })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Some(Self {
            url,
            max_connections,
        }))
    }

    pub fn get_db_url(&self) -> &str {
        &self.url
    }

    pub const fn max_connections(&self) -> u32 {
        self.max_connections
    }
}

fn optional_env_var(name: &'static str) -> StudentsResult<Option<String>> {
    match var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(dotenvy::Error::EnvVar(VarError::NotPresent)) => Ok(None),
        Err(source) => Err(source).context(BadEnvVarSnafu { name }),
    }
}
