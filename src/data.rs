use crate::error::StudentsResult;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, sqlite::SqliteQueryResult};
use std::time::Instant;

pub mod coercion;
pub mod student;

/// A row identifier as it arrives in a query string.
///
/// Bound as a REAL so that `?id=2.0` still finds row 2, while a fractional or
/// unparseable id (NaN binds as NULL) matches nothing.
#[derive(Clone, Copy, Debug, PartialEq, sqlx::Type)]
#[sqlx(transparent)]
pub struct RowId(f64);

impl RowId {
    /// `None` for an empty parameter, which counts as no id at all.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(Self(coercion::str_to_number(raw).unwrap_or(f64::NAN)))
    }
}

impl From<i64> for RowId {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self(value as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunMeta {
    pub duration: f64,
    pub changes: u64,
    pub last_row_id: Option<i64>,
    pub changed_db: bool,
}

impl RunMeta {
    fn since(started: Instant) -> Self {
        Self {
            duration: started.elapsed().as_secs_f64() * 1000.0,
            ..Self::default()
        }
    }
}

/// Outcome of a statement that returns no rows.
///
/// Stores disagree on where the new row id lives: either nested as
/// `meta.last_row_id` or top-level as `lastInsertRowId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RunMeta>,
    #[serde(
        default,
        rename = "lastInsertRowId",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_insert_row_id: Option<i64>,
}

impl RunResult {
    pub fn from_query_result(result: &SqliteQueryResult, started: Instant) -> Self {
        Self {
            success: true,
            meta: Some(RunMeta {
                changes: result.rows_affected(),
                last_row_id: Some(result.last_insert_rowid()),
                changed_db: result.rows_affected() > 0,
                ..RunMeta::since(started)
            }),
            last_insert_row_id: None,
        }
    }

    /// Nested shape first, then the top-level one. Zero means nothing was inserted.
    pub fn inserted_row_id(&self) -> Option<i64> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.last_row_id)
            .filter(|id| *id != 0)
            .or_else(|| self.last_insert_row_id.filter(|id| *id != 0))
    }
}

/// Outcome of a statement that returns rows, wrapped rather than a bare array.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResults<T> {
    pub results: Vec<T>,
    pub success: bool,
    pub meta: RunMeta,
}

impl<T> QueryResults<T> {
    pub fn new(results: Vec<T>, started: Instant) -> Self {
        Self {
            results,
            success: true,
            meta: RunMeta::since(started),
        }
    }
}

pub trait DataType: Sized {
    type Id;
    type FormForAdding;
    type FormForUpdating;

    async fn get_from_db_by_id(
        id: Self::Id,
        conn: &mut SqliteConnection,
    ) -> StudentsResult<Option<Self>>;
    async fn get_all(
        search: Option<&str>,
        conn: &mut SqliteConnection,
    ) -> StudentsResult<QueryResults<Self>>;
    async fn insert_into_database(
        to_be_added: Self::FormForAdding,
        conn: &mut SqliteConnection,
    ) -> StudentsResult<RunResult>;
    async fn update_in_database(
        id: Self::Id,
        to_be_updated: Self::FormForUpdating,
        conn: &mut SqliteConnection,
    ) -> StudentsResult<RunResult>;
    async fn remove_from_database(
        id: Self::Id,
        conn: &mut SqliteConnection,
    ) -> StudentsResult<RunResult>;
}
