use crate::{
    data::{DataType, QueryResults, RowId, RunResult, coercion},
    error::{MakeQuerySnafu, MissingAgeSnafu, MissingNameSnafu, NoFieldsSnafu, StudentsResult},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use snafu::{OptionExt, ResultExt};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub age: Age,
}

/// Ages are stored as REAL but whole ones go out as JSON integers.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::Type)]
#[sqlx(transparent)]
pub struct Age(pub f64);

impl Serialize for Age {
    #[allow(clippy::cast_possible_truncation)]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

        if self.0.fract() == 0.0 && self.0.abs() <= MAX_SAFE_INTEGER {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// A request body as sent, keeping an absent field apart from an explicit `null`.
#[derive(Debug, Default, Deserialize)]
pub struct StudentBody {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub age: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl StudentBody {
    /// Anything that isn't a JSON object reads as an empty body.
    pub fn from_json_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(object @ Value::Object(_)) => serde_json::from_value(object).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub name: String,
    pub age: Age,
}

impl TryFrom<StudentBody> for NewStudent {
    type Error = crate::error::StudentsError;

    fn try_from(StudentBody { name, age }: StudentBody) -> Result<Self, Self::Error> {
        let name = match name {
            Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
            _ => return MissingNameSnafu.fail(),
        };
        let age = age
            .filter(|age| !age.is_null())
            .as_ref()
            .and_then(coercion::to_number)
            .context(MissingAgeSnafu)?;

        Ok(Self {
            name,
            age: Age(age),
        })
    }
}

/// Only the fields present in the body; an age that isn't a number is dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub age: Option<Age>,
}

impl StudentUpdate {
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none()
    }
}

impl From<StudentBody> for StudentUpdate {
    fn from(StudentBody { name, age }: StudentBody) -> Self {
        Self {
            name: name.as_ref().map(coercion::to_display_string),
            age: age.as_ref().and_then(coercion::to_number).map(Age),
        }
    }
}

impl DataType for Student {
    type Id = RowId;
    type FormForAdding = NewStudent;
    type FormForUpdating = StudentUpdate;

    async fn get_from_db_by_id(id: Self::Id, conn: &mut SqliteConnection) -> StudentsResult<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT rowid AS id, name, age FROM students WHERE rowid = ?")
            .bind(id)
            .fetch_optional(conn)
            .await
            .context(MakeQuerySnafu)
    }

    async fn get_all(
        search: Option<&str>,
        conn: &mut SqliteConnection,
    ) -> StudentsResult<QueryResults<Self>> {
        let started = Instant::now();
        let query = match search.filter(|search| !search.is_empty()) {
            Some(search) => sqlx::query_as::<_, Self>(
                "SELECT rowid AS id, name, age FROM students WHERE name LIKE ? ORDER BY rowid",
            )
            .bind(format!("%{search}%")),
            None => sqlx::query_as::<_, Self>(
                "SELECT rowid AS id, name, age FROM students ORDER BY rowid",
            ),
        };

        let results = query.fetch_all(conn).await.context(MakeQuerySnafu)?;
        Ok(QueryResults::new(results, started))
    }

    async fn insert_into_database(
        to_be_added: Self::FormForAdding,
        conn: &mut SqliteConnection,
    ) -> StudentsResult<RunResult> {
        let NewStudent { name, age } = to_be_added;
        let started = Instant::now();

        let result = sqlx::query("INSERT INTO students (name, age) VALUES (?, ?)")
            .bind(name)
            .bind(age)
            .execute(conn)
            .await
            .context(MakeQuerySnafu)?;
        Ok(RunResult::from_query_result(&result, started))
    }

    async fn update_in_database(
        id: Self::Id,
        to_be_updated: Self::FormForUpdating,
        conn: &mut SqliteConnection,
    ) -> StudentsResult<RunResult> {
        snafu::ensure!(!to_be_updated.is_empty(), NoFieldsSnafu);
        let StudentUpdate { name, age } = to_be_updated;
        let started = Instant::now();

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE students SET ");
        let mut assignments = builder.separated(", ");
        if let Some(name) = name {
            assignments.push("name = ").push_bind_unseparated(name);
        }
        if let Some(age) = age {
            assignments.push("age = ").push_bind_unseparated(age);
        }
        builder.push(" WHERE rowid = ").push_bind(id);

        let result = builder
            .build()
            .execute(conn)
            .await
            .context(MakeQuerySnafu)?;
        Ok(RunResult::from_query_result(&result, started))
    }

    async fn remove_from_database(id: Self::Id, conn: &mut SqliteConnection) -> StudentsResult<RunResult> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM students WHERE rowid = ?")
            .bind(id)
            .execute(conn)
            .await
            .context(MakeQuerySnafu)?;
        Ok(RunResult::from_query_result(&result, started))
    }
}
