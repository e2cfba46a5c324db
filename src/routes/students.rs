use crate::{
    data::{
        DataType, RowId,
        student::{NewStudent, Student, StudentBody, StudentUpdate},
    },
    error::{
        MethodNotAllowedSnafu, MissingIdSnafu, NoFieldsSnafu, NotFoundSnafu, ReadBodySnafu,
        ReadQuerySnafu, StudentsResult,
    },
    state::StudentsState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{
        Query, State,
        rejection::{BytesRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use snafu::{OptionExt, ResultExt};

/// Extractors are taken as `Result`s so a rejection still answers with the JSON error shape,
/// and only after the missing database has been reported.
type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;
type RawBody = Result<Bytes, BytesRejection>;

/// The `id` and `q` parameters, first occurrence wins.
#[derive(Debug, Default)]
pub struct StudentsQuery {
    pub id: Option<String>,
    pub q: Option<String>,
}

impl From<Vec<(String, String)>> for StudentsQuery {
    fn from(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "id" if query.id.is_none() => query.id = Some(value),
                "q" if query.q.is_none() => query.q = Some(value),
                _ => {}
            }
        }
        query
    }
}

impl StudentsQuery {
    fn extracted(pairs: QueryPairs) -> StudentsResult<Self> {
        let Query(pairs) = pairs.context(ReadQuerySnafu)?;
        Ok(Self::from(pairs))
    }

    fn row_id(&self) -> Option<RowId> {
        self.id.as_deref().and_then(RowId::parse)
    }
}

pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn get_students(
    State(state): State<StudentsState>,
    pairs: QueryPairs,
) -> StudentsResult<Response> {
    state.database()?;
    let query = StudentsQuery::extracted(pairs)?;
    let mut conn = state.get_connection().await?;

    if let Some(id) = query.row_id() {
        let student = Student::get_from_db_by_id(id, &mut *conn)
            .await?
            .context(NotFoundSnafu)?;
        return Ok(Json(student).into_response());
    }

    let all = Student::get_all(query.q.as_deref(), &mut *conn).await?;
    Ok(Json(all).into_response())
}

#[axum::debug_handler]
pub async fn post_student(State(state): State<StudentsState>, body: RawBody) -> StudentsResult<Response> {
    state.database()?;
    let body = body.context(ReadBodySnafu)?;
    let new_student = NewStudent::try_from(StudentBody::from_json_bytes(&body))?;

    let mut conn = state.get_connection().await?;
    let run = Student::insert_into_database(new_student, &mut *conn).await?;

    let Some(id) = run.inserted_row_id() else {
        warn!(?run, "insert reported no row id, answering with the raw result");
        return Ok((StatusCode::CREATED, Json(run)).into_response());
    };

    // may be gone already if someone deleted it in between, which answers `null`
    let created = Student::get_from_db_by_id(RowId::from(id), &mut *conn).await?;
    info!(id, "student created");
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn put_student(
    State(state): State<StudentsState>,
    pairs: QueryPairs,
    body: RawBody,
) -> StudentsResult<Response> {
    state.database()?;
    let id = StudentsQuery::extracted(pairs)?
        .row_id()
        .context(MissingIdSnafu)?;

    let body = body.context(ReadBodySnafu)?;
    let update = StudentUpdate::from(StudentBody::from_json_bytes(&body));
    snafu::ensure!(!update.is_empty(), NoFieldsSnafu);

    let mut conn = state.get_connection().await?;
    Student::update_in_database(id, update, &mut *conn).await?;

    Ok(match Student::get_from_db_by_id(id, &mut *conn).await? {
        Some(student) => Json(student).into_response(),
        None => Json(serde_json::Map::new()).into_response(),
    })
}

pub async fn delete_student(
    State(state): State<StudentsState>,
    pairs: QueryPairs,
) -> StudentsResult<Response> {
    state.database()?;
    let id = StudentsQuery::extracted(pairs)?
        .row_id()
        .context(MissingIdSnafu)?;

    let mut conn = state.get_connection().await?;
    let run = Student::remove_from_database(id, &mut *conn).await?;
    Ok(Json(run).into_response())
}

/// Unsupported verbs still report a missing database first.
pub async fn method_not_allowed(State(state): State<StudentsState>) -> StudentsResult<Response> {
    state.database()?;
    MethodNotAllowedSnafu.fail()
}
