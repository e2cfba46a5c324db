use axum::{
    Json,
    extract::rejection::{BytesRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use snafu::Snafu;
use std::num::ParseIntError;

pub type StudentsResult<T> = Result<T, StudentsError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StudentsError {
    #[snafu(display("Error opening database: {source}"))]
    OpenDatabase { source: sqlx::Error },
    #[snafu(display("Error getting db connection: {source}"))]
    GetDatabaseConnection { source: sqlx::Error },
    #[snafu(display("Error making SQL query: {source}"))]
    MakeQuery { source: sqlx::Error },
    #[snafu(display("Error migrating DB schema: {source}"))]
    Migrate { source: sqlx::migrate::MigrateError },
    #[snafu(display("Unable to retrieve env var `{}`", name))]
    BadEnvVar {
        source: dotenvy::Error,
        name: &'static str,
    },
    #[snafu(display("Unable to parse `{}` as a connection count", original))]
    ParseMaxConnections {
        source: ParseIntError,
        original: String,
    },
    #[snafu(display("Unable to read request body: {source}"))]
    ReadBody { source: BytesRejection },
    #[snafu(display("Unable to read query string: {source}"))]
    ReadQuery { source: QueryRejection },
    #[snafu(display("missing D1 binding DB"))]
    MissingBinding,
    #[snafu(display("missing name"))]
    MissingName,
    #[snafu(display("missing age"))]
    MissingAge,
    #[snafu(display("missing id"))]
    MissingId,
    #[snafu(display("no_fields"))]
    NoFields,
    #[snafu(display("not_found"))]
    NotFound,
    #[snafu(display("method"))]
    MethodNotAllowed,
}

/// The `{"error": ...}` body every failed request answers with.
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn response(status_code: StatusCode, error: impl Into<String>) -> Response {
        (
            status_code,
            Json(Self {
                error: error.into(),
            }),
        )
            .into_response()
    }
}

impl IntoResponse for StudentsError {
    #[allow(clippy::match_same_arms)]
    fn into_response(self) -> Response {
        const ISE: StatusCode = StatusCode::INTERNAL_SERVER_ERROR; //internal server error
        const NF: StatusCode = StatusCode::NOT_FOUND; //not found
        const BI: StatusCode = StatusCode::BAD_REQUEST; //bad input
        const NM: StatusCode = StatusCode::METHOD_NOT_ALLOWED; //wrong verb

        let status_code = match &self {
            Self::OpenDatabase { .. } | Self::GetDatabaseConnection { .. } => ISE,
            Self::MakeQuery { .. } => ISE,
            Self::Migrate { .. } => ISE,
            Self::BadEnvVar { .. } | Self::ParseMaxConnections { .. } => ISE,
            Self::MissingBinding => ISE,
            Self::ReadBody { source } => source.status(),
            Self::ReadQuery { source } => source.status(),
            Self::MissingName | Self::MissingAge | Self::MissingId | Self::NoFields => BI,
            Self::NotFound => NF,
            Self::MethodNotAllowed => NM,
        };

        if status_code.is_server_error() {
            error!(?self, "Error!");
        } else {
            debug!(%self, %status_code, "Rejected request");
        }
        ErrorBody::response(status_code, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(error: StudentsError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn client_errors_carry_machine_readable_codes() {
        for (error, status, code) in [
            (StudentsError::MissingName, StatusCode::BAD_REQUEST, "missing name"),
            (StudentsError::MissingAge, StatusCode::BAD_REQUEST, "missing age"),
            (StudentsError::MissingId, StatusCode::BAD_REQUEST, "missing id"),
            (StudentsError::NoFields, StatusCode::BAD_REQUEST, "no_fields"),
            (StudentsError::NotFound, StatusCode::NOT_FOUND, "not_found"),
            (StudentsError::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED, "method"),
        ] {
            let (got_status, body) = render(error).await;
            assert_eq!(got_status, status);
            assert_eq!(body, serde_json::json!({ "error": code }));
        }
    }

    #[tokio::test]
    async fn database_failures_are_stringified() {
        let (status, body) = render(StudentsError::MakeQuery {
            source: sqlx::Error::PoolClosed,
        })
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Error making SQL query: "));
        assert!(message.len() > "Error making SQL query: ".len());
    }

    #[tokio::test]
    async fn missing_binding_is_a_server_error() {
        let (status, body) = render(StudentsError::MissingBinding).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "missing D1 binding DB");
    }
}
