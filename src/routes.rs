use crate::{
    error::ErrorBody,
    routes::students::{
        delete_student, get_students, method_not_allowed, post_student, preflight, put_student,
    },
    state::StudentsState,
};
use axum::{
    Router,
    http::{
        HeaderValue, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
        },
    },
    response::Response,
    routing::get,
};
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

pub mod students;

pub const ALLOWED_METHODS: &str = "GET,POST,PUT,PATCH,DELETE,OPTIONS";

pub fn router(state: StudentsState) -> Router {
    let students = get(get_students)
        .post(post_student)
        .put(put_student)
        .patch(put_student)
        .delete(delete_student)
        .options(preflight)
        // axum would otherwise answer HEAD with the GET handler
        .head(method_not_allowed)
        .fallback(method_not_allowed);

    with_json_layers(Router::new().route("/api/students", students)).with_state(state)
}

/// Every response, failures and preflights included, is JSON and open to any origin.
fn with_json_layers<S: Clone + Send + Sync + 'static>(router: Router<S>) -> Router<S> {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(SetResponseHeaderLayer::overriding(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("content-type"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(TraceLayer::new_for_http())
}

#[allow(clippy::needless_pass_by_value)]
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(ToString::to_string))
        .unwrap_or_else(|| "handler panicked".to_string());

    error!(%message, "Panic while handling request");
    ErrorBody::response(StatusCode::INTERNAL_SERVER_ERROR, message)
}
