use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use rollcall_attendance::{project, simulate, SubjectAttendanceRecord};

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/projection", post(projection))
        .route("/what-if", post(what_if))
}

pub async fn projection(
    body: Result<Json<SubjectAttendanceRecord>, JsonRejection>,
) -> axum::response::Response {
    let Json(record) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_error(rejection.status(), "invalid_request", rejection.body_text()),
    };

    if let Err(e) = record.validate() {
        return errors::domain_error_to_response("invalid_record", e);
    }

    (StatusCode::OK, Json(dto::ProjectionResponse::from(project(&record)))).into_response()
}

pub async fn what_if(body: Result<Json<dto::WhatIfRequest>, JsonRejection>) -> axum::response::Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_error(rejection.status(), "invalid_request", rejection.body_text()),
    };

    let record = match req.record() {
        Ok(record) => record,
        Err(e) => return errors::domain_error_to_response("invalid_record", e),
    };

    (StatusCode::OK, Json(simulate(&record, req.scenario()))).into_response()
}
