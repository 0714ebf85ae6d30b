use std::str::FromStr;

use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use rollcall_core::UserId;

use crate::app::errors::json_error;
use crate::context::UserContext;

/// Header carrying the caller's user id (UUID).
pub const USER_ID_HEADER: &str = "x-user-id";

pub async fn identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let user_id = extract_user_id(req.headers())
        .map_err(|msg| json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg))?;

    req.extensions_mut().insert(UserContext::new(user_id));

    Ok(next.run(req).await)
}

fn extract_user_id(headers: &HeaderMap) -> Result<UserId, &'static str> {
    let header = headers
        .get(USER_ID_HEADER)
        .ok_or("missing x-user-id header")?;

    let header = header.to_str().map_err(|_| "x-user-id is not valid text")?;

    UserId::from_str(header).map_err(|_| "x-user-id is not a valid user id")
}
