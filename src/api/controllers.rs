use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;
use crate::api::{ApiContext, ApiError, Result};
use crate::entities::{Photo, PhotoDetails};
use crate::moments::LegacyMoments;

mod albums;
mod favorites;
mod photos;
mod ping;
mod tags;
mod uploads;

pub fn router(max_upload_bytes: usize) -> Router {
    let api = ping::router()
        .merge(photos::router())
        .merge(tags::router())
        .merge(albums::router())
        .merge(favorites::router());

    Router::new()
        .nest("/api/v1", api)
        .merge(uploads::router())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

pub fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { status: "success", message: None, data: Some(data) })
}

pub fn success_with_message<T: Serialize>(message: impl Into<String>, data: T) -> Json<Envelope<T>> {
    Json(Envelope { status: "success", message: Some(message.into()), data: Some(data) })
}

pub fn parse_id(field: &'static str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::unprocessable_entity([(field, "invalid id")]))
}

#[derive(serde::Deserialize, Debug, Default)]
pub struct LayoutQuery {
    layout: Option<String>,
}

/// Group `photos` (already newest first) into moments, in the layout the client asked for.
pub fn grouped_response(ctx: &ApiContext, photos: Vec<Photo>, query: &LayoutQuery) -> Result<Response> {
    let details: Vec<PhotoDetails> = photos.into_iter().map(|x| ctx.library.details(x)).collect();
    let moments = ctx.grouper.group(details);
    match query.layout.as_deref() {
        None | Some("moments") => Ok(success(moments).into_response()),
        Some("legacy") => Ok(success(LegacyMoments::from(moments)).into_response()),
        Some(_) => Err(ApiError::unprocessable_entity([("layout", "expected 'moments' or 'legacy'")])),
    }
}

pub fn created<T: IntoResponse>(body: T) -> Response {
    (StatusCode::CREATED, body).into_response()
}
