use axum::extract::{Extension, Path};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use crate::api::controllers::photos::TaggedPhoto;
use crate::api::controllers::{created, parse_id};
use crate::api::{ApiContext, ApiError, Result};
use crate::entities::{InsertResult, Tag};
use crate::reconcile::TagInput;

pub fn router() -> Router {
    Router::new()
        .route("/tags", get(get_all_tags).post(create_tag))
        .route("/tags/:photo_id", get(get_photo_tags).patch(update_photo_tags).put(update_photo_tags))
}

#[derive(serde::Deserialize, Debug, Default)]
struct CreateTag {
    name: Option<String>,
}

async fn get_all_tags(
    ctx: Extension<ApiContext>,
) -> Json<Vec<Tag>> {
    Json(ctx.library.all_tags())
}

async fn create_tag(
    ctx: Extension<ApiContext>,
    Json(req): Json<CreateTag>,
) -> Result<Response> {
    let name = req.name.unwrap_or_default();
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("Tag name is required"));
    }
    match ctx.library.create_tag(name).await? {
        InsertResult::New(tag) => Ok(created(Json(tag))),
        InsertResult::Existing(tag) => Err(ApiError::conflict("Tag already exists", tag)),
    }
}

async fn get_photo_tags(
    ctx: Extension<ApiContext>,
    Path(photo_id): Path<String>,
) -> Result<Json<Vec<Tag>>> {
    let photo_id = parse_id("photo_id", &photo_id)?;
    if ctx.library.get_photo(&photo_id).is_none() {
        return Err(ApiError::not_found("Photo not found"));
    }
    Ok(Json(ctx.library.tags_of_photo(&photo_id)))
}

async fn update_photo_tags(
    ctx: Extension<ApiContext>,
    Path(photo_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<TaggedPhoto>> {
    let photo_id = parse_id("photo_id", &photo_id)?;
    let input = TagInput::from_json(body.get("tags"));
    if input.is_malformed() {
        return Err(ApiError::bad_request("Tags must be an array of strings."));
    }

    let reconciliation = ctx.library.update_photo_tags(&photo_id, &input).await?;
    let details = ctx.library.get_photo_details(&photo_id)
        .ok_or(ApiError::not_found("Photo not found"))?;
    Ok(Json(TaggedPhoto { details, dropped_tags: reconciliation.dropped_names }))
}
