use axum::extract::{Extension, Path, Query};
use axum::response::Response;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use crate::api::controllers::{grouped_response, parse_id, success_with_message, Envelope, LayoutQuery};
use crate::api::{ApiContext, Result};
use crate::entities::Photo;

pub fn router() -> Router {
    Router::new()
        .route("/favorites", get(list_favorites))
        .route("/favorites/:photo_id", put(toggle_favorite))
}

#[derive(Serialize, Debug)]
struct FavoriteToggle {
    favorited: bool,
    photo: Photo,
}

async fn list_favorites(
    ctx: Extension<ApiContext>,
    Query(query): Query<LayoutQuery>,
) -> Result<Response> {
    grouped_response(&ctx, ctx.library.favorite_photos(), &query)
}

async fn toggle_favorite(
    ctx: Extension<ApiContext>,
    Path(photo_id): Path<String>,
) -> Result<Json<Envelope<FavoriteToggle>>> {
    let photo_id = parse_id("photo_id", &photo_id)?;
    let photo = ctx.library.toggle_favorite(&photo_id).await?;
    let message = if photo.is_favorite { "Added to favorites" } else { "Removed from favorites" };
    Ok(success_with_message(message, FavoriteToggle { favorited: photo.is_favorite, photo }))
}
