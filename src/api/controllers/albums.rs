use axum::extract::{Extension, Path};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use crate::api::controllers::{created, parse_id};
use crate::api::{ApiContext, ApiError, Result};
use crate::entities::{Album, Photo};

pub fn router() -> Router {
    Router::new()
        .route("/albums", get(get_all_albums).post(create_album))
        .route("/albums/add-photo", post(add_photo))
        .route("/albums/remove-photo", post(remove_photo))
        .route("/albums/:album_id/photos", get(get_album_photos))
}

#[derive(serde::Deserialize, Debug, Default)]
struct CreateAlbum {
    name: Option<String>,
    description: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AlbumPhoto {
    album_id: String,
    photo_id: String,
}

async fn get_all_albums(
    ctx: Extension<ApiContext>,
) -> Json<Vec<Album>> {
    Json(ctx.library.all_albums())
}

async fn create_album(
    ctx: Extension<ApiContext>,
    Json(req): Json<CreateAlbum>,
) -> Result<Response> {
    let name = req.name.unwrap_or_default();
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("Album name is required"));
    }
    let album = ctx.library.create_album(name, req.description).await?;
    Ok(created(Json(album)))
}

async fn add_photo(
    ctx: Extension<ApiContext>,
    Json(req): Json<AlbumPhoto>,
) -> Result<Response> {
    let album_id = parse_id("albumId", &req.album_id)?;
    let photo_id = parse_id("photoId", &req.photo_id)?;
    let link = ctx.library.add_photo_to_album(&album_id, &photo_id).await?;
    Ok(created(Json(link)))
}

async fn remove_photo(
    ctx: Extension<ApiContext>,
    Json(req): Json<AlbumPhoto>,
) -> Result<Json<Value>> {
    let album_id = parse_id("albumId", &req.album_id)?;
    let photo_id = parse_id("photoId", &req.photo_id)?;
    ctx.library.remove_photo_from_album(&album_id, &photo_id).await?;
    Ok(Json(json!({ "message": "Photo removed from album" })))
}

async fn get_album_photos(
    ctx: Extension<ApiContext>,
    Path(album_id): Path<String>,
) -> Result<Json<Vec<Photo>>> {
    let album_id = parse_id("album_id", &album_id)?;
    Ok(Json(ctx.library.photos_in_album(&album_id)?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use crate::api::test_support::TestApp;
    use crate::entities::Photo;

    #[tokio::test]
    async fn album_lifecycle() {
        let app = TestApp::new();
        let photo = app.ctx.library.create_photo(Photo::new("beach".to_string(), "".to_string(), "a.jpg".to_string())).await.unwrap();

        let (status, album) = app.json("POST", "/api/v1/albums", Some(json!({ "name": "Summer", "description": "2024" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(album["name"], "Summer");
        let pair = json!({ "albumId": album["id"], "photoId": photo.id });

        let (status, _) = app.json("POST", "/api/v1/albums/add-photo", Some(pair.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = app.json("POST", "/api/v1/albums/add-photo", Some(pair.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Photo already in album");

        let uri = format!("/api/v1/albums/{}/photos", album["id"].as_str().unwrap());
        let (_, photos) = app.json("GET", &uri, None).await;
        assert_eq!(photos[0]["id"], photo.id.to_string());

        let (status, body) = app.json("POST", "/api/v1/albums/remove-photo", Some(pair.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Photo removed from album");
        let (status, body) = app.json("POST", "/api/v1/albums/remove-photo", Some(pair)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Photo not found in album");

        let (_, albums) = app.json("GET", "/api/v1/albums", None).await;
        assert_eq!(albums.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn album_name_is_required() {
        let app = TestApp::new();
        let (status, body) = app.json("POST", "/api/v1/albums", Some(json!({ "description": "no name" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Album name is required");
    }

    #[tokio::test]
    async fn photos_of_unknown_album() {
        let app = TestApp::new();
        let uri = format!("/api/v1/albums/{}/photos", uuid::Uuid::new_v4());
        let (status, body) = app.json("GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Album not found");
    }
}
