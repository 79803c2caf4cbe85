use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Extension, Multipart, Path, Query};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use crate::api::controllers::{created, grouped_response, parse_id, success, success_with_message, Envelope, LayoutQuery};
use crate::api::{ApiContext, ApiError, Result};
use crate::entities::{Photo, PhotoDetails};
use crate::library::MetadataUpdate;
use crate::reconcile::TagInput;

pub fn router() -> Router {
    Router::new()
        .route("/photos", get(list_photos))
        .route("/photos/upload", post(upload_photos))
        .route("/photos/trash", get(list_trash))
        .route("/photos/favorites", get(list_favorites))
        .route("/photos/search", get(search_photos))
        .route("/photos/trash/:photo_id", put(trash_photo))
        .route("/photos/restore/:photo_id", put(restore_photo))
        .route("/photos/favorite/:photo_id", put(toggle_favorite))
        .route("/photos/:photo_id/metadata", get(get_metadata).patch(update_metadata))
}

/// Photo details plus the tag names that could not be created during reconciliation.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TaggedPhoto {
    #[serde(flatten)]
    pub details: PhotoDetails,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped_tags: Vec<String>,
}

#[derive(serde::Deserialize, Debug, Default)]
struct SearchQuery {
    q: Option<String>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::unprocessable_entity([("files", format!("multipart error: {}", e))])
}

async fn upload_photos(
    ctx: Extension<ApiContext>,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut files: Vec<(String, Bytes)> = vec![];
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" | "file" => {
                let filename = field.file_name()
                    .filter(|x| !x.is_empty())
                    .ok_or(ApiError::unprocessable_entity([("files", "filename is empty")]))?
                    .to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                files.push((filename, data));
            }
            "title" => title = Some(field.text().await.map_err(multipart_error)?),
            "description" => description = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("No files uploaded"));
    }

    let title = title.filter(|x| !x.trim().is_empty());
    let mut photos = Vec::with_capacity(files.len());
    for (filename, data) in files {
        let key = ctx.bucket.put(&filename, &data).await?;
        let photo_title = title.clone().unwrap_or_else(|| filename.clone());
        let photo = Photo::new(photo_title, description.clone().unwrap_or_default(), key);
        photos.push(ctx.library.create_photo(photo).await?);
    }
    info!("uploaded {} photo(s)", photos.len());
    Ok(created(success(photos)))
}

async fn list_photos(
    ctx: Extension<ApiContext>,
    Query(query): Query<LayoutQuery>,
) -> Result<Response> {
    grouped_response(&ctx, ctx.library.library_photos(), &query)
}

async fn list_trash(
    ctx: Extension<ApiContext>,
    Query(query): Query<LayoutQuery>,
) -> Result<Response> {
    grouped_response(&ctx, ctx.library.trashed_photos(), &query)
}

async fn list_favorites(
    ctx: Extension<ApiContext>,
    Query(query): Query<LayoutQuery>,
) -> Result<Response> {
    grouped_response(&ctx, ctx.library.favorite_photos(), &query)
}

async fn search_photos(
    ctx: Extension<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Envelope<Vec<PhotoDetails>>>> {
    let q = query.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Err(ApiError::bad_request("Search query is required"));
    }
    let photos = ctx.library.search_photos(&q).into_iter()
        .map(|x| ctx.library.details(x))
        .collect();
    Ok(success(photos))
}

async fn trash_photo(
    ctx: Extension<ApiContext>,
    Path(photo_id): Path<String>,
) -> Result<Json<Envelope<Photo>>> {
    let photo_id = parse_id("photo_id", &photo_id)?;
    let photo = ctx.library.trash_photo(&photo_id).await?;
    Ok(success_with_message("Photo moved to trash", photo))
}

async fn restore_photo(
    ctx: Extension<ApiContext>,
    Path(photo_id): Path<String>,
) -> Result<Json<Envelope<Photo>>> {
    let photo_id = parse_id("photo_id", &photo_id)?;
    let photo = ctx.library.restore_photo(&photo_id).await?;
    Ok(success_with_message("Photo restored", photo))
}

async fn toggle_favorite(
    ctx: Extension<ApiContext>,
    Path(photo_id): Path<String>,
) -> Result<Json<Envelope<Photo>>> {
    let photo_id = parse_id("photo_id", &photo_id)?;
    let photo = ctx.library.toggle_favorite(&photo_id).await?;
    Ok(success(photo))
}

async fn get_metadata(
    ctx: Extension<ApiContext>,
    Path(photo_id): Path<String>,
) -> Result<Json<Envelope<PhotoDetails>>> {
    let photo_id = parse_id("photo_id", &photo_id)?;
    let details = ctx.library.get_photo_details(&photo_id)
        .ok_or(ApiError::not_found("Photo not found"))?;
    Ok(success(details))
}

fn optional_string(body: &Value, field: &'static str) -> Result<Option<String>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(x)) => Ok(Some(x.clone())),
        Some(_) => Err(ApiError::unprocessable_entity([(field, "expected a string")])),
    }
}

async fn update_metadata(
    ctx: Extension<ApiContext>,
    Path(photo_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Envelope<TaggedPhoto>>> {
    let photo_id = parse_id("photo_id", &photo_id)?;
    let album_id = match optional_string(&body, "albumId")? {
        Some(raw) => Some(parse_id("albumId", &raw)?),
        None => None,
    };
    let update = MetadataUpdate {
        title: optional_string(&body, "title")?,
        description: optional_string(&body, "description")?,
        album_id,
        tags: TagInput::from_json(body.get("tags")),
    };

    let (details, reconciliation) = ctx.library.update_photo_metadata(&photo_id, update).await?;
    let photo = TaggedPhoto { details, dropped_tags: reconciliation.dropped_names };
    Ok(success_with_message("Photo metadata updated", photo))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use crate::api::test_support::TestApp;
    use super::*;

    async fn seed(app: &TestApp, title: &str, minutes: i64) -> Photo {
        let base = Utc.with_ymd_and_hms(2024, 1, 5, 15, 0, 0).unwrap();
        let photo = Photo {
            created_at: base + Duration::minutes(minutes),
            ..Photo::new(title.to_string(), "".to_string(), format!("{}.jpg", title))
        };
        app.ctx.library.create_photo(photo).await.unwrap()
    }

    fn multipart_upload(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let boundary = "shoebox-test-boundary";
        let mut body: Vec<u8> = vec![];
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            let disposition = match filename {
                Some(filename) => format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/jpeg\r\n\r\n",
                    name, filename
                ),
                None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(data.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/photos/upload")
            .header("content-type", format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn upload_stores_objects_and_defaults_title() {
        let app = TestApp::new();
        let request = multipart_upload(&[
            ("files", Some("beach.jpg"), "one"),
            ("files", Some("dunes.png"), "two"),
            ("description", None, "summer"),
        ]);
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::CREATED);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "success");
        let photos = body["data"].as_array().unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0]["title"], "beach.jpg");
        assert_eq!(photos[1]["title"], "dunes.png");
        assert_eq!(photos[1]["description"], "summer");

        let key = photos[1]["path"].as_str().unwrap();
        assert!(key.ends_with(".png"));
        assert_eq!(std::fs::read(app.ctx.bucket.object_path(key).unwrap()).unwrap(), b"two");
        assert_eq!(app.ctx.library.get_photo_count(), 2);
    }

    #[tokio::test]
    async fn upload_uses_given_title() {
        let app = TestApp::new();
        let request = multipart_upload(&[("title", None, "Sunset"), ("file", Some("x.jpg"), "data")]);
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::CREATED);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["data"][0]["title"], "Sunset");
    }

    #[tokio::test]
    async fn upload_without_files_is_rejected() {
        let app = TestApp::new();
        let (status, body) = app.send(multipart_upload(&[("title", None, "Sunset")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({ "status": "fail", "message": "No files uploaded" }));
    }

    #[tokio::test]
    async fn photos_are_grouped_into_moments() {
        let app = TestApp::new();
        for (title, minutes) in [("t0", 0), ("t2", 2), ("t10", 10), ("t12", 12)] {
            seed(&app, title, minutes).await;
        }

        let (status, body) = app.json("GET", "/api/v1/photos", None).await;
        assert_eq!(status, StatusCode::OK);
        let moments = body["data"].as_array().unwrap();
        assert_eq!(moments.len(), 2);
        assert_eq!(moments[0]["index"], 0);
        assert_eq!(moments[0]["label"], "January 5th 2024, 3:12 PM");
        assert_eq!(moments[0]["photos"][0]["title"], "t12");
        assert_eq!(moments[0]["photos"][1]["title"], "t10");
        assert_eq!(moments[1]["photos"].as_array().unwrap().len(), 2);

        let (status, body) = app.json("GET", "/api/v1/photos?layout=legacy", None).await;
        assert_eq!(status, StatusCode::OK);
        let legacy = body["data"].as_object().unwrap();
        assert_eq!(legacy.len(), 2);
        assert_eq!(legacy["January 5th 2024, 3:02 PM"][0]["title"], "t2");

        let (status, _) = app.json("GET", "/api/v1/photos?layout=grid", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn trash_and_restore() {
        let app = TestApp::new();
        let photo = seed(&app, "beach", 0).await;

        let (status, body) = app.json("PUT", &format!("/api/v1/photos/trash/{}", photo.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Photo moved to trash");
        assert_eq!(body["data"]["isTrashed"], true);

        let (_, body) = app.json("GET", "/api/v1/photos", None).await;
        assert_eq!(body["data"], json!([]));
        let (_, body) = app.json("GET", "/api/v1/photos/trash", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = app.json("PUT", &format!("/api/v1/photos/restore/{}", photo.id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = app.json("GET", "/api/v1/photos/trash", None).await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn favorite_toggle_shows_in_favorites() {
        let app = TestApp::new();
        let photo = seed(&app, "beach", 0).await;
        let (_, body) = app.json("PUT", &format!("/api/v1/photos/favorite/{}", photo.id), None).await;
        assert_eq!(body["data"]["isFavorite"], true);
        let (_, body) = app.json("GET", "/api/v1/photos/favorites", None).await;
        assert_eq!(body["data"][0]["photos"][0]["id"], photo.id.to_string());
    }

    #[tokio::test]
    async fn unknown_and_invalid_ids() {
        let app = TestApp::new();
        let (status, body) = app.json("PUT", &format!("/api/v1/photos/trash/{}", uuid::Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "status": "fail", "message": "Photo not found" }));

        let (status, body) = app.json("GET", "/api/v1/photos/not-a-uuid/metadata", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["photo_id"][0], "invalid id");
    }

    #[tokio::test]
    async fn metadata_update_reconciles_tags() {
        let app = TestApp::new();
        let photo = seed(&app, "beach", 0).await;
        app.ctx.library.create_tag("sunset".to_string()).await.unwrap();
        let uri = format!("/api/v1/photos/{}/metadata", photo.id);

        let (status, body) = app.json("PATCH", &uri, Some(json!({
            "title": "Beach day",
            "tags": ["sunset", "nature"],
        }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Beach day");
        assert_eq!(body["data"]["tags"], json!(["sunset", "nature"]));
        assert!(body["data"].get("droppedTags").is_none());

        // anything but an array of strings leaves the tags alone
        let (status, body) = app.json("PATCH", &uri, Some(json!({ "description": "windy", "tags": "sunset" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["description"], "windy");
        assert_eq!(body["data"]["tags"], json!(["sunset", "nature"]));

        let (_, body) = app.json("GET", &uri, None).await;
        assert_eq!(body["data"]["title"], "Beach day");
        assert_eq!(body["data"]["tags"], json!(["sunset", "nature"]));
        assert_eq!(body["data"]["album"], Value::Null);
    }

    #[tokio::test]
    async fn metadata_update_rejects_wrong_types() {
        let app = TestApp::new();
        let photo = seed(&app, "beach", 0).await;
        let uri = format!("/api/v1/photos/{}/metadata", photo.id);
        let (status, body) = app.json("PATCH", &uri, Some(json!({ "title": 42 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["title"][0], "expected a string");
    }

    #[tokio::test]
    async fn search_by_tag_name() {
        let app = TestApp::new();
        let beach = seed(&app, "beach", 0).await;
        seed(&app, "hills", 1).await;
        app.ctx.library.update_photo_tags(&beach.id, &TagInput::from_names(["Sunset"])).await.unwrap();

        let (status, body) = app.json("GET", "/api/v1/photos/search?q=sunset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["tags"], json!(["Sunset"]));

        let (status, _) = app.json("GET", "/api/v1/photos/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
