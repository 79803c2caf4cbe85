use axum::body::Body;
use axum::extract::{Extension, Path};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use crate::api::{ApiContext, ApiError, Result};

pub fn router() -> Router {
    Router::new()
        .route("/uploads/:key", get(get_object))
}

async fn get_object(
    ctx: Extension<ApiContext>,
    Path(key): Path<String>,
) -> Result<Response> {
    let file = ctx.bucket.open_object(&key).await?
        .ok_or(ApiError::not_found("Object not found"))?;
    let content_type = mime_guess::from_path(&key).first_or_octet_stream();
    let stream = tokio_util::io::ReaderStream::new(file);
    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (header::CACHE_CONTROL, "public, max-age=31536000".to_string()),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}
