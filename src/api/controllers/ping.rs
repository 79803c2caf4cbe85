use axum::routing::get;
use axum::Router;

pub fn router() -> Router {
    Router::new()
        .route("/ping", get(ping))
}

async fn ping() -> &'static str {
    "pong"
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use crate::api::test_support::TestApp;

    #[tokio::test]
    async fn ping_pongs() {
        let app = TestApp::new();
        let request = Request::builder().uri("/api/v1/ping").body(Body::empty()).unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"pong");
    }
}
