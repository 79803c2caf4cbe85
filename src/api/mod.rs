use anyhow::Context;
use axum::{Extension, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::filter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
pub use error::ApiError;
use crate::bucket::Bucket;
use crate::config::{Config, DB_FILE_NAME};
use crate::library::Library;
use crate::moments::MomentGrouper;
use crate::storage::{DynStorage, FileStorage};

mod error;
mod controllers;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Clone)]
pub struct ApiContext {
    pub cfg: Arc<Config>,
    pub library: Arc<Library<DynStorage>>,
    pub bucket: Arc<Bucket>,
    pub grouper: MomentGrouper,
}

impl ApiContext {
    pub fn new(config: Config, library: Library<DynStorage>, bucket: Bucket) -> Self {
        let grouper = MomentGrouper::new(config.moments.window, config.moments.utc_offset());
        Self {
            cfg: Arc::new(config),
            library: Arc::new(library),
            bucket: Arc::new(bucket),
            grouper,
        }
    }

    /// Open the DB file and the bucket under the configured workdir and replay the log.
    pub async fn init(config: Config) -> anyhow::Result<Self> {
        let workdir = config.storage.get_or_create_workdir()?;
        let db_path = workdir.join(DB_FILE_NAME);
        info!("db_path: {}", db_path.display());
        let storage: DynStorage = Box::new(FileStorage::new(db_path)?);
        let library = Library::new(storage);
        library.init().await.context("failed to init db")?;
        let bucket = Bucket::open(config.storage.bucket_dir.clone())?;
        Ok(Self::new(config, library, bucket))
    }
}

pub fn init_tracing() {
    let tracing_layer = tracing_subscriber::fmt::layer();
    let filter = filter::Targets::new()
        .with_target("tower_http::trace::on_response", Level::DEBUG)
        .with_target("tower_http::trace::make_span", Level::DEBUG)
        .with_default(Level::INFO);
    tracing_subscriber::registry()
        .with(tracing_layer)
        .with(filter)
        .init();
}

pub fn app(ctx: ApiContext) -> Router {
    controllers::router(ctx.cfg.server.max_upload_bytes)
        .layer(CorsLayer::new().allow_methods(Any).allow_headers(Any).allow_origin(Any))
        .layer(ServiceBuilder::new().layer(Extension(ctx)).layer(TraceLayer::new_for_http()))
}

pub async fn serve(ctx: ApiContext) -> anyhow::Result<()> {
    let addr = ctx.cfg.server.addr;
    let app = app(ctx);
    let listener = tokio::net::TcpListener::bind(addr).await
        .context("failed to bind to address")?;
    info!("listening on {}", &addr);
    axum::serve(listener, app).await.context("error running HTTP server")
}
