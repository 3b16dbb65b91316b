mod graphql;
mod seed;
mod storage;

use std::path::{Path, PathBuf};

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::http::HeaderValue;
use axum::{extract::State, response::Html, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use graphql::Schema;

/// Server settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
struct Config {
    port: u16,
    db_path: PathBuf,
    images_dir: PathBuf,
    dist_dir: PathBuf,
    seed_file: Option<PathBuf>,
}

impl Config {
    fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let port = match lookup("PORT") {
            Some(p) => p
                .parse()
                .map_err(|e| format!("Invalid PORT '{}': {}", p, e))?,
            None => 3000,
        };
        let path_or = |key: &str, default: &str| {
            PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
        };
        Ok(Config {
            port,
            db_path: path_or("DB_PATH", "data/panoramas.redb"),
            images_dir: path_or("IMAGES_DIR", "images"),
            dist_dir: path_or("DIST_DIR", "dist"),
            seed_file: lookup("SEED_FILE").filter(|s| !s.is_empty()).map(PathBuf::from),
        })
    }
}

async fn graphql_handler(State(schema): State<Schema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

/// Build a cache-controlled static file router.
///
/// Separated so tests can exercise the caching layer with arbitrary directories.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_1DAY: &str = "public, max-age=86400, must-revalidate";
const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Build the full application router.
fn build_app(schema: Schema, config: &Config) -> Router {
    // Panorama images can be replaced in place, viewer bundles are hashed.
    let static_files = Router::new()
        .nest(
            "/images",
            cached_static_router(&config.images_dir, CACHE_1DAY),
        )
        .nest(
            "/dist",
            cached_static_router(&config.dist_dir, CACHE_IMMUTABLE),
        );

    let index_path = config.dist_dir.join("index.html");
    let index = get(move || serve_index(index_path.clone()));

    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/", index.clone())
        .route("/panorama/{id}", index)
        .with_state(schema)
        .merge(static_files)
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create database directory: {}", e))?;
    }
    let storage = storage::Storage::open(&config.db_path)?;

    if let Some(seed_file) = &config.seed_file {
        let seed = seed::Seed::load(seed_file)?;
        let imported = seed.import_into(&storage, &chrono::Utc::now().to_rfc3339())?;
        tracing::info!(imported, "Seed import finished");
    }

    let schema = graphql::build_schema(storage);
    let app = build_app(schema, &config);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Server running at http://localhost:{}", config.port);
    tracing::info!("GraphiQL playground at http://localhost:{}/graphql", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    axum::serve(listener, app).await.map_err(|e| e.to_string())
}

async fn serve_index(index_path: PathBuf) -> Html<String> {
    // Try to serve the built viewer, fall back to a simple message
    match tokio::fs::read_to_string(&index_path).await {
        Ok(html) => Html(html),
        Err(_) => Html(
            r#"<!DOCTYPE html>
<html>
<head><title>Panorama Calibration</title></head>
<body>
<h1>Panorama Calibration</h1>
<p>Viewer not built yet. Visit <a href="/graphql">GraphiQL</a> to explore the API.</p>
</body>
</html>"#
                .to_string(),
        ),
    }
}
