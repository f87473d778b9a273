mod catalog;
mod config;
mod countries;
mod db;
mod entities;
mod error;
mod models;
mod rating;
mod routes;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{catalog::Catalog, config::Config};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/nationalities", get(routes::nationalities))
        .route("/actors", get(routes::list_actors).post(routes::create_actor))
        .route(
            "/actors/{id}",
            get(routes::get_actor).put(routes::update_actor).delete(routes::delete_actor),
        )
        .route("/genres", get(routes::list_genres).post(routes::create_genre))
        .route(
            "/genres/{id}",
            get(routes::get_genre).put(routes::update_genre).delete(routes::delete_genre),
        )
        .route("/movies", get(routes::list_movies).post(routes::create_movie))
        .route("/movies/stats", get(routes::movie_stats))
        .route(
            "/movies/{id}",
            get(routes::get_movie).put(routes::update_movie).delete(routes::delete_movie),
        )
        .route("/movies/{id}/reviews", get(routes::movie_reviews))
        .route("/reviews", get(routes::list_reviews).post(routes::create_review))
        .route(
            "/reviews/{id}",
            get(routes::get_review).put(routes::update_review).delete(routes::delete_review),
        )
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,reelbase=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let db = db::connect_and_migrate(&config.database_url, config.db_max_connections).await?;
    let state = Arc::new(AppState { catalog: Catalog::new(db) });

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
