use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::{
    AppState,
    countries::{self, NationalityEntry},
    error::AppResult,
    models::{
        ActorPayload, ActorView, CatalogStats, GenrePayload, GenreView, MoviePayload, MovieReviews,
        MovieView, ReviewPayload, ReviewView,
    },
};

type Body<T> = Result<Json<T>, JsonRejection>;

fn body<T>(body: Body<T>) -> AppResult<T> {
    Ok(body?.0)
}

type Id = Result<Path<i32>, PathRejection>;

fn path_id(path: Id) -> AppResult<i32> {
    Ok(path?.0)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn nationalities() -> Json<Vec<NationalityEntry>> {
    Json(countries::table())
}

pub async fn list_actors(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<ActorView>>> {
    Ok(Json(state.catalog.list_actors().await?))
}

pub async fn get_actor(
    State(state): State<Arc<AppState>>,
    path: Id,
) -> AppResult<Json<ActorView>> {
    let id = path_id(path)?;
    Ok(Json(state.catalog.actor(id).await?))
}

pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    req: Body<ActorPayload>,
) -> AppResult<(StatusCode, Json<ActorView>)> {
    let payload = body(req)?.validate()?;
    Ok((StatusCode::CREATED, Json(state.catalog.create_actor(payload).await?)))
}

pub async fn update_actor(
    State(state): State<Arc<AppState>>,
    path: Id,
    req: Body<ActorPayload>,
) -> AppResult<Json<ActorView>> {
    let id = path_id(path)?;
    let payload = body(req)?.validate()?;
    Ok(Json(state.catalog.update_actor(id, payload).await?))
}

pub async fn delete_actor(
    State(state): State<Arc<AppState>>,
    path: Id,
) -> AppResult<StatusCode> {
    let id = path_id(path)?;
    state.catalog.delete_actor(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_genres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<GenreView>>> {
    Ok(Json(state.catalog.list_genres().await?))
}

pub async fn get_genre(
    State(state): State<Arc<AppState>>,
    path: Id,
) -> AppResult<Json<GenreView>> {
    let id = path_id(path)?;
    Ok(Json(state.catalog.genre(id).await?))
}

pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    req: Body<GenrePayload>,
) -> AppResult<(StatusCode, Json<GenreView>)> {
    let payload = body(req)?.validate()?;
    Ok((StatusCode::CREATED, Json(state.catalog.create_genre(payload).await?)))
}

pub async fn update_genre(
    State(state): State<Arc<AppState>>,
    path: Id,
    req: Body<GenrePayload>,
) -> AppResult<Json<GenreView>> {
    let id = path_id(path)?;
    let payload = body(req)?.validate()?;
    Ok(Json(state.catalog.update_genre(id, payload).await?))
}

pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    path: Id,
) -> AppResult<StatusCode> {
    let id = path_id(path)?;
    state.catalog.delete_genre(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<MovieView>>> {
    Ok(Json(state.catalog.list_movies().await?))
}

pub async fn movie_stats(State(state): State<Arc<AppState>>) -> AppResult<Json<CatalogStats>> {
    Ok(Json(state.catalog.stats().await?))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    path: Id,
) -> AppResult<Json<MovieView>> {
    let id = path_id(path)?;
    Ok(Json(state.catalog.movie(id).await?))
}

pub async fn movie_reviews(
    State(state): State<Arc<AppState>>,
    path: Id,
) -> AppResult<Json<MovieReviews>> {
    let id = path_id(path)?;
    Ok(Json(state.catalog.movie_reviews(id).await?))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    req: Body<MoviePayload>,
) -> AppResult<(StatusCode, Json<MovieView>)> {
    let payload = body(req)?.validate()?;
    Ok((StatusCode::CREATED, Json(state.catalog.create_movie(payload).await?)))
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    path: Id,
    req: Body<MoviePayload>,
) -> AppResult<Json<MovieView>> {
    let id = path_id(path)?;
    let payload = body(req)?.validate()?;
    Ok(Json(state.catalog.update_movie(id, payload).await?))
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    path: Id,
) -> AppResult<StatusCode> {
    let id = path_id(path)?;
    state.catalog.delete_movie(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_reviews(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<ReviewView>>> {
    Ok(Json(state.catalog.list_reviews().await?))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    path: Id,
) -> AppResult<Json<ReviewView>> {
    let id = path_id(path)?;
    Ok(Json(state.catalog.review(id).await?))
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    req: Body<ReviewPayload>,
) -> AppResult<(StatusCode, Json<ReviewView>)> {
    let payload = body(req)?.validate()?;
    Ok((StatusCode::CREATED, Json(state.catalog.create_review(payload).await?)))
}

pub async fn update_review(
    State(state): State<Arc<AppState>>,
    path: Id,
    req: Body<ReviewPayload>,
) -> AppResult<Json<ReviewView>> {
    let id = path_id(path)?;
    let payload = body(req)?.validate()?;
    Ok(Json(state.catalog.update_review(id, payload).await?))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    path: Id,
) -> AppResult<StatusCode> {
    let id = path_id(path)?;
    state.catalog.delete_review(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{self, Body as HttpBody},
        http::{Method, Request},
    };
    use sea_orm::ConnectionTrait;
    use tower::ServiceExt;

    use super::*;
    use crate::{app, catalog::Catalog, db::test_db};

    async fn test_app() -> Router {
        let state = Arc::new(AppState { catalog: Catalog::new(test_db().await) });
        app(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, payload: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match payload {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(HttpBody::from(v.to_string()))
                .unwrap(),
            None => builder.body(HttpBody::empty()).unwrap(),
        };

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    async fn seed_movie(app: &Router) -> i64 {
        let (_, genre) = send(app, Method::POST, "/genres", Some(json!({ "name": "Drama" }))).await;
        let (status, movie) = send(
            app,
            Method::POST,
            "/movies",
            Some(json!({ "title": "Central do Brasil", "genre": genre["id"], "release_date": "1998-04-03" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        movie["id"].as_i64().unwrap()
    }

    async fn review(app: &Router, movie: i64, stars: i64) -> StatusCode {
        send(app, Method::POST, "/reviews", Some(json!({ "movie": movie, "stars": stars }))).await.0
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn actor_defaults_to_brazil() {
        let app = test_app().await;
        let (status, actor) =
            send(&app, Method::POST, "/actors", Some(json!({ "name": "Fernanda Torres" }))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(actor["nationality"], "BR");
        assert_eq!(actor["birthday"], Value::Null);

        let uri = format!("/actors/{}", actor["id"]);
        let (status, fetched) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Fernanda Torres");
    }

    #[tokio::test]
    async fn actor_with_unknown_nationality_is_rejected() {
        let app = test_app().await;
        for code in ["XX", "br"] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/actors",
                Some(json!({ "name": "Someone", "nationality": code })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "code {code}");
            assert!(body["detail"].as_str().unwrap().contains("not a valid nationality code"));
        }

        let (_, actors) = send(&app, Method::GET, "/actors", None).await;
        assert_eq!(actors, json!([]));
    }

    #[tokio::test]
    async fn actor_accepts_listed_nationality() {
        let app = test_app().await;
        let (status, actor) = send(
            &app,
            Method::POST,
            "/actors",
            Some(json!({ "name": "Toshiro Mifune", "nationality": "JP", "birthday": "1920-04-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(actor["nationality"], "JP");
        assert_eq!(actor["birthday"], "1920-04-01");
    }

    #[tokio::test]
    async fn nationalities_lists_table() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/nationalities", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 38);
        assert_eq!(body[7], json!({ "code": "BR", "name": "Brazil" }));
    }

    #[tokio::test]
    async fn movie_rate_follows_reviews() {
        let app = test_app().await;
        let id = seed_movie(&app).await;
        let uri = format!("/movies/{id}");

        let (_, movie) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(movie["rate"], Value::Null);
        assert!(movie.as_object().unwrap().contains_key("rate"));

        for stars in [4, 5, 3] {
            assert_eq!(review(&app, id, stars).await, StatusCode::CREATED);
        }
        let (_, movie) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(movie["rate"], json!(4.0));
        assert_eq!(movie["release_date"], "1998-04-03");
    }

    #[tokio::test]
    async fn half_star_average_is_kept() {
        let app = test_app().await;
        let id = seed_movie(&app).await;
        review(&app, id, 1).await;
        review(&app, id, 2).await;

        let (_, movies) = send(&app, Method::GET, "/movies", None).await;
        assert_eq!(movies[0]["rate"], json!(1.5));
    }

    #[tokio::test]
    async fn single_zero_review_rates_zero() {
        let app = test_app().await;
        let id = seed_movie(&app).await;
        review(&app, id, 0).await;

        let (_, movie) = send(&app, Method::GET, &format!("/movies/{id}"), None).await;
        assert_eq!(movie["rate"], json!(0.0));
    }

    #[tokio::test]
    async fn movie_reviews_endpoint_lists_and_rates() {
        let app = test_app().await;
        let id = seed_movie(&app).await;
        review(&app, id, 4).await;
        review(&app, id, 5).await;

        let (status, body) = send(&app, Method::GET, &format!("/movies/{id}/reviews"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["movie"], id);
        assert_eq!(body["rate"], json!(4.5));
        assert_eq!(body["reviews"].as_array().unwrap().len(), 2);

        let (status, _) = send(&app, Method::GET, "/movies/999/reviews", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn out_of_range_stars_are_rejected() {
        let app = test_app().await;
        let id = seed_movie(&app).await;

        assert_eq!(review(&app, id, 6).await, StatusCode::BAD_REQUEST);
        assert_eq!(review(&app, id, -1).await, StatusCode::BAD_REQUEST);

        let (_, reviews) = send(&app, Method::GET, "/reviews", None).await;
        assert_eq!(reviews, json!([]));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let app = test_app().await;
        for uri in ["/actors/9", "/genres/9", "/movies/9", "/reviews/9"] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(body["detail"].as_str().unwrap().ends_with("9 not found"));

            let (status, _) = send(&app, Method::DELETE, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn rate_store_failure_is_server_error() {
        let db = test_db().await;
        let app = app(Arc::new(AppState { catalog: Catalog::new(db.clone()) }));
        let id = seed_movie(&app).await;
        db.execute_unprepared("DROP TABLE review").await.unwrap();

        let (status, body) = send(&app, Method::GET, &format!("/movies/{id}"), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "failed to retrieve data");
        assert!(body.get("rate").is_none());
    }

    #[tokio::test]
    async fn malformed_ids_are_bad_request() {
        let app = test_app().await;
        for uri in ["/movies/abc", "/actors/99999999999", "/reviews/1.5", "/genres/-x"] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["detail"].is_string(), "{uri}");
        }

        let (status, body) =
            send(&app, Method::PUT, "/genres/abc", Some(json!({ "name": "Drama" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let (status, _) = send(&app, Method::GET, "/movies/abc/reviews", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn referenced_genre_delete_conflicts() {
        let app = test_app().await;
        let id = seed_movie(&app).await;
        let (_, movie) = send(&app, Method::GET, &format!("/movies/{id}"), None).await;

        let (status, _) =
            send(&app, Method::DELETE, &format!("/genres/{}", movie["genre"]), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, Method::DELETE, &format!("/movies/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) =
            send(&app, Method::DELETE, &format!("/genres/{}", movie["genre"]), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn put_replaces_movie_fields() {
        let app = test_app().await;
        let id = seed_movie(&app).await;
        let (_, actor) = send(&app, Method::POST, "/actors", Some(json!({ "name": "Vinícius de Oliveira" }))).await;
        let (_, movie) = send(&app, Method::GET, &format!("/movies/{id}"), None).await;

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/movies/{id}"),
            Some(json!({ "title": "Central Station", "genre": movie["genre"], "actors": [actor["id"]] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Central Station");
        assert_eq!(updated["actors"], json!([actor["id"]]));
        assert_eq!(updated["release_date"], Value::Null);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::POST, "/genres", Some(json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn stats_endpoint_reports_average() {
        let app = test_app().await;
        let id = seed_movie(&app).await;
        review(&app, id, 5).await;
        review(&app, id, 4).await;

        let (status, stats) = send(&app, Method::GET, "/movies/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_movies"], 1);
        assert_eq!(stats["total_reviews"], 2);
        assert_eq!(stats["average_stars"], json!(4.5));
        assert_eq!(
            stats["movies_by_genre"],
            json!([{ "genre_id": 1, "genre": "Drama", "count": 1 }])
        );
    }
}
