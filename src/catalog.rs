use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::{
    entities::{actor, genre, movie, movie_actor, review},
    error::{AppError, AppResult},
    models::{
        ActorPayload, ActorView, CatalogStats, GenreCount, GenrePayload, GenreView, MoviePayload,
        MovieReviews, MovieView, ReviewPayload, ReviewView,
    },
    rating,
};

#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_actors(&self) -> AppResult<Vec<ActorView>> {
        actor::Entity::find()
            .order_by_asc(actor::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ActorView::try_from)
            .collect()
    }

    pub async fn actor(&self, id: i32) -> AppResult<ActorView> {
        find_actor(&self.db, id).await?.try_into()
    }

    pub async fn create_actor(&self, payload: ActorPayload) -> AppResult<ActorView> {
        let model = actor::ActiveModel {
            name: Set(payload.name),
            birthday: Set(payload.birthday.map(|d| d.to_string())),
            nationality: Set(payload.nationality.map(|n| n.as_code().to_string())),
            bio: Set(payload.bio),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(actor_id = model.id, name = %model.name, "created actor");
        model.try_into()
    }

    pub async fn update_actor(&self, id: i32, payload: ActorPayload) -> AppResult<ActorView> {
        let mut model: actor::ActiveModel = find_actor(&self.db, id).await?.into();
        model.name = Set(payload.name);
        model.birthday = Set(payload.birthday.map(|d| d.to_string()));
        model.nationality = Set(payload.nationality.map(|n| n.as_code().to_string()));
        model.bio = Set(payload.bio);

        let model = model.update(&self.db).await?;
        info!(actor_id = id, "updated actor");
        model.try_into()
    }

    pub async fn delete_actor(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        movie_actor::Entity::delete_many()
            .filter(movie_actor::Column::ActorId.eq(id))
            .exec(&txn)
            .await?;

        let res = actor::Entity::delete_by_id(id).exec(&txn).await?;
        if res.rows_affected == 0 {
            return Err(AppError::not_found("actor", id));
        }

        txn.commit().await?;
        info!(actor_id = id, "deleted actor");
        Ok(())
    }

    pub async fn list_genres(&self) -> AppResult<Vec<GenreView>> {
        let genres = genre::Entity::find().order_by_asc(genre::Column::Id).all(&self.db).await?;
        Ok(genres.into_iter().map(GenreView::from).collect())
    }

    pub async fn genre(&self, id: i32) -> AppResult<GenreView> {
        Ok(find_genre(&self.db, id).await?.into())
    }

    pub async fn create_genre(&self, payload: GenrePayload) -> AppResult<GenreView> {
        let model =
            genre::ActiveModel { name: Set(payload.name), ..Default::default() }.insert(&self.db).await?;

        info!(genre_id = model.id, name = %model.name, "created genre");
        Ok(model.into())
    }

    pub async fn update_genre(&self, id: i32, payload: GenrePayload) -> AppResult<GenreView> {
        let mut model: genre::ActiveModel = find_genre(&self.db, id).await?.into();
        model.name = Set(payload.name);

        let model = model.update(&self.db).await?;
        info!(genre_id = id, "updated genre");
        Ok(model.into())
    }

    pub async fn delete_genre(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let in_use = movie::Entity::find().filter(movie::Column::GenreId.eq(id)).count(&txn).await?;
        if in_use > 0 {
            return Err(AppError::Conflict(format!("genre {id} is used by {in_use} movie(s)")));
        }

        let res = genre::Entity::delete_by_id(id).exec(&txn).await?;
        if res.rows_affected == 0 {
            return Err(AppError::not_found("genre", id));
        }

        txn.commit().await?;
        info!(genre_id = id, "deleted genre");
        Ok(())
    }

    pub async fn list_movies(&self) -> AppResult<Vec<MovieView>> {
        let movies = movie::Entity::find().order_by_asc(movie::Column::Id).all(&self.db).await?;
        let ids: Vec<i32> = movies.iter().map(|m| m.id).collect();

        let mut cast_by_movie = casts(&self.db, &ids).await?;
        let rates = rating::movie_rates(&self.db, &ids).await?;

        debug!(movies = movies.len(), rated = rates.len(), "loaded movies");

        movies
            .into_iter()
            .map(|m| {
                let actors = cast_by_movie.remove(&m.id).unwrap_or_default();
                let rate = rates.get(&m.id).copied();
                MovieView::new(m, actors, rate)
            })
            .collect()
    }

    pub async fn movie(&self, id: i32) -> AppResult<MovieView> {
        let model = find_movie(&self.db, id).await?;
        movie_view(&self.db, model).await
    }

    pub async fn create_movie(&self, payload: MoviePayload) -> AppResult<MovieView> {
        let txn = self.db.begin().await?;

        check_references(&txn, payload.genre, &payload.actors).await?;

        let model = movie::ActiveModel {
            title: Set(payload.title),
            genre_id: Set(payload.genre),
            release_date: Set(payload.release_date.map(|d| d.to_string())),
            resume: Set(payload.resume),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        replace_cast(&txn, model.id, &payload.actors).await?;
        txn.commit().await?;

        info!(movie_id = model.id, title = %model.title, actors = payload.actors.len(), "created movie");
        movie_view(&self.db, model).await
    }

    pub async fn update_movie(&self, id: i32, payload: MoviePayload) -> AppResult<MovieView> {
        let txn = self.db.begin().await?;

        let mut model: movie::ActiveModel = find_movie(&txn, id).await?.into();
        check_references(&txn, payload.genre, &payload.actors).await?;

        model.title = Set(payload.title);
        model.genre_id = Set(payload.genre);
        model.release_date = Set(payload.release_date.map(|d| d.to_string()));
        model.resume = Set(payload.resume);

        let model = model.update(&txn).await?;
        replace_cast(&txn, id, &payload.actors).await?;
        txn.commit().await?;

        info!(movie_id = id, "updated movie");
        movie_view(&self.db, model).await
    }

    pub async fn delete_movie(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let reviews = review::Entity::delete_many()
            .filter(review::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        movie_actor::Entity::delete_many()
            .filter(movie_actor::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;

        let res = movie::Entity::delete_by_id(id).exec(&txn).await?;
        if res.rows_affected == 0 {
            return Err(AppError::not_found("movie", id));
        }

        txn.commit().await?;
        info!(movie_id = id, reviews = reviews.rows_affected, "deleted movie");
        Ok(())
    }

    pub async fn list_reviews(&self) -> AppResult<Vec<ReviewView>> {
        let reviews = review::Entity::find().order_by_asc(review::Column::Id).all(&self.db).await?;
        Ok(reviews.into_iter().map(ReviewView::from).collect())
    }

    /// Reviews of one movie, rated by folding the fetched rows.
    pub async fn movie_reviews(&self, movie_id: i32) -> AppResult<MovieReviews> {
        let movie = find_movie(&self.db, movie_id).await?;
        let reviews = movie
            .find_related(review::Entity)
            .order_by_asc(review::Column::Id)
            .all(&self.db)
            .await?;

        Ok(MovieReviews {
            movie: movie.id,
            rate: rating::mean_of(reviews.iter().map(|r| r.stars)),
            reviews: reviews.into_iter().map(ReviewView::from).collect(),
        })
    }

    pub async fn review(&self, id: i32) -> AppResult<ReviewView> {
        Ok(find_review(&self.db, id).await?.into())
    }

    pub async fn create_review(&self, payload: ReviewPayload) -> AppResult<ReviewView> {
        ensure_movie_reference(&self.db, payload.movie).await?;

        let model = review::ActiveModel {
            movie_id: Set(payload.movie),
            stars: Set(payload.stars),
            comment: Set(payload.comment),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(review_id = model.id, movie_id = model.movie_id, stars = model.stars, "created review");
        Ok(model.into())
    }

    pub async fn update_review(&self, id: i32, payload: ReviewPayload) -> AppResult<ReviewView> {
        let mut model: review::ActiveModel = find_review(&self.db, id).await?.into();
        ensure_movie_reference(&self.db, payload.movie).await?;

        model.movie_id = Set(payload.movie);
        model.stars = Set(payload.stars);
        model.comment = Set(payload.comment);

        let model = model.update(&self.db).await?;
        info!(review_id = id, "updated review");
        Ok(model.into())
    }

    pub async fn delete_review(&self, id: i32) -> AppResult<()> {
        let res = review::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(AppError::not_found("review", id));
        }

        info!(review_id = id, "deleted review");
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<CatalogStats> {
        let total_movies = movie::Entity::find().count(&self.db).await?;
        let total_reviews = review::Entity::find().count(&self.db).await?;

        // Genre names are not unique, so group on the id.
        let by_genre: Vec<(i32, String, i64)> = movie::Entity::find()
            .select_only()
            .column(genre::Column::Id)
            .column(genre::Column::Name)
            .column_as(movie::Column::Id.count(), "count")
            .join(JoinType::InnerJoin, movie::Relation::Genre.def())
            .group_by(genre::Column::Id)
            .group_by(genre::Column::Name)
            .order_by_asc(genre::Column::Name)
            .order_by_asc(genre::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(CatalogStats {
            total_movies,
            movies_by_genre: by_genre
                .into_iter()
                .map(|(genre_id, genre, count)| GenreCount { genre_id, genre, count })
                .collect(),
            total_reviews,
            average_stars: rating::overall_rate(&self.db).await?,
        })
    }
}

async fn find_actor<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<actor::Model> {
    actor::Entity::find_by_id(id).one(db).await?.ok_or_else(|| AppError::not_found("actor", id))
}

async fn find_genre<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<genre::Model> {
    genre::Entity::find_by_id(id).one(db).await?.ok_or_else(|| AppError::not_found("genre", id))
}

async fn find_movie<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<movie::Model> {
    movie::Entity::find_by_id(id).one(db).await?.ok_or_else(|| AppError::not_found("movie", id))
}

async fn find_review<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<review::Model> {
    review::Entity::find_by_id(id).one(db).await?.ok_or_else(|| AppError::not_found("review", id))
}

async fn movie_view<C: ConnectionTrait>(db: &C, model: movie::Model) -> AppResult<MovieView> {
    let rate = rating::movie_rate(db, &model).await?;
    let actors = casts(db, &[model.id]).await?.remove(&model.id).unwrap_or_default();
    MovieView::new(model, actors, rate)
}

/// Actor ids per movie, sorted.
async fn casts<C: ConnectionTrait>(db: &C, movie_ids: &[i32]) -> AppResult<HashMap<i32, Vec<i32>>> {
    if movie_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let links = movie_actor::Entity::find()
        .filter(movie_actor::Column::MovieId.is_in(movie_ids.iter().copied()))
        .order_by_asc(movie_actor::Column::ActorId)
        .all(db)
        .await?;

    let mut out: HashMap<i32, Vec<i32>> = HashMap::new();
    for link in links {
        out.entry(link.movie_id).or_default().push(link.actor_id);
    }
    Ok(out)
}

/// Referenced rows must exist; a bad reference is a client error, not a 404.
async fn check_references<C: ConnectionTrait>(db: &C, genre_id: i32, actor_ids: &[i32]) -> AppResult<()> {
    if genre::Entity::find_by_id(genre_id).one(db).await?.is_none() {
        return Err(AppError::validation(format!("genre {genre_id} does not exist")));
    }

    if actor_ids.is_empty() {
        return Ok(());
    }

    let found: Vec<i32> = actor::Entity::find()
        .select_only()
        .column(actor::Column::Id)
        .filter(actor::Column::Id.is_in(actor_ids.iter().copied()))
        .into_tuple()
        .all(db)
        .await?;

    let missing: Vec<String> =
        actor_ids.iter().filter(|id| !found.contains(id)).map(|id| id.to_string()).collect();
    if !missing.is_empty() {
        return Err(AppError::validation(format!("actors {} do not exist", missing.join(", "))));
    }

    Ok(())
}

async fn ensure_movie_reference<C: ConnectionTrait>(db: &C, movie_id: i32) -> AppResult<()> {
    if movie::Entity::find_by_id(movie_id).one(db).await?.is_none() {
        return Err(AppError::validation(format!("movie {movie_id} does not exist")));
    }
    Ok(())
}

async fn replace_cast<C: ConnectionTrait>(db: &C, movie_id: i32, actor_ids: &[i32]) -> AppResult<()> {
    movie_actor::Entity::delete_many()
        .filter(movie_actor::Column::MovieId.eq(movie_id))
        .exec(db)
        .await?;

    if actor_ids.is_empty() {
        return Ok(());
    }

    let links = actor_ids.iter().map(|actor_id| movie_actor::ActiveModel {
        movie_id: Set(movie_id),
        actor_id: Set(*actor_id),
    });
    movie_actor::Entity::insert_many(links).exec_without_returning(db).await?;

    Ok(())
}
