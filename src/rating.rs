//! Derived movie rating.
//!
//! A movie's `rate` is the mean of its review stars rounded to one decimal
//! place, or `None` when the movie has no reviews. A movie whose reviews are
//! all zero stars rates `Some(0.0)`, which stays distinct from "unrated".
//!
//! The mean is pushed to the store as a SUM/COUNT aggregate. [`mean_of`] is
//! the in-memory equivalent for already fetched reviews; both go through
//! [`average`] so they round identically.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, QuerySelect};

use crate::{
    entities::{movie, review},
    error::AppResult,
};

/// Mean of `count` ratings summing to `total`, rounded to tenths.
pub fn average(total: i64, count: i64) -> Option<f64> {
    if count <= 0 {
        return None;
    }
    Some(round_tenths(total as f64 / count as f64))
}

/// Rounds to one decimal place using the exact binary value of `value`.
///
/// Exact ties go to the even digit (2.25 -> 2.2, 2.75 -> 2.8). A mean such as
/// 2.45 is stored slightly above the tie, so it rounds up to 2.5; scaling by
/// ten first would land on 24.5 and round down.
pub fn round_tenths(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

pub fn mean_of<I>(stars: I) -> Option<f64>
where
    I: IntoIterator<Item = i32>,
{
    let (total, count) =
        stars.into_iter().fold((0i64, 0i64), |(total, count), s| (total + i64::from(s), count + 1));
    average(total, count)
}

/// Rate of a single loaded movie, aggregated over its `reviews` relation.
pub async fn movie_rate<C>(db: &C, movie: &movie::Model) -> AppResult<Option<f64>>
where
    C: ConnectionTrait,
{
    let row: Option<(Option<i64>, i64)> = movie
        .find_related(review::Entity)
        .select_only()
        .column_as(review::Column::Stars.sum(), "total")
        .column_as(review::Column::Id.count(), "reviews")
        .into_tuple()
        .one(db)
        .await?;

    Ok(row.and_then(|(total, count)| average(total.unwrap_or(0), count)))
}

/// Rates for many movies with one grouped aggregate. Movies without reviews
/// are absent from the map.
pub async fn movie_rates<C>(db: &C, movie_ids: &[i32]) -> AppResult<HashMap<i32, f64>>
where
    C: ConnectionTrait,
{
    if movie_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, Option<i64>, i64)> = review::Entity::find()
        .select_only()
        .column(review::Column::MovieId)
        .column_as(review::Column::Stars.sum(), "total")
        .column_as(review::Column::Id.count(), "reviews")
        .filter(review::Column::MovieId.is_in(movie_ids.iter().copied()))
        .group_by(review::Column::MovieId)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(movie_id, total, count)| {
            average(total.unwrap_or(0), count).map(|rate| (movie_id, rate))
        })
        .collect())
}

/// Mean over every review in the catalog.
pub async fn overall_rate<C>(db: &C) -> AppResult<Option<f64>>
where
    C: ConnectionTrait,
{
    let row: Option<(Option<i64>, i64)> = review::Entity::find()
        .select_only()
        .column_as(review::Column::Stars.sum(), "total")
        .column_as(review::Column::Id.count(), "reviews")
        .into_tuple()
        .one(db)
        .await?;

    Ok(row.and_then(|(total, count)| average(total.unwrap_or(0), count)))
}
