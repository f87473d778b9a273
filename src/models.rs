use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::{
    countries::Nationality,
    entities::{actor, genre, movie, review},
    error::{AppError, AppResult},
};

pub const NAME_MAX_CHARS: usize = 200;
pub const TITLE_MAX_CHARS: usize = 500;
pub const STARS_MIN: i32 = 0;
pub const STARS_MAX: i32 = 5;

fn default_nationality() -> Option<Nationality> {
    Some(Nationality::default())
}

/// Trims `value` and checks it is non-blank and at most `max` characters.
fn required_text(field: &str, value: &str, max: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(AppError::validation(format!("{field} must be at most {max} characters")));
    }
    Ok(value.to_string())
}

fn parse_date(raw: Option<&str>) -> AppResult<Option<Date>> {
    Ok(raw.map(str::parse::<Date>).transpose()?)
}

#[derive(Clone, Debug, Deserialize)]
pub struct ActorPayload {
    pub name: String,
    #[serde(default)]
    pub birthday: Option<Date>,
    /// Omitted means Brazil; an explicit `null` clears it.
    #[serde(default = "default_nationality")]
    pub nationality: Option<Nationality>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl ActorPayload {
    pub fn validate(mut self) -> AppResult<Self> {
        self.name = required_text("name", &self.name, NAME_MAX_CHARS)?;
        Ok(self)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ActorView {
    pub id: i32,
    pub name: String,
    pub birthday: Option<Date>,
    pub nationality: Option<String>,
    pub bio: Option<String>,
}

impl TryFrom<actor::Model> for ActorView {
    type Error = AppError;

    fn try_from(m: actor::Model) -> AppResult<Self> {
        Ok(Self {
            id: m.id,
            birthday: parse_date(m.birthday.as_deref())?,
            name: m.name,
            nationality: m.nationality,
            bio: m.bio,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenrePayload {
    pub name: String,
}

impl GenrePayload {
    pub fn validate(mut self) -> AppResult<Self> {
        self.name = required_text("name", &self.name, NAME_MAX_CHARS)?;
        Ok(self)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GenreView {
    pub id: i32,
    pub name: String,
}

impl From<genre::Model> for GenreView {
    fn from(m: genre::Model) -> Self {
        Self { id: m.id, name: m.name }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MoviePayload {
    pub title: String,
    pub genre: i32,
    #[serde(default)]
    pub release_date: Option<Date>,
    #[serde(default)]
    pub actors: Vec<i32>,
    #[serde(default)]
    pub resume: Option<String>,
}

impl MoviePayload {
    pub fn validate(mut self) -> AppResult<Self> {
        self.title = required_text("title", &self.title, TITLE_MAX_CHARS)?;
        self.actors.sort_unstable();
        self.actors.dedup();
        Ok(self)
    }
}

/// Stored movie fields plus its cast and derived `rate`.
#[derive(Clone, Debug, Serialize)]
pub struct MovieView {
    pub id: i32,
    pub title: String,
    pub genre: i32,
    pub release_date: Option<Date>,
    pub actors: Vec<i32>,
    pub resume: Option<String>,
    pub rate: Option<f64>,
}

impl MovieView {
    pub fn new(m: movie::Model, actors: Vec<i32>, rate: Option<f64>) -> AppResult<Self> {
        Ok(Self {
            id: m.id,
            release_date: parse_date(m.release_date.as_deref())?,
            title: m.title,
            genre: m.genre_id,
            actors,
            resume: m.resume,
            rate,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReviewPayload {
    pub movie: i32,
    pub stars: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ReviewPayload {
    pub fn validate(self) -> AppResult<Self> {
        if !(STARS_MIN..=STARS_MAX).contains(&self.stars) {
            return Err(AppError::validation(format!(
                "stars must be between {STARS_MIN} and {STARS_MAX}"
            )));
        }
        Ok(self)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ReviewView {
    pub id: i32,
    pub movie: i32,
    pub stars: i32,
    pub comment: Option<String>,
}

impl From<review::Model> for ReviewView {
    fn from(m: review::Model) -> Self {
        Self { id: m.id, movie: m.movie_id, stars: m.stars, comment: m.comment }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieReviews {
    pub movie: i32,
    pub rate: Option<f64>,
    pub reviews: Vec<ReviewView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GenreCount {
    pub genre_id: i32,
    pub genre: String,
    pub count: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CatalogStats {
    pub total_movies: u64,
    pub movies_by_genre: Vec<GenreCount>,
    pub total_reviews: u64,
    pub average_stars: Option<f64>,
}
