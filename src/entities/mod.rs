pub mod actor;
pub mod genre;
pub mod movie;
pub mod movie_actor;
pub mod review;
