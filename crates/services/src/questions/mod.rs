mod fixed;
mod movies;
mod source;

pub use fixed::FixedQuestionSource;
pub use movies::{JsonMoviesLoader, Movie, MovieQuestionSource, MoviesLoader};
pub use source::QuestionSource;
