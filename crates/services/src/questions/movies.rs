use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use quiz_core::model::{PosterImage, Question};

use super::source::QuestionSource;
use crate::error::QuestionSourceError;

/// Rating thresholds a question may ask about.
const RATING_THRESHOLDS: std::ops::RangeInclusive<u8> = 5..=9;

/// A catalog entry with its poster already fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub title: String,
    pub rating: f64,
    pub poster: PosterImage,
}

/// Fetches the movie catalog questions are generated from.
#[async_trait]
pub trait MoviesLoader: Send + Sync {
    /// # Errors
    ///
    /// Returns `QuestionSourceError` if the catalog cannot be fetched.
    async fn load_movies(&self) -> Result<Vec<Movie>, QuestionSourceError>;
}

//
// ─── JSON CATALOG ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct MovieEntry {
    title: String,
    rating: f64,
    #[serde(default)]
    image: Option<String>,
}

/// Reads a JSON array of `{ "title", "rating", "image" }` entries.
///
/// Image paths are resolved relative to the catalog file. A poster that cannot
/// be read becomes an empty image instead of failing the whole catalog.
#[derive(Debug, Clone)]
pub struct JsonMoviesLoader {
    path: PathBuf,
}

impl JsonMoviesLoader {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_poster(&self, image: Option<&str>) -> PosterImage {
        let Some(image) = image else {
            return PosterImage::empty();
        };
        let base = self.path.parent().unwrap_or_else(|| Path::new("."));
        let poster_path = base.join(image);
        match tokio::fs::read(&poster_path).await {
            Ok(bytes) => PosterImage::new(bytes),
            Err(err) => {
                warn!(path = %poster_path.display(), error = %err, "poster unavailable");
                PosterImage::empty()
            }
        }
    }
}

#[async_trait]
impl MoviesLoader for JsonMoviesLoader {
    async fn load_movies(&self) -> Result<Vec<Movie>, QuestionSourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let entries: Vec<MovieEntry> = serde_json::from_str(&raw)?;

        let mut movies = Vec::with_capacity(entries.len());
        for entry in entries {
            let poster = self.read_poster(entry.image.as_deref()).await;
            movies.push(Movie {
                title: entry.title,
                rating: entry.rating,
                poster,
            });
        }
        debug!(count = movies.len(), path = %self.path.display(), "loaded movie catalog");
        Ok(movies)
    }
}

//
// ─── QUESTION FACTORY ──────────────────────────────────────────────────────────
//

/// Generates rating questions about random movies from a catalog.
///
/// Each question picks a movie and a threshold and asks whether the movie's
/// rating is above it. The source never runs dry once loaded.
pub struct MovieQuestionSource {
    loader: Arc<dyn MoviesLoader>,
    movies: Mutex<Option<Vec<Movie>>>,
    rng: Mutex<StdRng>,
}

impl MovieQuestionSource {
    #[must_use]
    pub fn new(loader: Arc<dyn MoviesLoader>) -> Self {
        Self::with_rng(loader, StdRng::from_os_rng())
    }

    /// Deterministic question order, for tests and replays.
    #[must_use]
    pub fn with_seed(loader: Arc<dyn MoviesLoader>, seed: u64) -> Self {
        Self::with_rng(loader, StdRng::seed_from_u64(seed))
    }

    fn with_rng(loader: Arc<dyn MoviesLoader>, rng: StdRng) -> Self {
        Self {
            loader,
            movies: Mutex::new(None),
            rng: Mutex::new(rng),
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> QuestionSourceError {
    QuestionSourceError::Failed(e.to_string())
}

#[async_trait]
impl QuestionSource for MovieQuestionSource {
    async fn load(&self) -> Result<(), QuestionSourceError> {
        let movies = self.loader.load_movies().await?;
        if movies.is_empty() {
            return Err(QuestionSourceError::EmptyCatalog);
        }
        *self.movies.lock().map_err(poisoned)? = Some(movies);
        Ok(())
    }

    async fn request_next(&self) -> Result<Option<Question>, QuestionSourceError> {
        let movies = self.movies.lock().map_err(poisoned)?;
        let movies = movies.as_ref().ok_or(QuestionSourceError::NotLoaded)?;
        if movies.is_empty() {
            return Err(QuestionSourceError::EmptyCatalog);
        }

        let (movie, threshold) = {
            let mut rng = self.rng.lock().map_err(poisoned)?;
            let movie = &movies[rng.random_range(0..movies.len())];
            (movie, rng.random_range(RATING_THRESHOLDS))
        };

        let prompt = format!("Is the rating of this movie greater than {threshold}?");
        let correct_answer = movie.rating > f64::from(threshold);
        Ok(Some(Question::new(
            prompt,
            movie.poster.clone(),
            correct_answer,
        )))
    }
}
