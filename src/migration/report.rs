//! Run statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rows written per target table
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct LoadStats {
    pub films: usize,
    pub genres: usize,
    pub persons: usize,
    pub film_genres: usize,
    pub film_persons: usize,
}

impl LoadStats {
    pub fn total(&self) -> usize {
        self.films + self.genres + self.persons + self.film_genres + self.film_persons
    }
}

impl std::fmt::Display for LoadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "film_work: {}, genre: {}, person: {}, genre_film_work: {}, person_film_work: {}",
            self.films, self.genres, self.persons, self.film_genres, self.film_persons
        )
    }
}

/// One migration run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source_films: usize,
    /// None on a dry run
    pub loaded: Option<LoadStats>,
}

impl MigrationReport {
    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

impl std::fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.loaded {
            Some(stats) => write!(
                f,
                "{} source films -> {} rows written ({}) in {:.1}s",
                self.source_films,
                stats.total(),
                stats,
                self.elapsed_secs()
            ),
            None => write!(
                f,
                "{} source films transformed, nothing written (dry run) in {:.1}s",
                self.source_films,
                self.elapsed_secs()
            ),
        }
    }
}
