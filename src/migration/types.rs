//! Core data types for the migration pipeline
//! Pure data structures with no behavior beyond formatting

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

/// Film id as stored in the legacy `movies` table (e.g. "tt0076759")
pub type SourceFilmId = String;
/// Actor ids are integers in the legacy store
pub type ActorId = i64;
/// Writer ids are opaque strings in the legacy store
pub type WriterId = String;

/// Row of the legacy `movies` table, as stored
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MovieRow {
    pub id: SourceFilmId,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub writer: Option<String>,
    pub title: String,
    pub plot: Option<String>,
    pub imdb_rating: Option<String>,
    pub writers: Option<String>,
}

/// Row of the legacy `actors` table
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ActorRow {
    pub id: ActorId,
    pub name: Option<String>,
}

/// Row of the legacy `writers` table
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct WriterRow {
    pub id: WriterId,
    pub name: Option<String>,
}

/// Row of the legacy `movie_actors` table
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MovieActorRow {
    pub movie_id: SourceFilmId,
    pub actor_id: ActorId,
}

/// Everything read from the source store, unfiltered
#[derive(Debug, Default, Clone)]
pub struct SourceRows {
    pub movies: Vec<MovieRow>,
    pub actors: Vec<ActorRow>,
    pub writers: Vec<WriterRow>,
    pub movie_actors: Vec<MovieActorRow>,
}

/// Film after extraction: writers resolved to a filtered set of ids
#[derive(Debug, Clone, PartialEq)]
pub struct RawFilm {
    pub id: SourceFilmId,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub title: String,
    pub plot: Option<String>,
    pub imdb_rating: Option<String>,
    pub writers: BTreeSet<WriterId>,
}

/// Extractor output, input of the transformer
#[derive(Debug, Default, Clone)]
pub struct RawDataset {
    pub films: Vec<RawFilm>,
    pub actor_names: HashMap<ActorId, String>,
    pub writer_names: HashMap<WriterId, String>,
    pub film_actors: HashMap<SourceFilmId, Vec<ActorId>>,
    pub invalid_actor_ids: HashSet<ActorId>,
    pub invalid_writer_ids: HashSet<WriterId>,
}

/// Capacity in which a person is credited on a film
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Director,
    Actor,
    Writer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Director => "director",
            Role::Actor => "actor",
            Role::Writer => "writer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `film_work` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Film {
    pub id: Uuid,
    pub title: String,
    pub plot: Option<String>,
    pub rating: Option<Decimal>,
    pub director: Option<String>,
}

/// `genre` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
}

/// `genre_film_work` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilmGenre {
    pub id: Uuid,
    pub film_work_id: Uuid,
    pub genre_id: Uuid,
}

/// `person` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    pub id: Uuid,
    pub full_name: String,
}

/// `person_film_work` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilmPerson {
    pub id: Uuid,
    pub film_work_id: Uuid,
    pub person_id: Uuid,
    pub role: Role,
}

/// Transformer output, handed to the loader in full
#[derive(Debug, Default, Clone, Serialize)]
pub struct NormalizedDataset {
    pub films: Vec<Film>,
    pub genres: Vec<Genre>,
    pub film_genres: Vec<FilmGenre>,
    pub persons: Vec<Person>,
    pub film_persons: Vec<FilmPerson>,
}

impl std::fmt::Display for NormalizedDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "films: {}, genres: {}, film_genres: {}, persons: {}, film_persons: {}",
            self.films.len(),
            self.genres.len(),
            self.film_genres.len(),
            self.persons.len(),
            self.film_persons.len()
        )
    }
}
