//! Extract functions - read the legacy SQLite catalog into a RawDataset

use crate::migration::error::Result;
use crate::migration::types::{
    ActorRow, MovieActorRow, MovieRow, RawDataset, RawFilm, SourceRows, WriterRow,
};
use crate::migration::utils::{decode_writers, is_sentinel};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Read-only connection options for the legacy database file.
/// The path is passed as-is, so `?`, `#` and `%` in file names are fine.
pub fn source_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new().filename(path).read_only(true)
}

/// Read every row of the four legacy tables, no filtering
pub async fn fetch_source_rows(db: &SqlitePool) -> Result<SourceRows> {
    let actors = sqlx::query_as::<_, ActorRow>(
        "SELECT DISTINCT CAST(id AS INTEGER) AS id, name FROM actors",
    )
    .fetch_all(db)
    .await?;
    debug!("Fetched {} actor rows", actors.len());

    let writers = sqlx::query_as::<_, WriterRow>("SELECT DISTINCT id, name FROM writers")
        .fetch_all(db)
        .await?;
    debug!("Fetched {} writer rows", writers.len());

    let movie_actors = sqlx::query_as::<_, MovieActorRow>(
        "SELECT DISTINCT movie_id, CAST(actor_id AS INTEGER) AS actor_id FROM movie_actors",
    )
    .fetch_all(db)
    .await?;
    debug!("Fetched {} movie_actors rows", movie_actors.len());

    let movies = sqlx::query_as::<_, MovieRow>(
        r#"
        SELECT DISTINCT
            id, genre, director, writer, title, plot,
            CAST(imdb_rating AS TEXT) AS imdb_rating, writers
        FROM movies
        "#,
    )
    .fetch_all(db)
    .await?;
    debug!("Fetched {} movie rows", movies.len());

    Ok(SourceRows {
        movies,
        actors,
        writers,
        movie_actors,
    })
}

/// Clean raw source rows into a RawDataset.
/// Pure function - invalid ids are collected before films are processed.
pub fn assemble(rows: SourceRows) -> Result<RawDataset> {
    let mut dataset = RawDataset::default();

    for actor in rows.actors {
        match actor.name {
            Some(name) if !is_sentinel(&name) => {
                dataset.actor_names.insert(actor.id, name);
            }
            _ => {
                dataset.invalid_actor_ids.insert(actor.id);
            }
        }
    }

    for writer in rows.writers {
        match writer.name {
            Some(name) if !is_sentinel(&name) => {
                dataset.writer_names.insert(writer.id, name);
            }
            _ => {
                dataset.invalid_writer_ids.insert(writer.id);
            }
        }
    }

    for link in rows.movie_actors {
        let actors = dataset.film_actors.entry(link.movie_id).or_default();
        if !dataset.invalid_actor_ids.contains(&link.actor_id) {
            actors.push(link.actor_id);
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    for movie in rows.movies {
        if !seen.insert(movie.id.clone()) {
            warn!("Dropping duplicate source row for film {}", movie.id);
            continue;
        }

        let writers: BTreeSet<_> =
            decode_writers(&movie.id, movie.writers.as_deref(), movie.writer.as_deref())?
                .into_iter()
                .filter(|id| !dataset.invalid_writer_ids.contains(id))
                .collect();

        dataset.films.push(RawFilm {
            id: movie.id,
            genre: movie.genre,
            director: movie.director,
            title: movie.title,
            plot: movie.plot,
            imdb_rating: movie.imdb_rating,
            writers,
        });
    }

    info!(
        "Assembled {} films, {} actors ({} invalid), {} writers ({} invalid)",
        dataset.films.len(),
        dataset.actor_names.len(),
        dataset.invalid_actor_ids.len(),
        dataset.writer_names.len(),
        dataset.invalid_writer_ids.len()
    );

    Ok(dataset)
}

/// Fetch and assemble in one go
pub async fn extract(db: &SqlitePool) -> Result<RawDataset> {
    info!("Extracting legacy catalog");
    let rows = fetch_source_rows(db).await?;
    assemble(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::error::MigrationError;
    use sqlx::sqlite::SqlitePoolOptions;

    fn movie(id: &str, writers: Option<&str>, writer: Option<&str>) -> MovieRow {
        MovieRow {
            id: id.to_string(),
            genre: Some("Drama".to_string()),
            director: Some("N/A".to_string()),
            writer: writer.map(str::to_string),
            title: format!("Film {}", id),
            plot: None,
            imdb_rating: Some("7.5".to_string()),
            writers: writers.map(str::to_string),
        }
    }

    fn writer(id: &str, name: &str) -> WriterRow {
        WriterRow {
            id: id.to_string(),
            name: Some(name.to_string()),
        }
    }

    fn actor(id: i64, name: Option<&str>) -> ActorRow {
        ActorRow {
            id,
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_assemble_filters_invalid_ids() {
        let rows = SourceRows {
            movies: vec![movie("tt1", Some(r#"[{"id": "w1"}, {"id": "w2"}]"#), None)],
            actors: vec![actor(1, Some("Mark Hamill")), actor(2, Some("N/A")), actor(3, None)],
            writers: vec![writer("w1", "George Lucas"), writer("w2", "")],
            movie_actors: vec![
                MovieActorRow { movie_id: "tt1".to_string(), actor_id: 1 },
                MovieActorRow { movie_id: "tt1".to_string(), actor_id: 2 },
                MovieActorRow { movie_id: "tt1".to_string(), actor_id: 3 },
            ],
        };

        let dataset = assemble(rows).unwrap();

        assert_eq!(dataset.actor_names.len(), 1);
        assert!(dataset.invalid_actor_ids.contains(&2));
        assert!(dataset.invalid_actor_ids.contains(&3));
        assert!(dataset.invalid_writer_ids.contains("w2"));
        assert_eq!(dataset.film_actors["tt1"], vec![1]);

        let film = &dataset.films[0];
        assert_eq!(film.writers.iter().collect::<Vec<_>>(), vec!["w1"]);
    }

    #[test]
    fn test_assemble_dedups_writers_and_films() {
        let rows = SourceRows {
            movies: vec![
                movie("tt1", Some(r#"[{"id": "w1"}, {"id": "w1"}]"#), None),
                movie("tt1", None, Some("w1")),
                movie("tt2", None, Some("w1")),
            ],
            writers: vec![writer("w1", "George Lucas")],
            ..Default::default()
        };

        let dataset = assemble(rows).unwrap();

        assert_eq!(dataset.films.len(), 2);
        assert_eq!(dataset.films[0].writers.len(), 1);
        assert_eq!(dataset.films[1].id, "tt2");
        assert!(dataset.films[1].writers.contains("w1"));
    }

    #[test]
    fn test_assemble_rejects_malformed_writers() {
        let rows = SourceRows {
            movies: vec![movie("tt9", Some("not json"), Some("w1"))],
            ..Default::default()
        };

        match assemble(rows) {
            Err(MigrationError::MalformedSourceData { film_id, .. }) => assert_eq!(film_id, "tt9"),
            other => panic!("Expected MalformedSourceData, got {:?}", other),
        }
    }

    async fn seed(pool: &SqlitePool) {
        let statements = [
            "CREATE TABLE movies (id TEXT, genre TEXT, director TEXT, writer TEXT, title TEXT, plot TEXT, ratings TEXT, imdb_rating TEXT, writers TEXT)",
            "CREATE TABLE actors (id INTEGER, name TEXT)",
            "CREATE TABLE writers (id TEXT, name TEXT)",
            "CREATE TABLE movie_actors (movie_id TEXT, actor_id TEXT)",
            r#"INSERT INTO movies VALUES ('tt1', 'Action, Adventure', 'George Lucas', '', 'Star Wars', 'A long time ago', NULL, '8.6', '[{"id": "w1"}, {"id": "w1"}]')"#,
            // exact duplicate, removed by DISTINCT
            r#"INSERT INTO movies VALUES ('tt1', 'Action, Adventure', 'George Lucas', '', 'Star Wars', 'A long time ago', NULL, '8.6', '[{"id": "w1"}, {"id": "w1"}]')"#,
            "INSERT INTO movies VALUES ('tt2', 'N/A', 'N/A', 'w2', 'Lost Film', 'N/A', NULL, 'N/A', '')",
            "INSERT INTO actors VALUES (1, 'Mark Hamill'), (2, 'N/A')",
            "INSERT INTO writers VALUES ('w1', 'George Lucas'), ('w2', 'N/A')",
            "INSERT INTO movie_actors VALUES ('tt1', '1'), ('tt1', '2'), ('tt2', '1')",
        ];
        for statement in statements {
            sqlx::query(statement).execute(pool).await.unwrap();
        }
    }

    async fn seeded_pool() -> SqlitePool {
        // One connection, otherwise every connection gets its own in-memory db
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        seed(&pool).await;
        pool
    }

    #[tokio::test]
    async fn test_extract_from_sqlite() {
        let pool = seeded_pool().await;

        let dataset = extract(&pool).await.unwrap();

        assert_eq!(dataset.films.len(), 2);
        let star_wars = dataset.films.iter().find(|f| f.id == "tt1").unwrap();
        assert_eq!(star_wars.title, "Star Wars");
        assert_eq!(star_wars.imdb_rating.as_deref(), Some("8.6"));
        assert_eq!(star_wars.writers.len(), 1);

        let lost = dataset.films.iter().find(|f| f.id == "tt2").unwrap();
        assert!(lost.writers.is_empty());

        assert_eq!(dataset.film_actors["tt1"], vec![1]);
        assert_eq!(dataset.film_actors["tt2"], vec![1]);
        assert!(dataset.invalid_actor_ids.contains(&2));
        assert!(dataset.invalid_writer_ids.contains("w2"));
    }

    #[tokio::test]
    async fn test_extract_from_file_with_url_characters_in_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies?v=1#old%20copy.sqlite");

        let writable = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().filename(&path).create_if_missing(true))
            .await
            .unwrap();
        seed(&writable).await;
        writable.close().await;
        assert!(path.exists());

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(source_options(&path))
            .await
            .unwrap();

        let dataset = extract(&pool).await.unwrap();
        assert_eq!(dataset.films.len(), 2);

        // read-only
        assert!(sqlx::query("DELETE FROM movies").execute(&pool).await.is_err());
    }
}
