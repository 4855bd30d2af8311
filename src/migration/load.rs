//! Load functions - bulk insert the normalized dataset into PostgreSQL

use crate::migration::error::{MigrationError, Result};
use crate::migration::report::LoadStats;
use crate::migration::types::{Film, FilmGenre, FilmPerson, Genre, NormalizedDataset, Person};
use sqlx::query_builder::Separated;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

/// PostgreSQL caps a single statement at 65535 bind parameters
const MAX_BIND_PARAMS: usize = 65_535;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A target entity with a fixed table and column order
pub trait TargetRow {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Push one bind per column, in `COLUMNS` order
    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>);
}

impl TargetRow for Film {
    const TABLE: &'static str = "film_work";
    const COLUMNS: &'static [&'static str] = &["id", "title", "plot", "rating", "director"];

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.title.clone())
            .push_bind(self.plot.clone())
            .push_bind(self.rating)
            .push_bind(self.director.clone());
    }
}

impl TargetRow for Genre {
    const TABLE: &'static str = "genre";
    const COLUMNS: &'static [&'static str] = &["id", "name"];

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.id).push_bind(self.name.clone());
    }
}

impl TargetRow for Person {
    const TABLE: &'static str = "person";
    const COLUMNS: &'static [&'static str] = &["id", "full_name"];

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.id).push_bind(self.full_name.clone());
    }
}

impl TargetRow for FilmGenre {
    const TABLE: &'static str = "genre_film_work";
    const COLUMNS: &'static [&'static str] = &["id", "film_work_id", "genre_id"];

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.film_work_id)
            .push_bind(self.genre_id);
    }
}

impl TargetRow for FilmPerson {
    const TABLE: &'static str = "person_film_work";
    const COLUMNS: &'static [&'static str] = &["id", "film_work_id", "person_id", "role"];

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.film_work_id)
            .push_bind(self.person_id)
            .push_bind(self.role.as_str());
    }
}

/// Loader settings
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub batch_size: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Rows per INSERT for a table, never over the bind parameter limit
pub fn rows_per_statement<T: TargetRow>(batch_size: usize) -> usize {
    let cap = MAX_BIND_PARAMS / T::COLUMNS.len();
    batch_size.clamp(1, cap)
}

/// `INSERT INTO <table> (<columns>) ` prefix for a table
pub fn insert_prefix<T: TargetRow>() -> String {
    format!("INSERT INTO {} ({}) ", T::TABLE, T::COLUMNS.join(", "))
}

/// Write every table of the dataset, entity tables before junction tables.
///
/// All tables share one transaction: it is committed only after the last
/// table succeeds, so a failed run leaves nothing behind.
pub async fn load(
    db: &PgPool,
    data: &NormalizedDataset,
    options: &LoadOptions,
) -> Result<LoadStats> {
    info!("Loading normalized dataset: {}", data);

    let mut tx = db.begin().await.map_err(MigrationError::Transaction)?;

    let stats = LoadStats {
        films: insert_table(&mut tx, &data.films, options).await?,
        genres: insert_table(&mut tx, &data.genres, options).await?,
        persons: insert_table(&mut tx, &data.persons, options).await?,
        film_genres: insert_table(&mut tx, &data.film_genres, options).await?,
        film_persons: insert_table(&mut tx, &data.film_persons, options).await?,
    };

    tx.commit().await.map_err(MigrationError::Transaction)?;
    info!("Load complete: {}", stats);

    Ok(stats)
}

/// Insert all rows of one table on the run's connection, in chunks.
/// Does not commit.
async fn insert_table<T: TargetRow>(
    conn: &mut PgConnection,
    rows: &[T],
    options: &LoadOptions,
) -> Result<usize> {
    if rows.is_empty() {
        debug!("No rows for {}, skipping", T::TABLE);
        return Ok(0);
    }

    let failure = |source: sqlx::Error| MigrationError::WriteFailure {
        table: T::TABLE,
        rows: rows.len(),
        source,
    };

    let chunk_size = rows_per_statement::<T>(options.batch_size);

    for chunk in rows.chunks(chunk_size) {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(insert_prefix::<T>());
        qb.push_values(chunk, |mut b, row| row.bind_row(&mut b));
        qb.build().execute(&mut *conn).await.map_err(failure)?;
        debug!("Inserted {} rows into {}", chunk.len(), T::TABLE);
    }

    info!("✓ {}: {} rows", T::TABLE, rows.len());

    Ok(rows.len())
}

/// Write the normalized dataset as pretty JSON, for inspection before a real load
pub fn dump_json(path: &Path, data: &NormalizedDataset) -> Result<()> {
    info!("Dumping normalized dataset to {:?}", path);
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, data)?;
    Ok(())
}
