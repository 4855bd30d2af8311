//! Transform functions - normalize the legacy catalog into the new schema
//!
//! Everything here is pure: the genre and person caches live inside a single
//! `transform` call and are dropped with it.

use crate::migration::error::{MigrationError, ReferenceKind, Result};
use crate::migration::types::{
    Film, FilmGenre, FilmPerson, Genre, NormalizedDataset, Person, RawDataset, RawFilm, Role,
};
use crate::migration::utils::{is_sentinel, none_if_sentinel, split_names};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

/// Replace sentinel values with `None` (or an empty writer set).
/// Title is left untouched.
pub fn clean_film(film: RawFilm) -> RawFilm {
    RawFilm {
        id: film.id,
        genre: none_if_sentinel(film.genre),
        director: none_if_sentinel(film.director),
        title: film.title,
        plot: none_if_sentinel(film.plot),
        imdb_rating: none_if_sentinel(film.imdb_rating),
        writers: film.writers.into_iter().filter(|w| !is_sentinel(w)).collect(),
    }
}

/// Parse a cleaned rating. Anything that is not a number is rejected.
fn parse_rating(film_id: &str, rating: Option<&str>) -> Result<Option<Decimal>> {
    rating
        .map(|r| {
            r.trim()
                .parse::<Decimal>()
                .map_err(|e| MigrationError::MalformedSourceData {
                    film_id: film_id.to_string(),
                    field: "imdb_rating",
                    reason: format!("{:?} is not a number: {}", r, e),
                })
        })
        .transpose()
}

/// Genre name -> id cache, one Genre per distinct name
#[derive(Default)]
struct GenreIndex {
    ids: HashMap<String, Uuid>,
    genres: Vec<Genre>,
}

impl GenreIndex {
    fn resolve(&mut self, name: &str) -> Uuid {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }

        let genre = Genre {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        debug!("New genre: {}", genre.name);
        self.ids.insert(genre.name.clone(), genre.id);
        let id = genre.id;
        self.genres.push(genre);
        id
    }
}

/// Everything one full name was credited for, per film
struct PersonCredits {
    full_name: String,
    films: Vec<(Uuid, Vec<Role>)>,
}

/// Full name -> credits, in first-seen order
#[derive(Default)]
struct PersonIndex {
    positions: HashMap<String, usize>,
    credits: Vec<PersonCredits>,
}

impl PersonIndex {
    fn credit(&mut self, full_name: &str, film_id: Uuid, role: Role) {
        let position = match self.positions.get(full_name) {
            Some(&position) => position,
            None => {
                self.credits.push(PersonCredits {
                    full_name: full_name.to_string(),
                    films: Vec::new(),
                });
                let position = self.credits.len() - 1;
                self.positions.insert(full_name.to_string(), position);
                position
            }
        };

        // Films are processed one at a time, so the current film can only be last
        let person = &mut self.credits[position];
        if let Some((id, roles)) = person.films.last_mut() {
            if *id == film_id {
                roles.push(role);
                return;
            }
        }
        person.films.push((film_id, vec![role]));
    }

    /// One Person per name, then one edge per recorded role (repeats kept)
    fn materialize(self, persons: &mut Vec<Person>, edges: &mut Vec<FilmPerson>) {
        for credits in self.credits {
            let person = Person {
                id: Uuid::new_v4(),
                full_name: credits.full_name,
            };

            for (film_work_id, roles) in credits.films {
                for role in roles {
                    edges.push(FilmPerson {
                        id: Uuid::new_v4(),
                        film_work_id,
                        person_id: person.id,
                        role,
                    });
                }
            }

            persons.push(person);
        }
    }
}

/// Normalize a RawDataset.
///
/// Fails on a rating that is not a number, or on an actor/writer id that has
/// no name entry (the extraction result is inconsistent in that case).
pub fn transform(raw: RawDataset) -> Result<NormalizedDataset> {
    let RawDataset {
        films,
        actor_names,
        writer_names,
        film_actors,
        ..
    } = raw;

    info!("Transforming {} films", films.len());

    let mut normalized = NormalizedDataset::default();
    let mut genres = GenreIndex::default();
    let mut people = PersonIndex::default();

    for raw_film in films {
        let film = clean_film(raw_film);

        let film_work = Film {
            id: Uuid::new_v4(),
            title: film.title.clone(),
            plot: film.plot.clone(),
            rating: parse_rating(&film.id, film.imdb_rating.as_deref())?,
            director: film.director.clone(),
        };
        let film_work_id = film_work.id;
        normalized.films.push(film_work);

        if let Some(genre) = &film.genre {
            let mut seen = HashSet::new();
            for name in split_names(genre) {
                if !seen.insert(name.clone()) {
                    continue;
                }
                let genre_id = genres.resolve(&name);
                normalized.film_genres.push(FilmGenre {
                    id: Uuid::new_v4(),
                    film_work_id,
                    genre_id,
                });
            }
        }

        if let Some(director) = &film.director {
            for name in split_names(director) {
                people.credit(&name, film_work_id, Role::Director);
            }
        }

        for actor_id in film_actors.get(&film.id).into_iter().flatten() {
            let name = actor_names
                .get(actor_id)
                .ok_or_else(|| MigrationError::DanglingReference {
                    kind: ReferenceKind::Actor,
                    id: actor_id.to_string(),
                    film_id: film.id.clone(),
                })?;
            people.credit(name, film_work_id, Role::Actor);
        }

        for writer_id in &film.writers {
            let name = writer_names
                .get(writer_id)
                .ok_or_else(|| MigrationError::DanglingReference {
                    kind: ReferenceKind::Writer,
                    id: writer_id.clone(),
                    film_id: film.id.clone(),
                })?;
            people.credit(name, film_work_id, Role::Writer);
        }
    }

    normalized.genres = genres.genres;
    people.materialize(&mut normalized.persons, &mut normalized.film_persons);

    info!("Transform complete: {}", normalized);

    Ok(normalized)
}
