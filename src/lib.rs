//! Migrates the legacy SQLite movie catalog into the normalized PostgreSQL schema

pub mod migration;
