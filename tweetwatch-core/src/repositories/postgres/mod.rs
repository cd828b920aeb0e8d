// src/repositories/postgres/mod.rs

pub mod blacklist;

pub use blacklist::PostgresBlacklistRepository;
