// src/repositories/mod.rs

pub mod memory;
pub mod postgres;

pub use memory::InMemoryBlacklistRepository;
pub use postgres::PostgresBlacklistRepository;
pub use tweetwatch_common::traits::repository_traits::BlacklistRepository;
