// src/repositories/memory/mod.rs

pub mod blacklist;

pub use blacklist::InMemoryBlacklistRepository;
