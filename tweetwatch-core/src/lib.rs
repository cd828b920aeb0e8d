// src/lib.rs

pub mod db;
pub mod repositories;
pub mod eventbus;
pub mod services;
pub mod test_utils;

pub use db::Database;
pub use tweetwatch_common::error::Error;
pub use tweetwatch_common::models;
