//! SQLite backend for the buy order engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
