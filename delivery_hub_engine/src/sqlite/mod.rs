//! SQLite backend for the Delivery Hub engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
