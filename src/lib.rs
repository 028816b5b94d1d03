//! Core library surface for the library catalog.
//!
//! `db` owns the SQLite schema and queries, `catalog` wraps them in a
//! transactional service, and `ui` holds the list and dialog controllers a
//! front end drives. The `bin` target is one such front end.
pub mod catalog;
pub mod db;
pub mod error;
pub mod models;
pub mod ui;

pub use catalog::Catalog;
pub use error::{CatalogError, Result};

/// The domain types other layers manipulate.
pub use models::{Author, Book, BookFilter, BookListing, Genre, NewAuthor, NewBook, NewGenre};

pub use ui::{BookDialog, BookEditor, Confirm, ListCommand, ListController};
