//! Persistence module split across logical submodules. Helpers take a plain
//! `&Connection`, so they work the same on a connection or inside a
//! transaction.

mod authors;
mod books;
mod connection;
mod genres;
mod seed;

pub use authors::{count_authors, create_author, delete_author, fetch_author, fetch_authors};
pub use books::{count_books, delete_book, fetch_book, fetch_books, insert_book, update_book};
pub use connection::{default_db_path, ensure_schema, open_database, open_in_memory};
pub use genres::{create_genre, delete_genre, fetch_genre, fetch_genres};
pub use seed::seed_if_empty;
