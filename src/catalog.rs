//! The catalog service: the one owner of the SQLite connection. Reads go
//! straight to the `db` helpers; every write runs in its own transaction so a
//! failure part way through leaves the store exactly as it was.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::db;
use crate::error::{CatalogError, Result};
use crate::models::{Author, Book, BookFilter, BookListing, Genre, NewAuthor, NewBook, NewGenre};

#[derive(Debug)]
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Wrap a connection whose schema is already in place (see
    /// [`db::open_database`] and [`db::open_in_memory`]).
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Load the reference dataset if the store is empty.
    pub fn seed_if_empty(&mut self) -> Result<bool> {
        db::seed_if_empty(&mut self.conn)
    }

    /// Books matching `filter`, sorted by title.
    pub fn query(&self, filter: &BookFilter) -> Result<Vec<BookListing>> {
        let books = db::fetch_books(&self.conn, filter)?;
        debug!(count = books.len(), "book query returned");
        Ok(books)
    }

    pub fn find_book(&self, id: i64) -> Result<Book> {
        db::fetch_book(&self.conn, id)?.ok_or_else(|| CatalogError::not_found("book", id))
    }

    pub fn book_count(&self) -> Result<i64> {
        db::count_books(&self.conn)
    }

    /// Persist a new book and return it with the id SQLite assigned.
    pub fn add_book(&mut self, book: NewBook) -> Result<Book> {
        let tx = self.conn.transaction()?;
        let stored = db::insert_book(&tx, &book)?;
        tx.commit()?;
        info!(id = stored.id, title = %stored.title, "added book");
        Ok(stored)
    }

    /// Load book `id`, let `mutate` change its fields, and write it back.
    ///
    /// If `mutate` fails or the write is rejected nothing is stored. The id is
    /// not writable: whatever the mutator does to `book.id`, the original row
    /// is the one updated.
    pub fn update_book<F>(&mut self, id: i64, mutate: F) -> Result<Book>
    where
        F: FnOnce(&mut Book) -> Result<()>,
    {
        let tx = self.conn.transaction()?;
        let mut book =
            db::fetch_book(&tx, id)?.ok_or_else(|| CatalogError::not_found("book", id))?;

        mutate(&mut book)?;
        book.id = id;

        db::update_book(&tx, &book)?;
        tx.commit()?;
        info!(id, title = %book.title, "updated book");
        Ok(book)
    }

    pub fn delete_book(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        db::delete_book(&tx, id)?;
        tx.commit()?;
        info!(id, "deleted book");
        Ok(())
    }

    pub fn authors(&self) -> Result<Vec<Author>> {
        db::fetch_authors(&self.conn)
    }

    pub fn author(&self, id: i64) -> Result<Author> {
        db::fetch_author(&self.conn, id)?.ok_or_else(|| CatalogError::not_found("author", id))
    }

    pub fn add_author(&mut self, author: NewAuthor) -> Result<Author> {
        let tx = self.conn.transaction()?;
        let stored = db::create_author(&tx, &author)?;
        tx.commit()?;
        info!(id = stored.id, name = %stored, "added author");
        Ok(stored)
    }

    /// Remove an author together with all of their books.
    pub fn delete_author(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        db::delete_author(&tx, id)?;
        tx.commit()?;
        info!(id, "deleted author and their books");
        Ok(())
    }

    pub fn genres(&self) -> Result<Vec<Genre>> {
        db::fetch_genres(&self.conn)
    }

    pub fn genre(&self, id: i64) -> Result<Genre> {
        db::fetch_genre(&self.conn, id)?.ok_or_else(|| CatalogError::not_found("genre", id))
    }

    pub fn add_genre(&mut self, genre: NewGenre) -> Result<Genre> {
        let tx = self.conn.transaction()?;
        let stored = db::create_genre(&tx, &genre)?;
        tx.commit()?;
        info!(id = stored.id, name = %stored.name, "added genre");
        Ok(stored)
    }

    /// Remove a genre together with all of its books.
    pub fn delete_genre(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        db::delete_genre(&tx, id)?;
        tx.commit()?;
        info!(id, "deleted genre and its books");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Catalog {
        let mut catalog = Catalog::new(db::open_in_memory().unwrap());
        catalog.seed_if_empty().unwrap();
        catalog
    }

    fn author_id(catalog: &Catalog, last_name: &str) -> i64 {
        catalog
            .authors()
            .unwrap()
            .into_iter()
            .find(|a| a.last_name == last_name)
            .unwrap()
            .id
    }

    #[test]
    fn test_add_assigns_id_and_returns_stored_book() {
        let mut catalog = seeded();
        let author_id = author_id(&catalog, "Пушкин");
        let genre_id = catalog.genres().unwrap()[0].id;

        let stored = catalog
            .add_book(NewBook {
                title: "Капитанская дочка".into(),
                isbn: "978-5-17-000000-1".into(),
                publish_year: 1836,
                quantity_in_stock: 2,
                author_id,
                genre_id,
            })
            .unwrap();

        assert!(stored.id > 0);
        assert_eq!(catalog.find_book(stored.id).unwrap(), stored);
        assert_eq!(catalog.book_count().unwrap(), 9);
    }

    #[test]
    fn test_update_applies_mutator() {
        let mut catalog = seeded();
        let id = catalog.query(&BookFilter::default()).unwrap()[0].id();

        let updated = catalog
            .update_book(id, |book| {
                book.quantity_in_stock = 0;
                book.id = -1;
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.id, id);
        assert_eq!(catalog.find_book(id).unwrap().quantity_in_stock, 0);
    }

    #[test]
    fn test_update_missing_book_is_not_found() {
        let mut catalog = seeded();
        let err = catalog.update_book(999, |_| Ok(())).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "book", id: 999 }));
    }

    #[test]
    fn test_failed_update_leaves_row_unchanged() {
        let mut catalog = seeded();
        let id = catalog.query(&BookFilter::default()).unwrap()[0].id();
        let before = catalog.find_book(id).unwrap();

        let err = catalog
            .update_book(id, |book| {
                book.title = String::new();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, CatalogError::ConstraintViolation(_)));

        let err = catalog
            .update_book(id, |book| {
                book.title = "Изменено".into();
                Err(CatalogError::validation("nope"))
            })
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        assert_eq!(catalog.find_book(id).unwrap(), before);
    }

    #[test]
    fn test_delete_book() {
        let mut catalog = seeded();
        let id = catalog.query(&BookFilter::default()).unwrap()[0].id();

        catalog.delete_book(id).unwrap();
        assert_eq!(catalog.book_count().unwrap(), 7);
        assert!(matches!(
            catalog.delete_book(id),
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[test]
    fn test_new_author_and_genre_accept_books() {
        let mut catalog = Catalog::new(db::open_in_memory().unwrap());
        let author = catalog
            .add_author(NewAuthor {
                first_name: "Антон".into(),
                last_name: "Чехов".into(),
                birth_date: None,
                country: "Россия".into(),
            })
            .unwrap();
        let genre = catalog
            .add_genre(NewGenre {
                name: "Пьеса".into(),
                description: None,
            })
            .unwrap();

        catalog
            .add_book(NewBook {
                title: "Вишнёвый сад".into(),
                isbn: "978-5-00-000000-0".into(),
                publish_year: 1904,
                quantity_in_stock: 1,
                author_id: author.id,
                genre_id: genre.id,
            })
            .unwrap();

        let listing = &catalog.query(&BookFilter::default()).unwrap()[0];
        assert_eq!(listing.author_name, "Антон Чехов");
        assert_eq!(listing.genre_name, "Пьеса");
        assert_eq!(catalog.author(author.id).unwrap(), author);
    }

    #[test]
    fn test_delete_author_cascades_to_books() {
        let mut catalog = seeded();
        let tolstoy = author_id(&catalog, "Толстой");

        catalog.delete_author(tolstoy).unwrap();

        let remaining = catalog.query(&BookFilter::default()).unwrap();
        assert_eq!(remaining.len(), 6);
        assert!(remaining.iter().all(|l| l.book.author_id != tolstoy));
        let filter = BookFilter {
            author_id: Some(tolstoy),
            ..Default::default()
        };
        assert!(catalog.query(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_delete_genre_cascades_to_books() {
        let mut catalog = seeded();
        let dystopia = catalog
            .genres()
            .unwrap()
            .into_iter()
            .find(|g| g.name == "Антиутопия")
            .unwrap();

        catalog.delete_genre(dystopia.id).unwrap();

        let titles: Vec<_> = catalog
            .query(&BookFilter::default())
            .unwrap()
            .into_iter()
            .map(|l| l.book.title)
            .collect();
        assert!(!titles.iter().any(|t| t == "1984" || t == "Скотный двор"));
        assert_eq!(titles.len(), 6);
        assert!(matches!(
            catalog.genre(dystopia.id),
            Err(CatalogError::NotFound { entity: "genre", .. })
        ));
    }
}
