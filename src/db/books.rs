use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{map_write_error, CatalogError, Result};
use crate::models::{Book, BookFilter, BookListing, NewBook};

const BOOK_COLUMNS: &str =
    "b.id, b.title, b.isbn, b.publish_year, b.quantity_in_stock, b.author_id, b.genre_id";

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        isbn: row.get(2)?,
        publish_year: row.get(3)?,
        quantity_in_stock: row.get(4)?,
        author_id: row.get(5)?,
        genre_id: row.get(6)?,
    })
}

/// Build the listing query for a filter. Each present criterion adds one
/// predicate; the search text becomes a single OR over title and ISBN.
/// `instr` keeps the match case-sensitive, unlike `LIKE`.
fn compose_listing_query(filter: &BookFilter) -> (String, Vec<Value>) {
    let mut sql = format!(
        "SELECT {BOOK_COLUMNS}, a.first_name || ' ' || a.last_name, g.name
         FROM books b
         INNER JOIN authors a ON a.id = b.author_id
         INNER JOIN genres g ON g.id = b.genre_id"
    );
    let mut predicates = Vec::new();
    let mut values = Vec::new();

    if let Some(author_id) = filter.author_id {
        values.push(Value::Integer(author_id));
        predicates.push(format!("b.author_id = ?{}", values.len()));
    }

    if let Some(genre_id) = filter.genre_id {
        values.push(Value::Integer(genre_id));
        predicates.push(format!("b.genre_id = ?{}", values.len()));
    }

    if let Some(term) = filter.search_term() {
        values.push(Value::Text(term.to_string()));
        let n = values.len();
        predicates.push(format!("(instr(b.title, ?{n}) > 0 OR instr(b.isbn, ?{n}) > 0)"));
    }

    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }
    // BINARY collation orders UTF-8 text by code point; id keeps ties stable.
    sql.push_str(" ORDER BY b.title, b.id");

    (sql, values)
}

/// Books matching `filter`, sorted by title, each joined with its author's
/// display name and its genre name.
pub fn fetch_books(conn: &Connection, filter: &BookFilter) -> Result<Vec<BookListing>> {
    let (sql, values) = compose_listing_query(filter);
    debug!(?filter, "querying books");

    let mut stmt = conn.prepare(&sql)?;
    let listings = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            Ok(BookListing {
                book: book_from_row(row)?,
                author_name: row.get(7)?,
                genre_name: row.get(8)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(listings)
}

/// The stored row for `id`, or `None` so callers can pick their own error.
pub fn fetch_book(conn: &Connection, id: i64) -> Result<Option<Book>> {
    let book = conn
        .query_row(
            &format!("SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = ?1"),
            [id],
            book_from_row,
        )
        .optional()?;
    Ok(book)
}

/// Insert a new book. The id comes from SQLite.
pub fn insert_book(conn: &Connection, book: &NewBook) -> Result<Book> {
    conn.execute(
        "INSERT INTO books (title, isbn, publish_year, quantity_in_stock, author_id, genre_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            book.title,
            book.isbn,
            book.publish_year,
            book.quantity_in_stock,
            book.author_id,
            book.genre_id
        ],
    )
    .map_err(map_write_error)?;

    Ok(Book {
        id: conn.last_insert_rowid(),
        title: book.title.clone(),
        isbn: book.isbn.clone(),
        publish_year: book.publish_year,
        quantity_in_stock: book.quantity_in_stock,
        author_id: book.author_id,
        genre_id: book.genre_id,
    })
}

/// Write every editable field of `book` to the row with the same id.
pub fn update_book(conn: &Connection, book: &Book) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE books
             SET title = ?1, isbn = ?2, publish_year = ?3, quantity_in_stock = ?4,
                 author_id = ?5, genre_id = ?6
             WHERE id = ?7",
            params![
                book.title,
                book.isbn,
                book.publish_year,
                book.quantity_in_stock,
                book.author_id,
                book.genre_id,
                book.id
            ],
        )
        .map_err(map_write_error)?;

    if updated == 0 {
        Err(CatalogError::not_found("book", book.id))
    } else {
        Ok(())
    }
}

/// Delete one book. A missing id is `NotFound`, not a silent no-op.
pub fn delete_book(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM books WHERE id = ?1", [id])
        .map_err(map_write_error)?;

    if deleted == 0 {
        Err(CatalogError::not_found("book", id))
    } else {
        Ok(())
    }
}

/// Number of stored books, regardless of any filter.
pub fn count_books(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_author, create_genre, open_in_memory};
    use crate::models::{NewAuthor, NewGenre};

    struct Fixture {
        conn: Connection,
        author_id: i64,
        genre_id: i64,
    }

    fn fixture() -> Fixture {
        let conn = open_in_memory().unwrap();
        let author = create_author(
            &conn,
            &NewAuthor {
                first_name: "Лев".into(),
                last_name: "Толстой".into(),
                birth_date: None,
                country: "Россия".into(),
            },
        )
        .unwrap();
        let genre = create_genre(
            &conn,
            &NewGenre {
                name: "Роман".into(),
                description: None,
            },
        )
        .unwrap();
        Fixture {
            conn,
            author_id: author.id,
            genre_id: genre.id,
        }
    }

    fn new_book(f: &Fixture, title: &str, isbn: &str) -> NewBook {
        NewBook {
            title: title.into(),
            isbn: isbn.into(),
            publish_year: 1869,
            quantity_in_stock: 1,
            author_id: f.author_id,
            genre_id: f.genre_id,
        }
    }

    fn titles(listings: &[BookListing]) -> Vec<&str> {
        listings.iter().map(|l| l.title()).collect()
    }

    #[test]
    fn test_unfiltered_query_sorted_by_title() {
        let f = fixture();
        insert_book(&f.conn, &new_book(&f, "Война и мир", "1")).unwrap();
        insert_book(&f.conn, &new_book(&f, "1984", "2")).unwrap();
        insert_book(&f.conn, &new_book(&f, "Анна Каренина", "3")).unwrap();

        let listings = fetch_books(&f.conn, &BookFilter::default()).unwrap();
        assert_eq!(titles(&listings), vec!["1984", "Анна Каренина", "Война и мир"]);
        assert_eq!(listings[0].author_name, "Лев Толстой");
        assert_eq!(listings[0].genre_name, "Роман");
    }

    #[test]
    fn test_equal_titles_keep_insertion_order() {
        let f = fixture();
        let first = insert_book(&f.conn, &new_book(&f, "Повести", "A")).unwrap();
        let second = insert_book(&f.conn, &new_book(&f, "Повести", "B")).unwrap();

        let ids: Vec<_> = fetch_books(&f.conn, &BookFilter::default())
            .unwrap()
            .iter()
            .map(|l| l.id())
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn test_search_is_case_sensitive_substring_on_title_or_isbn() {
        let f = fixture();
        insert_book(&f.conn, &new_book(&f, "Война и мир", "978-5-17-084879-3")).unwrap();
        insert_book(&f.conn, &new_book(&f, "Анна Каренина", "978-5-17-090012-5")).unwrap();

        let search = |text: &str| {
            let filter = BookFilter {
                search_text: Some(text.into()),
                ..Default::default()
            };
            fetch_books(&f.conn, &filter).unwrap()
        };

        assert_eq!(titles(&search("мир")), vec!["Война и мир"]);
        assert!(search("МИР").is_empty());
        assert_eq!(titles(&search("090012")), vec!["Анна Каренина"]);
        assert_eq!(search("978-5").len(), 2);
        assert_eq!(search("  ").len(), 2);
    }

    #[test]
    fn test_author_and_genre_predicates_combine() {
        let f = fixture();
        let other_genre = create_genre(
            &f.conn,
            &NewGenre {
                name: "Повесть".into(),
                description: None,
            },
        )
        .unwrap();
        insert_book(&f.conn, &new_book(&f, "Война и мир", "1")).unwrap();
        let mut novella = new_book(&f, "Хаджи-Мурат", "2");
        novella.genre_id = other_genre.id;
        insert_book(&f.conn, &novella).unwrap();

        let filter = BookFilter {
            author_id: Some(f.author_id),
            genre_id: Some(other_genre.id),
            search_text: None,
        };
        assert_eq!(titles(&fetch_books(&f.conn, &filter).unwrap()), vec!["Хаджи-Мурат"]);

        let filter = BookFilter {
            author_id: Some(f.author_id + 100),
            ..Default::default()
        };
        assert!(fetch_books(&f.conn, &filter).unwrap().is_empty());
    }

    #[test]
    fn test_update_and_delete_missing_book() {
        let f = fixture();
        let mut book = insert_book(&f.conn, &new_book(&f, "Война и мир", "1")).unwrap();
        book.id += 1;

        assert!(matches!(
            update_book(&f.conn, &book),
            Err(CatalogError::NotFound { entity: "book", .. })
        ));
        assert!(matches!(
            delete_book(&f.conn, book.id),
            Err(CatalogError::NotFound { entity: "book", .. })
        ));
    }

    #[test]
    fn test_missing_author_is_constraint_violation() {
        let f = fixture();
        let mut book = new_book(&f, "Война и мир", "1");
        book.author_id = f.author_id + 10;

        let err = insert_book(&f.conn, &book).unwrap_err();
        assert!(matches!(err, CatalogError::ConstraintViolation(_)));
        assert_eq!(count_books(&f.conn).unwrap(), 0);
    }

    #[test]
    fn test_field_limits_enforced_by_schema() {
        let f = fixture();
        let cases = [
            new_book(&f, "", "1"),
            new_book(&f, &"т".repeat(201), "1"),
            new_book(&f, "Война и мир", ""),
            new_book(&f, "Война и мир", &"9".repeat(21)),
            NewBook {
                publish_year: 0,
                ..new_book(&f, "Война и мир", "1")
            },
            NewBook {
                quantity_in_stock: -1,
                ..new_book(&f, "Война и мир", "1")
            },
        ];

        for book in cases {
            let err = insert_book(&f.conn, &book).unwrap_err();
            assert!(
                matches!(err, CatalogError::ConstraintViolation(_)),
                "{book:?} should be rejected, got {err:?}"
            );
        }
        assert_eq!(count_books(&f.conn).unwrap(), 0);
    }

    #[test]
    fn test_quantity_defaults_to_zero() {
        let f = fixture();
        f.conn
            .execute(
                "INSERT INTO books (title, isbn, publish_year, author_id, genre_id)
                 VALUES ('Детство', '1', 1852, ?1, ?2)",
                params![f.author_id, f.genre_id],
            )
            .unwrap();
        let book = fetch_book(&f.conn, f.conn.last_insert_rowid())
            .unwrap()
            .unwrap();
        assert_eq!(book.quantity_in_stock, 0);
    }
}
