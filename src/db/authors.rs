use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{map_write_error, CatalogError, Result};
use crate::models::{Author, NewAuthor};

const AUTHOR_COLUMNS: &str = "id, first_name, last_name, birth_date, country";

fn author_from_row(row: &Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        birth_date: row.get(3)?,
        country: row.get(4)?,
    })
}

/// Every author ordered by last name, the order the filter picker shows.
pub fn fetch_authors(conn: &Connection) -> Result<Vec<Author>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {AUTHOR_COLUMNS} FROM authors ORDER BY last_name, first_name, id"
    ))?;

    let authors = stmt
        .query_map([], author_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(authors)
}

pub fn fetch_author(conn: &Connection, id: i64) -> Result<Option<Author>> {
    let author = conn
        .query_row(
            &format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = ?1"),
            [id],
            author_from_row,
        )
        .optional()?;
    Ok(author)
}

/// Insert a new author row, returning the hydrated struct.
pub fn create_author(conn: &Connection, author: &NewAuthor) -> Result<Author> {
    conn.execute(
        "INSERT INTO authors (first_name, last_name, birth_date, country)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            author.first_name,
            author.last_name,
            author.birth_date,
            author.country
        ],
    )
    .map_err(map_write_error)?;

    Ok(Author {
        id: conn.last_insert_rowid(),
        first_name: author.first_name.clone(),
        last_name: author.last_name.clone(),
        birth_date: author.birth_date,
        country: author.country.clone(),
    })
}

/// Remove an author. The schema cascades to `books`, so every book written by
/// this author goes with it.
pub fn delete_author(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM authors WHERE id = ?1", [id])
        .map_err(map_write_error)?;

    if deleted == 0 {
        Err(CatalogError::not_found("author", id))
    } else {
        Ok(())
    }
}

pub fn count_authors(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM authors", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use chrono::NaiveDate;

    fn orwell() -> NewAuthor {
        NewAuthor {
            first_name: "Джордж".into(),
            last_name: "Оруэлл".into(),
            birth_date: NaiveDate::from_ymd_opt(1903, 6, 25),
            country: "Великобритания".into(),
        }
    }

    #[test]
    fn test_create_and_fetch_author_round_trips_birth_date() {
        let conn = open_in_memory().unwrap();
        let created = create_author(&conn, &orwell()).unwrap();
        assert!(created.id > 0);

        let loaded = fetch_author(&conn, created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn test_fetch_authors_sorted_by_last_name() {
        let conn = open_in_memory().unwrap();
        create_author(&conn, &orwell()).unwrap();
        create_author(
            &conn,
            &NewAuthor {
                first_name: "Александр".into(),
                last_name: "Пушкин".into(),
                birth_date: None,
                country: "Россия".into(),
            },
        )
        .unwrap();
        create_author(
            &conn,
            &NewAuthor {
                first_name: "Фёдор".into(),
                last_name: "Достоевский".into(),
                birth_date: None,
                country: "Россия".into(),
            },
        )
        .unwrap();

        let names: Vec<_> = fetch_authors(&conn)
            .unwrap()
            .into_iter()
            .map(|a| a.last_name)
            .collect();
        assert_eq!(names, vec!["Достоевский", "Оруэлл", "Пушкин"]);
    }

    #[test]
    fn test_blank_country_is_constraint_violation() {
        let conn = open_in_memory().unwrap();
        let mut author = orwell();
        author.country = String::new();

        let err = create_author(&conn, &author).unwrap_err();
        assert!(matches!(err, CatalogError::ConstraintViolation(_)));
        assert_eq!(count_authors(&conn).unwrap(), 0);
    }

    #[test]
    fn test_delete_missing_author() {
        let conn = open_in_memory().unwrap();
        let err = delete_author(&conn, 42).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NotFound {
                entity: "author",
                id: 42
            }
        ));
    }
}
