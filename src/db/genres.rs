use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{map_write_error, CatalogError, Result};
use crate::models::{Genre, NewGenre};

fn genre_from_row(row: &Row<'_>) -> rusqlite::Result<Genre> {
    Ok(Genre {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

/// Every genre ordered by name.
pub fn fetch_genres(conn: &Connection) -> Result<Vec<Genre>> {
    let mut stmt = conn.prepare("SELECT id, name, description FROM genres ORDER BY name, id")?;

    let genres = stmt
        .query_map([], genre_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(genres)
}

pub fn fetch_genre(conn: &Connection, id: i64) -> Result<Option<Genre>> {
    let genre = conn
        .query_row(
            "SELECT id, name, description FROM genres WHERE id = ?1",
            [id],
            genre_from_row,
        )
        .optional()?;
    Ok(genre)
}

pub fn create_genre(conn: &Connection, genre: &NewGenre) -> Result<Genre> {
    conn.execute(
        "INSERT INTO genres (name, description) VALUES (?1, ?2)",
        params![genre.name, genre.description],
    )
    .map_err(map_write_error)?;

    Ok(Genre {
        id: conn.last_insert_rowid(),
        name: genre.name.clone(),
        description: genre.description.clone(),
    })
}

/// Remove a genre and, through the cascade, all of its books.
pub fn delete_genre(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM genres WHERE id = ?1", [id])
        .map_err(map_write_error)?;

    if deleted == 0 {
        Err(CatalogError::not_found("genre", id))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn test_genres_sorted_by_name() {
        let conn = open_in_memory().unwrap();
        for name in ["Роман", "Антиутопия", "Поэзия"] {
            create_genre(
                &conn,
                &NewGenre {
                    name: name.into(),
                    description: None,
                },
            )
            .unwrap();
        }

        let names: Vec<_> = fetch_genres(&conn)
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["Антиутопия", "Поэзия", "Роман"]);
    }

    #[test]
    fn test_description_length_limit() {
        let conn = open_in_memory().unwrap();
        let genre = NewGenre {
            name: "Роман".into(),
            description: Some("я".repeat(501)),
        };
        let err = create_genre(&conn, &genre).unwrap_err();
        assert!(matches!(err, CatalogError::ConstraintViolation(_)));

        // 500 multi-byte characters still fit: the limit counts characters.
        let genre = NewGenre {
            name: "Роман".into(),
            description: Some("я".repeat(500)),
        };
        let created = create_genre(&conn, &genre).unwrap();
        assert_eq!(fetch_genre(&conn, created.id).unwrap(), Some(created));
    }
}
