use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::info;

use crate::error::Result;
use crate::models::{NewAuthor, NewBook, NewGenre};

use super::authors::{count_authors, create_author};
use super::books::insert_book;
use super::genres::create_genre;

/// (first name, last name, birth date, country)
const AUTHORS: [(&str, &str, (i32, u32, u32), &str); 5] = [
    ("Лев", "Толстой", (1828, 9, 9), "Россия"),
    ("Фёдор", "Достоевский", (1821, 11, 11), "Россия"),
    ("Александр", "Пушкин", (1799, 6, 6), "Россия"),
    ("Джордж", "Оруэлл", (1903, 6, 25), "Великобритания"),
    ("Габриэль", "Гарсиа Маркес", (1927, 3, 6), "Колумбия"),
];

const GENRES: [(&str, &str); 5] = [
    ("Роман", "Крупная форма эпической прозы"),
    ("Поэзия", "Художественная литература в стихотворной форме"),
    ("Антиутопия", "Жанр, описывающий тоталитарное общество будущего"),
    (
        "Магический реализм",
        "Жанр, сочетающий реалистичное повествование с магическими элементами",
    ),
    (
        "Философский роман",
        "Роман, основная проблематика которого — философские вопросы",
    ),
];

/// (title, author index, genre index, year, ISBN, quantity)
const BOOKS: [(&str, usize, usize, i32, &str, i32); 8] = [
    ("Война и мир", 0, 0, 1869, "978-5-17-084879-3", 5),
    ("Анна Каренина", 0, 0, 1877, "978-5-17-090012-5", 3),
    ("Преступление и наказание", 1, 4, 1866, "978-5-17-097420-1", 4),
    ("Братья Карамазовы", 1, 4, 1880, "978-5-17-090555-7", 2),
    ("Евгений Онегин", 2, 1, 1833, "978-5-17-082345-5", 6),
    ("1984", 3, 2, 1949, "978-5-17-080214-6", 7),
    ("Скотный двор", 3, 2, 1945, "978-5-17-093177-7", 4),
    ("Сто лет одиночества", 4, 3, 1967, "978-5-17-058700-5", 3),
];

/// Populate the reference dataset when the store has no authors yet. Returns
/// whether anything was inserted. Runs in one transaction, so a failure
/// leaves the database empty and the next start tries again.
pub fn seed_if_empty(conn: &mut Connection) -> Result<bool> {
    if count_authors(conn)? > 0 {
        return Ok(false);
    }

    let tx = conn.transaction()?;

    let mut author_ids = Vec::with_capacity(AUTHORS.len());
    for (first_name, last_name, (year, month, day), country) in AUTHORS {
        let author = create_author(
            &tx,
            &NewAuthor {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                birth_date: NaiveDate::from_ymd_opt(year, month, day),
                country: country.to_string(),
            },
        )?;
        author_ids.push(author.id);
    }

    let mut genre_ids = Vec::with_capacity(GENRES.len());
    for (name, description) in GENRES {
        let genre = create_genre(
            &tx,
            &NewGenre {
                name: name.to_string(),
                description: Some(description.to_string()),
            },
        )?;
        genre_ids.push(genre.id);
    }

    for (title, author, genre, publish_year, isbn, quantity_in_stock) in BOOKS {
        insert_book(
            &tx,
            &NewBook {
                title: title.to_string(),
                isbn: isbn.to_string(),
                publish_year,
                quantity_in_stock,
                author_id: author_ids[author],
                genre_id: genre_ids[genre],
            },
        )?;
    }

    tx.commit()?;
    info!(
        authors = AUTHORS.len(),
        genres = GENRES.len(),
        books = BOOKS.len(),
        "seeded reference catalog"
    );
    Ok(true)
}
