//! Domain models that mirror the SQLite schema and get passed between the
//! catalog service and the controllers. They stay plain data holders; the
//! rules about what a valid record looks like live in the schema and in the
//! dialog controller.

use std::fmt;

use chrono::NaiveDate;

/// A writer whose books are stocked in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Primary key assigned by SQLite.
    pub id: i64,
    pub first_name: String,
    /// Also accepted on its own wherever an author is looked up by name.
    pub last_name: String,
    /// Unknown for some authors; stored as NULL.
    pub birth_date: Option<NaiveDate>,
    pub country: String,
}

impl Author {
    /// `First Last`, the form shown in filter pickers and listings.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

/// Field values for an author that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub country: String,
}

/// A category books are filed under. Deleting one deletes its books.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    /// Primary key assigned by SQLite.
    pub id: i64,
    /// Shown in the genre picker and in every listing row.
    pub name: String,
    pub description: Option<String>,
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Field values for a genre that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGenre {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A stocked title. `author_id` and `genre_id` always point at existing rows;
/// the schema enforces that and cascades deletes from either parent.
pub struct Book {
    /// Primary key from the database. Never rewritten by updates.
    pub id: i64,
    pub title: String,
    pub isbn: String,
    pub publish_year: i32,
    pub quantity_in_stock: i32,
    pub author_id: i64,
    pub genre_id: i64,
}

/// A book that has not been persisted yet, so it has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub isbn: String,
    pub publish_year: i32,
    pub quantity_in_stock: i32,
    pub author_id: i64,
    pub genre_id: i64,
}

/// One row of the filtered book list: the book plus the names of the author
/// and genre it points at, resolved by the same query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookListing {
    pub book: Book,
    pub author_name: String,
    pub genre_name: String,
}

impl BookListing {
    pub fn id(&self) -> i64 {
        self.book.id
    }

    pub fn title(&self) -> &str {
        &self.book.title
    }
}

/// Criteria for narrowing the book list. Every field is optional and an
/// empty filter matches the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub author_id: Option<i64>,
    pub genre_id: Option<i64>,
    pub search_text: Option<String>,
}

impl BookFilter {
    /// The text to match against title and ISBN, or `None` when the search
    /// box is empty or whitespace only. The returned slice is untrimmed.
    pub fn search_term(&self) -> Option<&str> {
        self.search_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// True when no predicate applies.
    pub fn is_empty(&self) -> bool {
        self.author_id.is_none() && self.genre_id.is_none() && self.search_term().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_display_joins_names() {
        let author = Author {
            id: 1,
            first_name: "Лев".into(),
            last_name: "Толстой".into(),
            birth_date: NaiveDate::from_ymd_opt(1828, 9, 9),
            country: "Россия".into(),
        };
        assert_eq!(author.full_name(), "Лев Толстой");
        assert_eq!(author.to_string(), author.full_name());
    }

    #[test]
    fn test_blank_search_text_is_no_filter() {
        let filter = BookFilter {
            search_text: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(filter.search_term(), None);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_search_term_keeps_surrounding_spaces() {
        let filter = BookFilter {
            search_text: Some(" и ".into()),
            ..Default::default()
        };
        assert_eq!(filter.search_term(), Some(" и "));
        assert!(!filter.is_empty());
    }
}
