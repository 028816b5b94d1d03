use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::models::{Author, Book, BookFilter, BookListing, Genre};

use super::dialog::BookDialog;
use super::observer::{Observers, Subscription};

/// Actions the book list offers. See [`ListController::can_execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListCommand {
    Add,
    Edit,
    Delete,
    ResetFilters,
}

/// Properties whose change is published to list observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListField {
    AuthorFilter,
    GenreFilter,
    SearchText,
    Books,
    SelectedBook,
    /// Command enablement may have changed; re-ask `can_execute`.
    CommandState,
}

/// Shows the add/edit form to the user. When `edit` returns the dialog is
/// expected to have been saved or cancelled; anything else counts as cancel.
pub trait BookEditor {
    fn edit(&mut self, dialog: &mut BookDialog);
}

impl<F> BookEditor for F
where
    F: FnMut(&mut BookDialog),
{
    fn edit(&mut self, dialog: &mut BookDialog) {
        self(dialog)
    }
}

/// Yes/no prompt shown before a book is deleted.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// A pre-answered prompt, for callers that already asked.
impl Confirm for bool {
    fn confirm(&mut self, _prompt: &str) -> bool {
        *self
    }
}

/// State behind the main book list: the filter, the materialized rows, the
/// selection, and the author/genre choices the filter pickers offer.
///
/// The list is never patched in place. Every filter change or write re-runs
/// the query and swaps the rows wholesale.
#[derive(Debug)]
pub struct ListController {
    catalog: Catalog,
    authors: Vec<Author>,
    genres: Vec<Genre>,
    filter: BookFilter,
    books: Vec<BookListing>,
    selected: Option<BookListing>,
    observers: Observers<ListField>,
}

impl ListController {
    /// Load the choice lists and the unfiltered book list.
    pub fn new(catalog: Catalog) -> Result<Self> {
        let authors = catalog.authors()?;
        let genres = catalog.genres()?;
        let books = catalog.query(&BookFilter::default())?;

        Ok(Self {
            catalog,
            authors,
            genres,
            filter: BookFilter::default(),
            books,
            selected: None,
            observers: Observers::new(),
        })
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&ListField) + 'static) -> Subscription {
        self.observers.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.observers.unsubscribe(subscription)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Direct access for author/genre maintenance. Call [`Self::refresh`]
    /// afterwards so the list picks the changes up.
    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn filter(&self) -> &BookFilter {
        &self.filter
    }

    pub fn books(&self) -> &[BookListing] {
        &self.books
    }

    pub fn selected(&self) -> Option<&BookListing> {
        self.selected.as_ref()
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }

    pub fn set_author_filter(&mut self, author_id: Option<i64>) -> Result<()> {
        let filter = BookFilter {
            author_id,
            ..self.filter.clone()
        };
        self.apply_filter(filter, &[ListField::AuthorFilter])
    }

    pub fn set_genre_filter(&mut self, genre_id: Option<i64>) -> Result<()> {
        let filter = BookFilter {
            genre_id,
            ..self.filter.clone()
        };
        self.apply_filter(filter, &[ListField::GenreFilter])
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        let filter = BookFilter {
            search_text: (!text.is_empty()).then_some(text),
            ..self.filter.clone()
        };
        self.apply_filter(filter, &[ListField::SearchText])
    }

    /// Clear every filter field and show the whole catalog.
    pub fn reset_filters(&mut self) -> Result<()> {
        self.apply_filter(
            BookFilter::default(),
            &[
                ListField::AuthorFilter,
                ListField::GenreFilter,
                ListField::SearchText,
            ],
        )
    }

    /// Select a book from the current rows, or clear the selection.
    pub fn select(&mut self, book_id: Option<i64>) -> Result<()> {
        let selected = match book_id {
            Some(id) => Some(
                self.books
                    .iter()
                    .find(|listing| listing.id() == id)
                    .cloned()
                    .ok_or_else(|| CatalogError::not_found("book", id))?,
            ),
            None => None,
        };
        self.set_selected(selected);
        Ok(())
    }

    pub fn can_execute(&self, command: ListCommand) -> bool {
        match command {
            ListCommand::Add | ListCommand::ResetFilters => true,
            ListCommand::Edit | ListCommand::Delete => self.selected.is_some(),
        }
    }

    /// Re-run the current filter against the store.
    pub fn requery(&mut self) -> Result<()> {
        let books = self.catalog.query(&self.filter)?;
        self.replace_books(books);
        Ok(())
    }

    /// Reload the author and genre choices, drop filter values pointing at
    /// rows that no longer exist, and re-query.
    pub fn refresh(&mut self) -> Result<()> {
        let authors = self.catalog.authors()?;
        let genres = self.catalog.genres()?;

        let mut filter = self.filter.clone();
        let mut changed = Vec::new();
        if let Some(id) = filter.author_id {
            if !authors.iter().any(|a| a.id == id) {
                filter.author_id = None;
                changed.push(ListField::AuthorFilter);
            }
        }
        if let Some(id) = filter.genre_id {
            if !genres.iter().any(|g| g.id == id) {
                filter.genre_id = None;
                changed.push(ListField::GenreFilter);
            }
        }

        let books = self.catalog.query(&filter)?;
        self.authors = authors;
        self.genres = genres;
        self.filter = filter;
        for field in changed {
            self.observers.notify(&field);
        }
        self.replace_books(books);
        Ok(())
    }

    /// A fresh Add-mode dialog offering the current authors and genres.
    pub fn new_dialog(&self) -> BookDialog {
        BookDialog::new(self.authors.clone(), self.genres.clone())
    }

    /// Run the add flow. Returns the stored book, or `None` if the user
    /// cancelled.
    pub fn add(&mut self, mut editor: impl BookEditor) -> Result<Option<Book>> {
        let mut dialog = self.new_dialog();
        editor.edit(&mut dialog);

        if !dialog.is_accepted() {
            debug!("add book cancelled");
            return Ok(None);
        }

        let book = self.catalog.add_book(dialog.to_new_book()?)?;
        self.requery()?;
        Ok(Some(book))
    }

    /// Run the edit flow on the selected book.
    pub fn edit(&mut self, mut editor: impl BookEditor) -> Result<Option<Book>> {
        let selected = self.require_selection(ListCommand::Edit)?;

        let mut dialog = self.new_dialog();
        dialog.load_from_book(&selected.book)?;
        editor.edit(&mut dialog);

        if !dialog.is_accepted() {
            debug!(id = selected.id(), "edit book cancelled");
            return Ok(None);
        }

        let book = self
            .catalog
            .update_book(selected.id(), |book| dialog.apply_to_book(book))?;
        self.requery()?;
        Ok(Some(book))
    }

    /// Delete the selected book once `confirm` agrees. Returns whether a
    /// book was deleted.
    pub fn delete(&mut self, mut confirm: impl Confirm) -> Result<bool> {
        let selected = self.require_selection(ListCommand::Delete)?;

        let prompt = format!("Are you sure you want to delete \"{}\"?", selected.title());
        if !confirm.confirm(&prompt) {
            debug!(id = selected.id(), "delete book declined");
            return Ok(false);
        }

        self.catalog.delete_book(selected.id())?;
        self.requery()?;
        Ok(true)
    }

    fn require_selection(&self, command: ListCommand) -> Result<BookListing> {
        self.selected.clone().ok_or_else(|| {
            warn!(?command, "command needs a selected book");
            CatalogError::validation("No book selected.")
        })
    }

    /// Query first and only commit the filter if that worked, so a failed
    /// query leaves the previous filter and rows in place.
    fn apply_filter(&mut self, filter: BookFilter, fields: &[ListField]) -> Result<()> {
        let books = self.catalog.query(&filter)?;
        self.filter = filter;
        for field in fields {
            self.observers.notify(field);
        }
        self.replace_books(books);
        Ok(())
    }

    fn replace_books(&mut self, books: Vec<BookListing>) {
        let selected = self
            .selected
            .as_ref()
            .and_then(|current| books.iter().find(|b| b.id() == current.id()).cloned());
        self.books = books;
        self.observers.notify(&ListField::Books);
        self.set_selected(selected);
    }

    fn set_selected(&mut self, selected: Option<BookListing>) {
        if self.selected == selected {
            return;
        }
        let enablement_changed = self.selected.is_some() != selected.is_some();
        self.selected = selected;
        self.observers.notify(&ListField::SelectedBook);
        if enablement_changed {
            self.observers.notify(&ListField::CommandState);
        }
    }
}
