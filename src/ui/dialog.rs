use chrono::{Datelike, Local};

use crate::error::{CatalogError, Result};
use crate::models::{Author, Book, Genre, NewBook};

use super::observer::{Observers, Subscription};

/// Whether the dialog creates a new book or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Add,
    Edit,
}

impl DialogMode {
    /// Window caption for the presentation layer.
    pub fn label(self) -> &'static str {
        match self {
            DialogMode::Add => "Add book",
            DialogMode::Edit => "Edit book",
        }
    }
}

/// `Editing` moves to exactly one of the other two and stays there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Editing,
    Accepted,
    Rejected,
}

/// Dialog properties whose change is published as [`DialogEvent::Changed`].
/// `State` fires once, when the dialog leaves `Editing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogField {
    Mode,
    Title,
    PublishYear,
    Isbn,
    QuantityInStock,
    Author,
    Genre,
    State,
}

/// What dialog observers receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogEvent {
    Changed(DialogField),
    /// The dialog reached a terminal state and wants to be closed.
    CloseRequested(DialogState),
}

/// Buttons the form binds to. Ask [`BookDialog::can_execute`] before enabling
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogCommand {
    Save,
    Cancel,
}

/// Draft state behind the add/edit book form. Holds the field values, the
/// author and genre choices, and the outcome once the user saves or cancels.
#[derive(Debug)]
pub struct BookDialog {
    title: String,
    publish_year: i32,
    isbn: String,
    quantity_in_stock: i32,
    author: Option<Author>,
    genre: Option<Genre>,
    authors: Vec<Author>,
    genres: Vec<Genre>,
    mode: DialogMode,
    state: DialogState,
    observers: Observers<DialogEvent>,
}

impl BookDialog {
    /// A blank Add-mode form: publish year defaults to the current year and
    /// quantity to zero.
    pub fn new(authors: Vec<Author>, genres: Vec<Genre>) -> Self {
        Self {
            title: String::new(),
            publish_year: Local::now().year(),
            isbn: String::new(),
            quantity_in_stock: 0,
            author: None,
            genre: None,
            authors,
            genres,
            mode: DialogMode::Add,
            state: DialogState::Editing,
            observers: Observers::new(),
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&DialogEvent) + 'static) -> Subscription {
        self.observers.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.observers.unsubscribe(subscription)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn publish_year(&self) -> i32 {
        self.publish_year
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn quantity_in_stock(&self) -> i32 {
        self.quantity_in_stock
    }

    pub fn selected_author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    pub fn selected_genre(&self) -> Option<&Genre> {
        self.genre.as_ref()
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }

    pub fn mode(&self) -> DialogMode {
        self.mode
    }

    pub fn label(&self) -> &'static str {
        self.mode.label()
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn is_accepted(&self) -> bool {
        self.state == DialogState::Accepted
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.ensure_editing()?;
        self.title = title.into();
        self.changed(DialogField::Title);
        Ok(())
    }

    pub fn set_publish_year(&mut self, year: i32) -> Result<()> {
        self.ensure_editing()?;
        self.publish_year = year;
        self.changed(DialogField::PublishYear);
        Ok(())
    }

    pub fn set_isbn(&mut self, isbn: impl Into<String>) -> Result<()> {
        self.ensure_editing()?;
        self.isbn = isbn.into();
        self.changed(DialogField::Isbn);
        Ok(())
    }

    pub fn set_quantity_in_stock(&mut self, quantity: i32) -> Result<()> {
        self.ensure_editing()?;
        self.quantity_in_stock = quantity;
        self.changed(DialogField::QuantityInStock);
        Ok(())
    }

    /// Pick an author from the choices by id, or clear the selection.
    pub fn select_author(&mut self, id: Option<i64>) -> Result<()> {
        self.ensure_editing()?;
        self.author = match id {
            Some(id) => Some(
                self.authors
                    .iter()
                    .find(|a| a.id == id)
                    .cloned()
                    .ok_or_else(|| CatalogError::not_found("author", id))?,
            ),
            None => None,
        };
        self.changed(DialogField::Author);
        Ok(())
    }

    pub fn select_genre(&mut self, id: Option<i64>) -> Result<()> {
        self.ensure_editing()?;
        self.genre = match id {
            Some(id) => Some(
                self.genres
                    .iter()
                    .find(|g| g.id == id)
                    .cloned()
                    .ok_or_else(|| CatalogError::not_found("genre", id))?,
            ),
            None => None,
        };
        self.changed(DialogField::Genre);
        Ok(())
    }

    /// Fill the form from an existing book and switch to Edit mode. An author
    /// or genre that is not among the choices leaves that selection empty.
    pub fn load_from_book(&mut self, book: &Book) -> Result<()> {
        self.ensure_editing()?;
        self.mode = DialogMode::Edit;
        self.title = book.title.clone();
        self.publish_year = book.publish_year;
        self.isbn = book.isbn.clone();
        self.quantity_in_stock = book.quantity_in_stock;
        self.author = self.authors.iter().find(|a| a.id == book.author_id).cloned();
        self.genre = self.genres.iter().find(|g| g.id == book.genre_id).cloned();

        for field in [
            DialogField::Mode,
            DialogField::Title,
            DialogField::PublishYear,
            DialogField::Isbn,
            DialogField::QuantityInStock,
            DialogField::Author,
            DialogField::Genre,
        ] {
            self.changed(field);
        }
        Ok(())
    }

    /// First rule the draft breaks, as a message fit for the form footer.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CatalogError::validation("Title is required."));
        }
        if self.isbn.trim().is_empty() {
            return Err(CatalogError::validation("ISBN is required."));
        }
        if self.author.is_none() {
            return Err(CatalogError::validation("Select an author."));
        }
        if self.genre.is_none() {
            return Err(CatalogError::validation("Select a genre."));
        }
        if self.publish_year <= 0 {
            return Err(CatalogError::validation("Publish year must be positive."));
        }
        if self.quantity_in_stock < 0 {
            return Err(CatalogError::validation(
                "Quantity in stock cannot be negative.",
            ));
        }
        Ok(())
    }

    pub fn can_save(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn can_execute(&self, command: DialogCommand) -> bool {
        let editing = self.state == DialogState::Editing;
        match command {
            DialogCommand::Save => editing && self.can_save(),
            DialogCommand::Cancel => editing,
        }
    }

    pub fn execute(&mut self, command: DialogCommand) -> Result<()> {
        match command {
            DialogCommand::Save => self.save(),
            DialogCommand::Cancel => self.cancel(),
        }
    }

    /// Accept the draft and ask to close.
    pub fn save(&mut self) -> Result<()> {
        self.ensure_editing()?;
        self.validate()?;
        self.finish(DialogState::Accepted);
        Ok(())
    }

    /// Reject the draft and ask to close. Always allowed while editing.
    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_editing()?;
        self.finish(DialogState::Rejected);
        Ok(())
    }

    /// Write the draft onto `book`, including the selected author and genre
    /// ids. Fails without touching `book` when either selection is missing.
    pub fn apply_to_book(&self, book: &mut Book) -> Result<()> {
        let (author_id, genre_id) = self.selection_ids()?;
        book.title = self.title.clone();
        book.publish_year = self.publish_year;
        book.isbn = self.isbn.clone();
        book.quantity_in_stock = self.quantity_in_stock;
        book.author_id = author_id;
        book.genre_id = genre_id;
        Ok(())
    }

    /// The draft as a book ready to be inserted.
    pub fn to_new_book(&self) -> Result<NewBook> {
        let (author_id, genre_id) = self.selection_ids()?;
        Ok(NewBook {
            title: self.title.clone(),
            isbn: self.isbn.clone(),
            publish_year: self.publish_year,
            quantity_in_stock: self.quantity_in_stock,
            author_id,
            genre_id,
        })
    }

    fn selection_ids(&self) -> Result<(i64, i64)> {
        let author = self
            .author
            .as_ref()
            .ok_or_else(|| CatalogError::validation("Select an author."))?;
        let genre = self
            .genre
            .as_ref()
            .ok_or_else(|| CatalogError::validation("Select a genre."))?;
        Ok((author.id, genre.id))
    }

    fn ensure_editing(&self) -> Result<()> {
        if self.state == DialogState::Editing {
            Ok(())
        } else {
            Err(CatalogError::DialogClosed)
        }
    }

    fn finish(&mut self, state: DialogState) {
        self.state = state;
        self.changed(DialogField::State);
        self.observers.notify(&DialogEvent::CloseRequested(state));
    }

    fn changed(&mut self, field: DialogField) {
        self.observers.notify(&DialogEvent::Changed(field));
    }
}
