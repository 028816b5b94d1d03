//! Command-line front end for the catalog. It plays the presentation role:
//! it turns arguments into list and dialog controller calls and prints the
//! resulting rows. All rules live in the library.
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use library_catalog::db;
use library_catalog::ui::DialogState;
use library_catalog::{BookDialog, BookListing, Catalog, CatalogError, ListController};

#[derive(Parser, Debug)]
#[command(version, about = "Browse and maintain a local book catalog")]
struct CliArgs {
    /// Path to the SQLite catalog database file.
    #[arg(long, env = "LIBRARY_CATALOG_DB")]
    db: Option<PathBuf>,

    /// Use a throwaway in-memory database. Takes precedence over `--db` and
    /// `LIBRARY_CATALOG_DB`, so an exported path never blocks a scratch run.
    #[arg(long)]
    in_memory: bool,

    /// Do not load the reference dataset into an empty database.
    #[arg(long)]
    no_seed: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Where this run keeps its catalog.
#[derive(Debug, PartialEq, Eq)]
enum DbTarget {
    InMemory,
    File(PathBuf),
}

impl CliArgs {
    /// `--in-memory` first, then `--db` or its env fallback, then the default
    /// file under the home directory.
    fn db_target(&self) -> Result<DbTarget> {
        if self.in_memory {
            return Ok(DbTarget::InMemory);
        }
        match &self.db {
            Some(path) => Ok(DbTarget::File(path.clone())),
            None => Ok(DbTarget::File(db::default_db_path()?)),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List books, optionally filtered.
    List(ListArgs),
    /// List authors.
    Authors,
    /// List genres.
    Genres,
    /// Add a book.
    Add(BookArgs),
    /// Edit the book with the given id.
    Edit {
        id: i64,
        #[command(flatten)]
        fields: BookArgs,
    },
    /// Delete the book with the given id.
    Delete {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    /// Author id, last name, or full name.
    #[arg(long)]
    author: Option<String>,
    /// Genre id or name.
    #[arg(long)]
    genre: Option<String>,
    /// Case-sensitive text to find in the title or ISBN.
    #[arg(long)]
    search: Option<String>,
}

/// Form fields. When adding, unset fields keep the dialog defaults; when
/// editing, they keep the stored values.
#[derive(Args, Debug, Default)]
struct BookArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    quantity: Option<i32>,
    /// Author id, last name, or full name.
    #[arg(long)]
    author: Option<String>,
    /// Genre id or name.
    #[arg(long)]
    genre: Option<String>,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("failed to initialize logging")?;

    let conn = match args.db_target()? {
        DbTarget::InMemory => db::open_in_memory()?,
        DbTarget::File(path) => db::open_database(&path)?,
    };

    let mut catalog = Catalog::new(conn);
    if !args.no_seed {
        catalog.seed_if_empty()?;
    }
    let mut controller = ListController::new(catalog)?;

    match args.command.unwrap_or(Command::List(ListArgs::default())) {
        Command::List(filters) => list_books(&mut controller, &filters),
        Command::Authors => {
            for author in controller.authors() {
                let born = author
                    .birth_date
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{:>4}  {}  {}  {}", author.id, author, born, author.country);
            }
            Ok(())
        }
        Command::Genres => {
            for genre in controller.genres() {
                println!(
                    "{:>4}  {}  {}",
                    genre.id,
                    genre.name,
                    genre.description.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }
        Command::Add(fields) => add_book(&mut controller, &fields),
        Command::Edit { id, fields } => edit_book(&mut controller, id, &fields),
        Command::Delete { id, yes } => delete_book(&mut controller, id, yes),
    }
}

fn list_books(controller: &mut ListController, filters: &ListArgs) -> Result<()> {
    if let Some(author) = &filters.author {
        let id = resolve_author(controller, author)?;
        controller.set_author_filter(Some(id))?;
    }
    if let Some(genre) = &filters.genre {
        let id = resolve_genre(controller, genre)?;
        controller.set_genre_filter(Some(id))?;
    }
    if let Some(search) = &filters.search {
        controller.set_search_text(search.clone())?;
    }

    for listing in controller.books() {
        print_listing(listing);
    }
    println!("{} book(s)", controller.books().len());
    Ok(())
}

fn add_book(controller: &mut ListController, fields: &BookArgs) -> Result<()> {
    let author = fields
        .author
        .as_deref()
        .map(|key| resolve_author(controller, key))
        .transpose()?;
    let genre = fields
        .genre
        .as_deref()
        .map(|key| resolve_genre(controller, key))
        .transpose()?;

    let mut failure = None;
    let added = controller.add(|dialog: &mut BookDialog| {
        failure = fill_and_save(dialog, fields, author, genre).err();
    })?;
    if let Some(err) = failure {
        return Err(err.into());
    }

    let book = added.ok_or_else(|| anyhow!("book was not added"))?;
    println!("Added book {} \"{}\"", book.id, book.title);
    Ok(())
}

fn edit_book(controller: &mut ListController, id: i64, fields: &BookArgs) -> Result<()> {
    let author = fields
        .author
        .as_deref()
        .map(|key| resolve_author(controller, key))
        .transpose()?;
    let genre = fields
        .genre
        .as_deref()
        .map(|key| resolve_genre(controller, key))
        .transpose()?;

    controller.select(Some(id))?;
    let mut failure = None;
    let edited = controller.edit(|dialog: &mut BookDialog| {
        failure = fill_and_save(dialog, fields, author, genre).err();
    })?;
    if let Some(err) = failure {
        return Err(err.into());
    }

    let book = edited.ok_or_else(|| anyhow!("book was not updated"))?;
    println!("Updated book {} \"{}\"", book.id, book.title);
    Ok(())
}

fn delete_book(controller: &mut ListController, id: i64, yes: bool) -> Result<()> {
    controller.select(Some(id))?;
    let deleted = if yes {
        controller.delete(true)?
    } else {
        controller.delete(prompt_yes_no)?
    };

    if deleted {
        println!("Deleted book {id}");
    } else {
        println!("Kept book {id}");
    }
    Ok(())
}

/// Copy the provided fields into the dialog and save it. On any failure the
/// dialog is cancelled so the controller does not persist anything.
fn fill_and_save(
    dialog: &mut BookDialog,
    fields: &BookArgs,
    author: Option<i64>,
    genre: Option<i64>,
) -> Result<(), CatalogError> {
    let result = (|| -> Result<(), CatalogError> {
        if let Some(title) = &fields.title {
            dialog.set_title(title.clone())?;
        }
        if let Some(isbn) = &fields.isbn {
            dialog.set_isbn(isbn.clone())?;
        }
        if let Some(year) = fields.year {
            dialog.set_publish_year(year)?;
        }
        if let Some(quantity) = fields.quantity {
            dialog.set_quantity_in_stock(quantity)?;
        }
        if author.is_some() {
            dialog.select_author(author)?;
        }
        if genre.is_some() {
            dialog.select_genre(genre)?;
        }
        dialog.save()
    })();

    if result.is_err() && dialog.state() == DialogState::Editing {
        dialog.cancel()?;
    }
    result
}

fn resolve_author(controller: &ListController, key: &str) -> Result<i64> {
    if let Ok(id) = key.parse::<i64>() {
        return Ok(controller.catalog().author(id)?.id);
    }
    controller
        .authors()
        .iter()
        .find(|a| a.last_name == key || a.full_name() == key)
        .map(|a| a.id)
        .ok_or_else(|| anyhow!("no author matches \"{key}\""))
}

fn resolve_genre(controller: &ListController, key: &str) -> Result<i64> {
    if let Ok(id) = key.parse::<i64>() {
        return Ok(controller.catalog().genre(id)?.id);
    }
    controller
        .genres()
        .iter()
        .find(|g| g.name == key)
        .map(|g| g.id)
        .ok_or_else(|| anyhow!("no genre matches \"{key}\""))
}

fn print_listing(listing: &BookListing) {
    let book = &listing.book;
    println!(
        "{:>4}  {}  |  {}  |  {}  |  {}  |  {}  |  qty {}",
        book.id,
        book.title,
        listing.author_name,
        listing.genre_name,
        book.publish_year,
        book.isbn,
        book.quantity_in_stock
    );
}

/// Ask on stdin; anything but `y`/`yes` is a no.
fn prompt_yes_no(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
