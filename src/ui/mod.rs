//! Presentation-model controllers. They hold the state a front end binds to
//! and publish changes through [`Observers`], but draw nothing themselves.

mod dialog;
mod list;
mod observer;

pub use dialog::{BookDialog, DialogCommand, DialogEvent, DialogField, DialogMode, DialogState};
pub use list::{BookEditor, Confirm, ListCommand, ListController, ListField};
pub use observer::{Observers, Subscription};
