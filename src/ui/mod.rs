//! Ratatui front-end: key mapping, forms and rendering over the controller.

mod app;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use terminal::run_app;
