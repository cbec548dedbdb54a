//! Client for the tinyhttp chat demo server: a polled message board, a live
//! websocket chat and the login/register forms, each driven through a view
//! trait so the GTK front end (feature `gui`) stays a thin layer.

pub mod api;
pub mod app;
pub mod board;
pub mod chat;
pub mod error;
pub mod forms;
pub mod utils;

#[cfg(feature = "gui")]
pub mod ui;

pub use error::{Error, Result};
