extern crate self as gigboard;

pub mod app;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod orm;
pub mod read_model;
pub mod router;
pub mod search;
pub mod settings;
pub mod template;

pub use error::{Error, Result};
pub use gigboard_derive::Model;
pub use inventory;

inventory::collect!(crate::orm::Migration);
