pub mod db;
mod accounts;
mod categories;
mod files;
pub mod models;
mod settings;
mod tables;

pub use db::{Database, DatabaseError};
pub use tables::*;
