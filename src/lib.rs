//! Librarian organizer
//!
//! Watches download folders and files new episodes, movies and subtitles
//! into the library using configurable naming patterns.

pub mod app_mode;
pub mod cli;
pub mod config;
pub mod db;
pub mod jobs;
pub mod services;
