//! This is the library of the pull request labeling bot.
pub mod config;
pub mod error;
pub mod github;
pub mod labeler;
pub mod utils;

#[cfg(test)]
mod tests;
