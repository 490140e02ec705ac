pub mod repo;

pub use repo::{CollectOptions, GitRepo};
