//! Recipe box core: persistent recipe store, first-launch seeding, repository, and
//! the debounced query pipeline that drives the recipe list.

pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod recipe_types;
pub mod repository;
pub mod seed;
pub mod service;
pub mod store;

pub use error::{RecipeError, Result};
pub use models::{Recipe, RecipeFilter};
