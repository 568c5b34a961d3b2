pub mod db;
pub mod error;
pub mod mapper;
pub mod metrics;
pub mod models;
pub mod prefs;
pub mod remote;
pub mod schema;
pub mod service;
pub mod state;
pub mod steps;
pub mod sync;
pub mod targets;
pub mod tasks;

pub use error::{Error, Result};
