#![doc = "The `taskmanager` library crate."]
#![doc = ""]
#![doc = "Domain models, the storage abstraction and its PostgreSQL/in-memory implementations,"]
#![doc = "bearer-token authentication, the batch importer, routing and error handling for the"]
#![doc = "task-tracking service. The binary (`main.rs`) wires these into an actix-web server."]

pub mod auth;
pub mod batch;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use crate::error::AppError;
pub use crate::state::{AppState, Limits};
