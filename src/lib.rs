mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
}
mod routes {
    pub mod api;
    pub mod attributes;
    pub mod health;
    pub mod recipes;
    pub mod rejection;
    pub mod users;
}
mod config;
mod constants;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use memory::MemoryStore;
pub use routes::api::api;
pub use store::{PgStore, SharedStore, Store};
