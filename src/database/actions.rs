//! Postgres queries. Every recipe, tag and ingredient query takes the [`Owner`] it is
//! scoped to; rows of other owners are invisible to it.
//!
//! [`Owner`]: crate::schema::Owner

pub mod attributes;
pub mod recipes;
pub mod users;

pub use attributes::*;
pub use recipes::*;
pub use users::*;
