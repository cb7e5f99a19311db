//! Traffic profiles for the MGA load generator
//!
//! This crate holds the data side of traffic generation: request [`Action`]
//! templates, the [`WeightedActionSet`] they are drawn from, and the built-in
//! [`Catalog`]s. It performs no I/O; sessions in `mga-loadgen` render and
//! execute what is drawn here.

pub mod action;
pub mod catalog;
pub mod error;
pub mod weighted;

pub use action::{Action, HttpMethod, PathParam, RenderedRequest};
pub use catalog::{Catalog, BUILTIN_CATALOGS, INDEX_ACTION};
pub use error::{ProfileError, Result};
pub use weighted::{WeightedAction, WeightedActionSet};
