#![forbid(unsafe_code)]

//! Shared data model for the attest validation engine.
//!
//! The engine and analytics crates exchange three things: dynamically typed
//! [`Value`]s, column-major [`Dataset`]s, and the configuration document model
//! in [`config`]. Everything here is plain data; evaluation and rule semantics
//! live in `attest-engine` and `attest-analytics`.

pub mod config;
pub mod dataset;
pub mod date;
pub mod value;

pub use dataset::{Column, ColumnType, Dataset, DatasetBuilder, DatasetError};
pub use date::{format_date, parse_date};
pub use value::{ErrorKind, Value};
