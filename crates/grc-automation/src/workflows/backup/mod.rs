//! Backup restoration planning.

pub mod restore_order;

pub use restore_order::{restoration_order, RestoreOrderError, TableDependency};
