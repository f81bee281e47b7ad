//! Tenant-scoped workflow automation and calibration analytics for GRC administration.

pub mod audit;
pub mod config;
pub mod error;
pub mod http;
pub mod store;
pub mod telemetry;
pub mod tenant;
pub mod workflows;
