//! Core services for traversal, aggregation, persistence and monitoring

pub mod aggregate;
pub mod format;
pub mod ids;
pub mod limiter;
pub mod monitor;
pub mod pipeline;
pub mod progress;
pub mod sink;
pub mod size;
pub mod traverse;
