pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod queries;

// Sector opportunity scoring over the aggregate snapshot
pub mod scoring;
