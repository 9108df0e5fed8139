//! Request-serving scaffold: a structured multi-sink logger, a
//! request-correlation and error-handling middleware chain, and a
//! small example resource showing how domain glue hangs off both.

pub mod adapter;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod handler;
pub mod healthcheck;
pub mod logger;
pub mod middleware;
pub mod port;
pub mod test_support;
