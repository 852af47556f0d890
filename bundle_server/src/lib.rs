//! # Bundle fulfillment server
//!
//! This crate hosts the process that drives data bundle orders through the provider. It is responsible for:
//! * Checking on startup that the provider can be reached (see [server::preflight_check]).
//! * Running the queue processor and the reconciliation sweeper on timers (see [workers]).
//! * Logging and saving the notifications and activity-log entries the engine publishes (see [hooks]).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.

pub mod cli;
pub mod config;
pub mod errors;
pub mod hooks;
pub mod routes;
pub mod server;
pub mod workers;
