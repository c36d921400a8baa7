// Outbound Automation Service - Core
//
// This crate provides the backend that drives queued outbound communications
// (email, WhatsApp) for the campaign platform: a Postgres-backed job queue
// with atomic claims and quadratic retry backoff, an append-only communication
// log, and the HTTP entry points that trigger and administer dispatch cycles.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::*;
