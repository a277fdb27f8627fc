//! # klang-rs
//!
//! Generation broker for the klang vocabulary trainer.
//!
//! Word meanings, illustrations and pronunciations are produced by slow,
//! paid providers and stored durably. The [`engine::Broker`] makes sure each
//! of them is generated at most once at a time: concurrent requests for the
//! same key share one generation, requests queue per kind, and a crashed
//! worker is restarted without taking the rest of the service down.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod llm;
pub mod model;
pub mod store;
pub mod telemetry;
