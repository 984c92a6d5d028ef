//! Receipt Points API Library
//!
//! Scores purchase receipts under a fixed rule set and keeps each score in a
//! key-value store, under a fresh UUID, for a limited time.
//!
//! # Modules
//!
//! - `cache`: In-memory TTL backend (moka).
//! - `config`: Configuration management.
//! - `db`: Redis backend and backend selection.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Receipt and response models.
//! - `parsers`: Strict parsers for amounts, dates and times.
//! - `rules`: Individual scoring rules.
//! - `scoring`: Scoring pipeline.
//! - `store`: Deadline-bounded, retrying store adapter.

pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod parsers;
pub mod rules;
pub mod scoring;
pub mod store;
