//! Marginalia Server Library
//!
//! A self-hosted PDF annotation server: accounts, S3-backed PDF
//! storage, and positioned text highlights with notes.
//!
//! The binary entry point is in main.rs; this crate exposes the
//! modules needed by integration tests.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;
