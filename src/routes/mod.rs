//! Route modules for Marginalia Server

pub mod auth;
pub mod documents;
pub mod highlights;
