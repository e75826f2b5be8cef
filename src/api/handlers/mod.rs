//! HTTP request handlers.

pub mod config;
pub mod counter;
pub mod health;
pub mod id;
