//! Shared types, errors, and configuration for Fundrelease.
//!
//! This crate provides common types used across all other crates:
//! - Display-currency money types with decimal precision
//! - Typed ledger addresses for campaigns and actors
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::AppError;
