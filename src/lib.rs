//! Task Manager Library
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod repository;
pub mod types;
pub mod web;
