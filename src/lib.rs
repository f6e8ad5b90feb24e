//! ESDR - Environmental Sensor Data Repository
//!
//! This library provides the core functionality for the ESDR property and
//! mirror registration service. It exposes all modules for testing purposes.

pub mod auth;
pub mod entities;
pub mod errors;
pub mod filter;
pub mod guard;
pub mod settings;
pub mod storage;
pub mod validate;
pub mod values;
pub mod web;
