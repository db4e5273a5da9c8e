//! HTTP gateway over a container engine.
//!
//! Exposes image and container management endpoints and forwards each one
//! to the configured engine, reshaping the result as JSON.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod form;
pub mod routes;
