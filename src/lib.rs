//! Illuminance estimation and dark/light classification for fixed points.
//!
//! The engine in [`services::engine`] is a pure function of an input
//! snapshot, a validated [`config::EngineConfig`] and per-point state.
//! Everything else is the daemon around it: snapshot providers, the
//! per-point scheduler, the HTTP API and the MQTT publisher.

pub mod api_docs;
pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod shared_state;
