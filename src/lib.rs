//! bacheca: a terminal client for json-server style post boards.
//!
//! The crate is layered: [`api`] talks to the REST API, [`query`] caches the
//! results behind structural keys, [`views`] renders cache snapshots to text,
//! and [`shell`] drives the interactive loop. [`config`] and [`infra`] carry
//! settings resolution and telemetry bootstrap for the binary.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod query;
pub mod shell;
pub mod views;
