//! Shared library surface for the ICS server and its tests.

pub mod api;
pub mod config;
pub mod state;
pub mod terrain;
