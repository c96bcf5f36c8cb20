//! Core cvopt library (session, API client, auth flows, analysis workflow).

pub mod auth;
pub mod client;
pub mod config;
pub mod gate;
pub mod logging;
pub mod mime;
pub mod report;
pub mod session;
pub mod workflow;
