//! Curricula: program/template association service.
//!
//! The server side (`api`, `auth`, `audit`) wraps the transactional link
//! operations from `curricula-core` behind an HTTP surface. The `client`
//! module is the optimistic mutation engine a UI drives against that surface.

pub mod api;
pub mod audit;
pub mod auth;
pub mod client;
pub mod config;

pub use curricula_core::{db, models, Database, LinkError};
