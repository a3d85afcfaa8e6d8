//! Time-tracking API backend.
//!
//! Users clock in and out, their working periods are recorded, and teams
//! group users under an owner. Every call goes through a single funnel
//! that resolves the route, verifies the caller's token and checks the
//! role-based permission table before a controller runs.
//!
//! The crate is organized in layers:
//!
//! - [`routing`]: the verb + path-template router
//! - [`authz`]: the role/resource/action permission table
//! - [`auth`]: tokens, identities and password hashing
//! - [`services`]: repository traits and in-memory implementations
//! - [`controllers`]: the API surface itself
//! - [`api`]: the funnel tying the above together
//! - [`server`]: the axum transport in front of the funnel

pub mod api;
pub mod auth;
pub mod authz;
pub mod config;
pub mod controllers;
pub mod models;
pub mod routing;
pub mod server;
pub mod services;
pub mod state;
