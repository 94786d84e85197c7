//! schema-manager - command-line interface for the SA Markets Directory backend.
//!
//! This crate provides the `schema-manager` tool: it compares the declared
//! `schema.json` with the live backend, applies additive changes, dumps the
//! live schema, seeds reference data and manages the cached admin session.

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod runlog;
pub mod seed;
