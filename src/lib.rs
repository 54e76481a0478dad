//! rarc library
//!
//! A command-line client for Phabricator. The interesting part is
//! [`cache`], which keeps the results of idempotent Conduit queries across
//! invocations; the other modules are the client, its output and the glue.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod data;
pub mod ui;
pub mod vcs;
