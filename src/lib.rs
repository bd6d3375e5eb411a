#![forbid(unsafe_code)]

//! glsched — interactive terminal dashboard for GitLab pipeline schedules.
//!
//! Browse, create, edit, delete, toggle and run pipeline schedules across
//! projects, launch ad-hoc pipeline runs with live status polling, and
//! manage locally persisted connection profiles.
//!
//! The application core is a single-threaded, message-driven state machine:
//! a pure reducer over a closed message enum, with remote calls described as
//! command values and executed on worker threads. See [`tui`] for the loop
//! and [`services`] for the collaborators behind it.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use glsched::prelude::*;
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod models;
pub mod services;
pub mod tui;
