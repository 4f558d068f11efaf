//! Job-coordination core for a crawl-worker master.
//!
//! Coordinates a pool of crawl workers against a set of named, mutually
//! exclusive jobs: an etcd-backed job registry, a randomized job matcher,
//! and a lease-based distributed lock guaranteeing at most one worker
//! executes a given job at a time.
//!
//! The HTTP layer, result persistence, and process bootstrap are external
//! collaborators; they consume [`coordinator::JobCoordinator`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod job;
pub mod keys;
pub mod lock;
pub mod matcher;
pub mod registry;
pub mod store;

pub use error::{MasterError, Result};
