//! Command implementations
//!
//! Every command returns a JSON value; `main` decides how to print it.

pub mod entities;
pub mod provenance;
pub mod roles;
pub mod tracker;

use std::sync::Arc;

use supplytrace_kernel::{Identity, Tracker};

use crate::config::TrackerConfig;

/// What a command runs against.
pub struct Context {
    pub tracker: Arc<Tracker>,
    /// Identity the command acts as
    pub caller: Identity,
    pub config: TrackerConfig,
}

impl Context {
    pub fn new(tracker: Arc<Tracker>, caller: Identity, config: TrackerConfig) -> Self {
        Self {
            tracker,
            caller,
            config,
        }
    }
}
