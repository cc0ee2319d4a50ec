//! Tree configuration

use serde::{Deserialize, Serialize};

/// Which walker renders a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkMode {
    /// Recursive below `recursion_limit`, iterative above
    #[default]
    Auto,
    Recursive,
    Iterative,
}

/// Tree configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Walker selection
    pub walk_mode: WalkMode,

    /// Deepest subtree `Auto` still renders recursively
    pub recursion_limit: usize,

    /// Flush byte sinks after every write
    pub flush_each_write: bool,

    /// Drain contended pending queues on a background thread
    pub spawn_background_drain: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            walk_mode: WalkMode::Auto,
            recursion_limit: 256,
            flush_each_write: false,
            spawn_background_drain: true,
        }
    }
}
