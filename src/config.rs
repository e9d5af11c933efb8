//! Knobs for a single compilation

use std::env;

/// Default limit on nested inference/reduction calls
pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Nesting limit for recursive inference and reduction. Exceeding it
    /// fails with `DepthExceeded` rather than overflowing the stack.
    pub max_depth: usize,
    /// Also log everything natives write to the output sink
    pub echo_native_output: bool,
}

impl CoreConfig {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            echo_native_output: false,
        }
    }

    /// Defaults overridden by `SCHIST_MAX_DEPTH` and `SCHIST_ECHO_NATIVE`
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Some(depth) = env::var("SCHIST_MAX_DEPTH")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            config.max_depth = depth;
        }
        if let Ok(echo) = env::var("SCHIST_ECHO_NATIVE") {
            config.echo_native_output = matches!(echo.trim(), "1" | "true" | "yes");
        }
        config
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
