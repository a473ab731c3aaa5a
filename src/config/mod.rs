use crate::{ConnectScopeError, Result};
use serde::{Deserialize, Serialize};

/// Filter configuration.
///
/// The filter has no tunables beyond whether it is installed and how its
/// diagnostics look on the way out; interception behaviour itself is fixed
/// by the protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// When false every handler is a pure pass-through with no diagnostics
    pub enabled: bool,
    /// ANSI colour in rendered blocks; turn off for non-TTY sinks
    pub colour: bool,
    /// Bound on blocks buffered towards a slow sink before dropping
    pub sink_capacity: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            colour: true,
            sink_capacity: 128,
        }
    }
}

impl FilterConfig {
    /// Validate configuration bounds
    pub fn validate(&self) -> Result<()> {
        if self.sink_capacity == 0 {
            return Err(ConnectScopeError::Config(
                "sink_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
