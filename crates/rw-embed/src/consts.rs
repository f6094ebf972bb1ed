//! Internal constants for embed resolution.

use std::time::Duration;

/// Default HTTP timeout for embed fetches (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fence opening/closing used when wrapping code embeds.
pub const CODE_FENCE: &str = "```";

/// CSS class of the container mermaid sources are wrapped in.
pub const MERMAID_CLASS: &str = "mermaid";

