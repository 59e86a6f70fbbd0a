use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tunables for accelerator contexts, loaded by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelConfig {
    /// Surfaces allocated beyond what the codec needs, for frames queued
    /// in the renderer.
    pub surface_headroom: usize,
    /// Retry surface allocation at YUV422 when YUV420 fails.
    pub format_fallback: bool,
    /// DRM render node used when no display handle is supplied.
    pub render_node: PathBuf,
}

impl Default for AccelConfig {
    fn default() -> Self {
        AccelConfig {
            surface_headroom: 0,
            format_fallback: true,
            render_node: PathBuf::from("/dev/dri/renderD128"),
        }
    }
}
