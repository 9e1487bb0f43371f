//! Runtime configuration for the debug layer.
//!
//! The only runtime knob is source-location capture in diagnostics; whether
//! the tracker exists at all is the compile-time `sync-debug` feature. The
//! process default is read from the environment once, lazily; individual
//! meshes can override it through [`MeshBuilder`](crate::topology::mesh::MeshBuilder).

use once_cell::sync::Lazy;

/// Environment variable controlling location capture. Set to `0`, `false`,
/// or `off` to strip `(file:line)` suffixes from diagnostics.
pub const LOCATIONS_ENV: &str = "MESH_MIRROR_LOCATIONS";

/// Knobs for diagnostic emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugConfig {
    /// Annotate diagnostics with the `(file:line)` of the access call.
    pub capture_location: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        *process_default()
    }
}

impl DebugConfig {
    /// Read the configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            capture_location: env_flag(LOCATIONS_ENV, true),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off"),
        Err(_) => default,
    }
}

/// Process-wide default, captured on first use.
pub fn process_default() -> &'static DebugConfig {
    static DEFAULT: Lazy<DebugConfig> = Lazy::new(DebugConfig::from_env);
    &DEFAULT
}
