//! Configuration file support.
//!
//! A `.whilst.toml` next to the analyzed file (or in the working
//! directory) provides defaults for graph snapshots and color; command
//! line flags always win.
//!
//! ```toml
//! [whilst]
//! dot = true          # write cfg_<label>.dot snapshots during -z
//! dot_dir = "graphs"  # where snapshots go (default: alongside the file)
//! color = false       # disable colored terminal output
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

/// File name probed for configuration.
pub const CONFIG_FILE: &str = ".whilst.toml";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The `[whilst]` table.
    #[serde(default)]
    pub whilst: WhilstConfig,
}

/// Settings under the `[whilst]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WhilstConfig {
    /// Whether `-z` writes DOT snapshots after each pass.
    #[serde(default)]
    pub dot: bool,
    /// Directory for DOT snapshots; the analyzed file's directory when
    /// unset.
    #[serde(default)]
    pub dot_dir: Option<String>,
    /// Whether terminal output uses color.
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_color() -> bool {
    true
}

impl Default for WhilstConfig {
    fn default() -> Self {
        Self {
            dot: false,
            dot_dir: None,
            color: true,
        }
    }
}

impl Config {
    /// Loads configuration from `.whilst.toml` in `dir`, falling back to
    /// defaults when the file is absent or unreadable. A present but
    /// malformed file is reported on stderr and otherwise ignored.
    #[must_use]
    pub fn load_from_dir(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        let Ok(raw) = fs::read_to_string(&path) else {
            return Self::default();
        };
        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("warning: ignoring malformed {}: {err}", path.display());
                Self::default()
            }
        }
    }
}
