use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Byte size of `ADDRESS` layouts. Unknown unless the platform of the analyzed code is.
    pub address_size: Option<u64>,
    /// Passes over a loop body before the variables that still change are widened.
    pub max_loop_passes: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            address_size: None,
            max_loop_passes: 8,
        }
    }
}

impl Options {
    pub fn from_ron(text: &str) -> Result<Options> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Options> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read options from {}", path.display()))?;

        Options::from_ron(&text).with_context(|| format!("Invalid options in {}", path.display()))
    }
}
