use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cleaning::CleaningOptions;

const CONFIG_DIR: &str = ".texttools";
const CONFIG_NAMES: [&str; 3] = ["config.yaml", "config.yml", "config.json"];

/// Optional user preferences: default cleaning toggles and the default
/// merge separator. Absent file, absent sections, and absent keys all
/// fall back to defaults; command-line flags always win.
#[derive(Debug, Default, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub cleaning: CleaningDefaults,
    #[serde(default)]
    pub merge_separator: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CleaningDefaults {
    #[serde(default)]
    pub trim_whitespace: bool,
    #[serde(default)]
    pub clean_whitespace: bool,
    #[serde(default)]
    pub remove_tabs: bool,
}

impl CleaningDefaults {
    pub fn to_options(&self) -> CleaningOptions {
        CleaningOptions {
            trim_whitespace: self.trim_whitespace,
            clean_whitespace: self.clean_whitespace,
            remove_tabs: self.remove_tabs,
        }
    }
}

/// Load preferences from `.texttools/` in the working directory.
pub fn load() -> Result<Preferences> {
    load_from(Path::new(CONFIG_DIR))
}

pub fn load_from(dir: &Path) -> Result<Preferences> {
    for name in CONFIG_NAMES {
        let candidate = dir.join(name);
        if candidate.exists() {
            return parse_file(&candidate);
        }
    }
    Ok(Preferences::default())
}

fn parse_file(path: &Path) -> Result<Preferences> {
    let data =
        fs::read(path).with_context(|| format!("reading preferences {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing preferences {}", path.display()))
    } else {
        serde_yaml::from_slice(&data)
            .with_context(|| format!("parsing preferences {}", path.display()))
    }
}
