use std::{
    io::{stdin, stdout, ErrorKind, Write},
    path::Path,
};

use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

const CONFIG_PATH: &str = "config.json";

/// Fully resolved settings, passed explicitly into the dashboard client so
/// nothing reads configuration ambiently.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub op_vault: String,
    pub op_item: String,
}

/// On-disk form, where any key may still be missing.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    op_vault: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    op_item: Option<String>,
}

/// Loads the config file, collecting any missing value interactively on first
/// run and persisting the answers back.
pub fn get_config() -> Result<AppConfig> {
    resolve_config(Path::new(CONFIG_PATH))
}

fn resolve_config(path: &Path) -> Result<AppConfig> {
    let mut stored = load_stored(path)?;
    let mut changed = false;

    let op_vault = match stored.op_vault.clone() {
        Some(v) => v,
        None => {
            let v = prompt("1Password vault name: ")?;
            stored.op_vault = Some(v.clone());
            changed = true;
            v
        }
    };
    let op_item = match stored.op_item.clone() {
        Some(v) => v,
        None => {
            let v = prompt("1Password item name for Amazon: ")?;
            stored.op_item = Some(v.clone());
            changed = true;
            v
        }
    };

    if changed {
        save_stored(path, &stored)?;
        println!("Config saved to {}", path.display());
    }

    Ok(AppConfig { op_vault, op_item })
}

fn load_stored(path: &Path) -> Result<StoredConfig> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoredConfig::default()),
        Err(e) => Err(e.into()),
    }
}

fn save_stored(path: &Path, config: &StoredConfig) -> Result<()> {
    let mut text = serde_json::to_string_pretty(config)?;
    text.push('\n');
    std::fs::write(path, text)?;
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    stdout().flush()?;
    let mut line = String::new();
    stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
