use anyhow::{bail, Result};
use tokio::process::Command;
use tracing::debug;

/// Reads a value through a 1Password secret reference (`op://vault/item/field`).
/// A failure here aborts the run: it's a setup problem, not a transient one.
pub async fn read_secret(reference: &str) -> Result<String> {
    debug!("Reading secret reference {reference}");
    let output = Command::new("op").args(["read", reference]).output().await?;
    if !output.status.success() {
        bail!(
            "op read failed for '{reference}': {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
