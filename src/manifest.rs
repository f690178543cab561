//! Manifest parsing and batch conversion
//!
//! Parses assets.toml and coordinates character conversion.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub characters: HashMap<String, CharacterEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("assets/")
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CharacterEntry {
    Simple(PathBuf),
    Detailed { path: PathBuf },
}

impl CharacterEntry {
    pub fn path(&self) -> &Path {
        match self {
            CharacterEntry::Simple(p) => p,
            CharacterEntry::Detailed { path } => path,
        }
    }
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let manifest: Manifest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    Ok(manifest)
}

/// Validate a manifest without building
pub fn validate(manifest: &Manifest) -> Result<()> {
    for (name, entry) in &manifest.characters {
        if !entry.path().exists() {
            anyhow::bail!("Character '{}' source not found: {:?}", name, entry.path());
        }
    }
    Ok(())
}

/// Convert every character in the manifest
pub fn build_all(manifest: &Manifest, output_override: Option<&Path>) -> Result<()> {
    let output_dir = output_override.unwrap_or(&manifest.output.dir);
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir: {:?}", output_dir))?;

    for (name, entry) in &manifest.characters {
        let base = output_dir.join(name);
        tracing::info!("Converting character: {} -> {:?}", name, base);
        crate::convert::convert_dae(entry.path(), &base)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest_entries() {
        let manifest: Manifest = toml::from_str(
            r#"
            [output]
            dir = "build/chars"

            [characters]
            hero = "Walking.dae"
            villain = { path = "models/Villain.dae" }
            "#,
        )
        .unwrap();

        assert_eq!(manifest.output.dir, PathBuf::from("build/chars"));
        assert_eq!(manifest.characters.len(), 2);
        assert_eq!(
            manifest.characters["hero"].path(),
            Path::new("Walking.dae")
        );
        assert_eq!(
            manifest.characters["villain"].path(),
            Path::new("models/Villain.dae")
        );
    }

    #[test]
    fn test_output_dir_defaults() {
        let manifest: Manifest = toml::from_str("[characters]\n").unwrap();
        assert_eq!(manifest.output.dir, PathBuf::from("assets/"));
    }

    #[test]
    fn test_validate_missing_source() {
        let manifest: Manifest = toml::from_str(
            r#"
            [characters]
            ghost = "does-not-exist.dae"
            "#,
        )
        .unwrap();
        assert!(validate(&manifest).is_err());
    }
}
