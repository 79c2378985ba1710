use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::config::DecodeConfig;

pub fn save_config(path: &Path, config: &DecodeConfig) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, config)
        .with_context(|| format!("failed to write {:?}", path))?;
    Ok(())
}

/// Load a decode config; fields absent from the file keep their defaults.
pub fn load_config(path: &Path) -> Result<DecodeConfig> {
    let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
    let reader = BufReader::new(file);
    let config: DecodeConfig =
        serde_json::from_reader(reader).with_context(|| format!("failed to parse {:?}", path))?;
    config
        .validate()
        .with_context(|| format!("invalid config in {:?}", path))?;
    Ok(config)
}
