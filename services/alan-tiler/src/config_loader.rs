//! Configuration loader for the ALAN tiler.
//!
//! Reads the pipeline YAML file, then the metadata attribute file it names.
//!
//! Supports environment variable substitution using ${VAR} syntax and `~`
//! expansion in input paths.

use std::fs;
use std::path::{Path, PathBuf};

use alan_tiles::PipelineConfig;
use anyhow::{Context, Result};

/// Load a pipeline configuration file.
///
/// The metadata file, when relative, is resolved against the directory of
/// `path`. The result is not validated; command-line overrides are applied
/// first.
pub fn load_pipeline_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline config from {:?}", path))?;

    let expanded = expand_env_vars(&content)?;

    let mut config: PipelineConfig = serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse pipeline config from {:?}", path))?;

    expand_input_paths(&mut config);

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config
        .load_metadata_file(base_dir)
        .with_context(|| format!("Failed to load metadata file named in {:?}", path))?;

    Ok(config)
}

/// Expand a leading `~` in every configured path.
pub fn expand_input_paths(config: &mut PipelineConfig) {
    let inputs = &mut config.inputs;
    inputs.kd_dir = expand_path(&inputs.kd_dir);
    inputs.radiance_path = expand_path(&inputs.radiance_path);
    inputs.landmask_path = expand_path(&inputs.landmask_path);
    if let Some(file) = &config.output.metadata_file {
        config.output.metadata_file = Some(expand_path(file));
    }
}

/// `~` and `~/...` to the home directory; other paths unchanged.
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
