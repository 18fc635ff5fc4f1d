//! Environment option settings and tags supplied on the command line.

use crate::error::DeployResult;
use platform::{OptionSetting, Tag};
use std::path::Path;

/// Loads a list of option settings from a YAML or JSON file.
///
/// ```yaml
/// - Namespace: aws:autoscaling:asg
///   OptionName: MinSize
///   Value: "2"
/// ```
pub fn load_option_settings(path: impl AsRef<Path>) -> DeployResult<Vec<OptionSetting>> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    parse_option_settings(&contents)
}

pub fn parse_option_settings(contents: &str) -> DeployResult<Vec<OptionSetting>> {
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(contents)?)
}

/// Parses `KEY=VALUE`. Used as a clap value parser.
pub fn parse_tag(raw: &str) -> Result<Tag, String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok(Tag::new(key.trim(), value.trim())),
        _ => Err(format!("Invalid tag '{}', expected KEY=VALUE", raw)),
    }
}
