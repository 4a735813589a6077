use std::collections::BTreeMap;

use super::ConfigError;

/// Parses `key=value[,key=value]` into a label map.
pub(crate) fn parse_label_selector(
    selector: &str,
) -> Result<BTreeMap<String, String>, ConfigError> {
    selector
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(ConfigError::MalformedLabel(pair.to_string())),
        })
        .collect()
}

/// Renders labels in the equality-based selector syntax the API server expects.
pub(crate) fn render_label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}
