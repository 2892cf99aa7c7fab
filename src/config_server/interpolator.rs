//! Variable interpolation of `((placeholder))` references.
//!
//! A string that consists of a single placeholder is replaced by the variable
//! value of whatever JSON type it holds; placeholders embedded in longer text
//! are substituted as text. `((name.key))` selects a key of an object value and
//! `((!name))` is equivalent to `((name))`.

use super::client::{variable_path, ConfigServerClient};
use crate::deployment_plan::LinkSpec;
use regex::Regex;
use serde_json::Value;
use std::ops::Range;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Every variable that could not be resolved while interpolating one structure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .messages.join("\n"))]
pub struct InterpolationError {
    messages: Vec<String>,
}

impl InterpolationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;

/// Replaces variable placeholders with config-server values
pub trait VariablesInterpolator: Send + Sync {
    fn interpolate_template_spec_properties(
        &self,
        properties: &Value,
        deployment_name: &str,
    ) -> InterpolationResult<Value>;

    /// Link properties resolve relative names against the providing deployment
    fn interpolate_link_spec_properties(&self, link: &LinkSpec) -> InterpolationResult<Value>;

    fn interpolate_deployment_manifest(&self, manifest: &Value) -> InterpolationResult<Value>;

    /// Runtime configs are shared across deployments, so only absolute names resolve
    fn interpolate_runtime_manifest(&self, manifest: &Value) -> InterpolationResult<Value>;
}

/// Interpolator backed by a [`ConfigServerClient`]
#[derive(Clone)]
pub struct ConfigServerInterpolator {
    client: Arc<dyn ConfigServerClient>,
    director_name: String,
}

impl ConfigServerInterpolator {
    pub fn new(client: Arc<dyn ConfigServerClient>, director_name: impl Into<String>) -> Self {
        Self {
            client,
            director_name: director_name.into(),
        }
    }

    fn interpolate(&self, value: &Value, deployment: Option<&str>) -> InterpolationResult<Value> {
        if !self.client.enabled() {
            return Ok(value.clone());
        }

        let mut errors = Vec::new();
        let interpolated = self.walk(value, deployment, &mut errors);
        if errors.is_empty() {
            Ok(interpolated)
        } else {
            Err(InterpolationError::new(errors))
        }
    }

    fn walk(&self, value: &Value, deployment: Option<&str>, errors: &mut Vec<String>) -> Value {
        match value {
            Value::String(text) => self.substitute(text, deployment, errors),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.walk(item, deployment, errors))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.walk(item, deployment, errors)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn substitute(&self, text: &str, deployment: Option<&str>, errors: &mut Vec<String>) -> Value {
        let found = placeholders(text);
        if found.is_empty() {
            return Value::String(text.to_string());
        }

        if found.len() == 1 && found[0].0 == (0..text.len()) {
            return match self.resolve(found[0].1, deployment) {
                Ok(value) => value,
                Err(message) => {
                    record(errors, message);
                    Value::String(text.to_string())
                }
            };
        }

        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;
        for (range, name) in found {
            output.push_str(&text[cursor..range.start]);
            match self.resolve(name, deployment) {
                Ok(Value::String(resolved)) => output.push_str(&resolved),
                Ok(resolved) => output.push_str(&resolved.to_string()),
                Err(message) => {
                    record(errors, message);
                    output.push_str(&text[range.clone()]);
                }
            }
            cursor = range.end;
        }
        output.push_str(&text[cursor..]);
        Value::String(output)
    }

    fn resolve(&self, name: &str, deployment: Option<&str>) -> Result<Value, String> {
        let name = name.trim_start_matches('!');
        let mut segments = name.split('.');
        let base = segments.next().unwrap_or(name);

        let path = match deployment {
            Some(deployment) => variable_path(&self.director_name, deployment, base),
            None if base.starts_with('/') => base.to_string(),
            None => {
                return Err(format!(
                    "Relative variable '{base}' is not allowed in runtime config, use an absolute path"
                ))
            }
        };

        let mut value = self.client.get(&path).map_err(|error| error.to_string())?;
        for key in segments {
            value = value
                .get(key)
                .cloned()
                .ok_or_else(|| format!("Failed to find key '{key}' in variable '{path}'"))?;
        }
        Ok(value)
    }
}

impl VariablesInterpolator for ConfigServerInterpolator {
    fn interpolate_template_spec_properties(
        &self,
        properties: &Value,
        deployment_name: &str,
    ) -> InterpolationResult<Value> {
        self.interpolate(properties, Some(deployment_name))
    }

    fn interpolate_link_spec_properties(&self, link: &LinkSpec) -> InterpolationResult<Value> {
        self.interpolate(&link.properties, Some(&link.provider_deployment))
    }

    fn interpolate_deployment_manifest(&self, manifest: &Value) -> InterpolationResult<Value> {
        let deployment_name = manifest
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                InterpolationError::new(vec![
                    "Deployment manifest must contain a 'name'".to_string()
                ])
            })?;
        self.interpolate(manifest, Some(deployment_name))
    }

    fn interpolate_runtime_manifest(&self, manifest: &Value) -> InterpolationResult<Value> {
        self.interpolate(manifest, None)
    }
}

fn record(errors: &mut Vec<String>, message: String) {
    if !errors.contains(&message) {
        errors.push(message);
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(\(([-\w/.!]+)\)\)").expect("valid placeholder pattern"))
}

/// Byte ranges and names of every `((name))` in `text`
fn placeholders(text: &str) -> Vec<(Range<usize>, &str)> {
    placeholder_pattern()
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let name = captures.get(1)?;
            Some((whole.range(), name.as_str()))
        })
        .collect()
}
