//! Config server clients.

use crate::deployment_plan::Variables;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigServerError {
    #[error("Failed to find variable '{name}' from config server: HTTP code '{http_code}'")]
    VariableNotFound { name: String, http_code: u16 },
    #[error("Failed to generate value for variable '{name}': unsupported type '{kind}'")]
    UnsupportedType { name: String, kind: String },
    #[error("Config server is disabled")]
    Disabled,
}

/// Full config-server path of a variable.
///
/// Absolute names are kept as-is; relative names are scoped to the director
/// and deployment.
pub fn variable_path(director_name: &str, deployment_name: &str, name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{director_name}/{deployment_name}/{name}")
    }
}

/// Resolves and generates variable values
pub trait ConfigServerClient: Send + Sync {
    /// A disabled client leaves placeholders untouched
    fn enabled(&self) -> bool {
        true
    }

    /// Fetch the current value stored at an absolute variable path
    fn get(&self, path: &str) -> Result<Value, ConfigServerError>;

    /// Make sure every declared variable has a value for the deployment
    fn generate_values(
        &self,
        variables: &Variables,
        deployment_name: &str,
    ) -> Result<(), ConfigServerError>;
}

/// Hands out the client used for a given deployment
pub trait ConfigServerClientFactory: Send + Sync {
    fn create_client(&self, deployment_name: &str) -> Arc<dyn ConfigServerClient>;
}

/// Client used when no config server is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledClient;

impl ConfigServerClient for DisabledClient {
    fn enabled(&self) -> bool {
        false
    }

    fn get(&self, _path: &str) -> Result<Value, ConfigServerError> {
        Err(ConfigServerError::Disabled)
    }

    fn generate_values(
        &self,
        _variables: &Variables,
        _deployment_name: &str,
    ) -> Result<(), ConfigServerError> {
        Ok(())
    }
}

/// Config server backed by a process-local map
#[derive(Debug, Default)]
pub struct InMemoryConfigServer {
    director_name: String,
    values: RwLock<HashMap<String, Value>>,
}

impl InMemoryConfigServer {
    pub fn new(director_name: impl Into<String>) -> Self {
        Self {
            director_name: director_name.into(),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Store a value at an absolute path
    pub fn put(&self, path: impl Into<String>, value: Value) {
        self.values.write().insert(path.into(), value);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values.read().contains_key(path)
    }

    fn generate(name: &str, kind: &str) -> Result<Value, ConfigServerError> {
        match kind {
            "password" => Ok(Value::String(Uuid::new_v4().simple().to_string())),
            "uuid" => Ok(Value::String(Uuid::new_v4().to_string())),
            other => Err(ConfigServerError::UnsupportedType {
                name: name.to_string(),
                kind: other.to_string(),
            }),
        }
    }
}

impl ConfigServerClient for InMemoryConfigServer {
    fn get(&self, path: &str) -> Result<Value, ConfigServerError> {
        self.values
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| ConfigServerError::VariableNotFound {
                name: path.to_string(),
                http_code: 404,
            })
    }

    fn generate_values(
        &self,
        variables: &Variables,
        deployment_name: &str,
    ) -> Result<(), ConfigServerError> {
        let mut values = self.values.write();
        for variable in variables.iter() {
            let path = variable_path(&self.director_name, deployment_name, &variable.name);
            if values.contains_key(&path) {
                continue;
            }
            let value = Self::generate(&path, &variable.kind)?;
            debug!(variable = %path, kind = %variable.kind, "Generated config server value");
            values.insert(path, value);
        }
        Ok(())
    }
}

/// Factory returning the same client for every deployment
#[derive(Clone)]
pub struct SharedClientFactory {
    client: Arc<dyn ConfigServerClient>,
}

impl SharedClientFactory {
    pub fn new(client: Arc<dyn ConfigServerClient>) -> Self {
        Self { client }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledClient))
    }
}

impl ConfigServerClientFactory for SharedClientFactory {
    fn create_client(&self, _deployment_name: &str) -> Arc<dyn ConfigServerClient> {
        Arc::clone(&self.client)
    }
}
