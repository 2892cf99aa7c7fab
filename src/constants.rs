//! Shared string constants for audit events, options and deployment paths.

/// Object type recorded on deployment audit events
pub const DEPLOYMENT_OBJECT_TYPE: &str = "deployment";

/// Audit event actions
pub mod actions {
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
}

/// Keys of the deploy options map
pub mod options {
    pub const DEPLOY: &str = "deploy";
    pub const DRY_RUN: &str = "dry_run";
    pub const NEW: &str = "new";
}

/// Canonical resource path returned by a successful run
pub fn deployment_path(deployment_name: &str) -> String {
    format!("/deployments/{deployment_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_path() {
        assert_eq!(deployment_path("deployment-name"), "/deployments/deployment-name");
    }
}
