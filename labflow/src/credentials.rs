//! Credentials for protected resources
//!
//! Stages name the resources they need; the binary resolves them through a
//! [`CredentialProvider`] before running anything.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::AuthError;

/// A secret value. `Debug` never shows it.
#[derive(Clone, PartialEq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

pub trait CredentialProvider {
    fn get_credential(&self, resource: &str) -> Result<Secret, AuthError>;
}

/// Reads `LABFLOW_CREDENTIAL_<RESOURCE>` from the environment
///
/// `.env` is loaded by the binary at startup, so values may live there.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    /// `license-server.lab` -> `LABFLOW_CREDENTIAL_LICENSE_SERVER_LAB`
    pub fn variable_for(resource: &str) -> String {
        let suffix: String = resource
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("LABFLOW_CREDENTIAL_{}", suffix)
    }
}

impl CredentialProvider for EnvCredentials {
    fn get_credential(&self, resource: &str) -> Result<Secret, AuthError> {
        let variable = Self::variable_for(resource);
        match std::env::var(&variable) {
            Ok(value) if value.trim().is_empty() => Err(AuthError::Denied {
                resource: resource.to_string(),
                reason: format!("{} is empty", variable),
            }),
            Ok(value) => Ok(Secret::new(value)),
            Err(std::env::VarError::NotPresent) => Err(AuthError::Missing {
                resource: resource.to_string(),
                variable,
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(AuthError::Denied {
                resource: resource.to_string(),
                reason: format!("{} is not valid UTF-8", variable),
            }),
        }
    }
}

/// Fixed in-memory credentials
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    secrets: HashMap<String, Secret>,
}

impl StaticCredentials {
    pub fn with(mut self, resource: &str, secret: &str) -> Self {
        self.secrets
            .insert(resource.to_string(), Secret::new(secret));
        self
    }
}

impl From<BTreeMap<String, Secret>> for StaticCredentials {
    fn from(resolved: BTreeMap<String, Secret>) -> Self {
        Self {
            secrets: resolved.into_iter().collect(),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn get_credential(&self, resource: &str) -> Result<Secret, AuthError> {
        self.secrets
            .get(resource)
            .cloned()
            .ok_or_else(|| AuthError::Missing {
                resource: resource.to_string(),
                variable: "<static>".to_string(),
            })
    }
}

/// Resolve every resource up front; the first failure wins
pub fn resolve_all(
    provider: &dyn CredentialProvider,
    resources: &[String],
) -> Result<BTreeMap<String, Secret>, AuthError> {
    let mut resolved = BTreeMap::new();
    for resource in resources {
        let secret = provider.get_credential(resource)?;
        tracing::debug!(%resource, "resolved credential");
        resolved.insert(resource.clone(), secret);
    }
    Ok(resolved)
}
