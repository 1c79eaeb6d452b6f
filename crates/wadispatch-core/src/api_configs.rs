//! API configuration management and connection testing

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use wadispatch_common::types::{ApiConfigId, ConnectionStatus};
use wadispatch_common::Error;
use wadispatch_storage::models::{ApiConfiguration, ApiConfigurationForm, ApiTestRequest, ApiTestResponse};
use wadispatch_storage::{ApiConfigurationRepository, Backend, RemoteProcedure};

/// One invalid form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Error, Debug)]
pub enum ApiConfigError {
    #[error("API configuration {0} not found")]
    NotFound(ApiConfigId),

    #[error("invalid API configuration: {}", join(.0))]
    Invalid(Vec<FieldError>),

    #[error("connection test failed: {0}")]
    Test(String),

    #[error(transparent)]
    Storage(#[from] Error),
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<ApiConfigError> for Error {
    fn from(err: ApiConfigError) -> Self {
        match err {
            ApiConfigError::Storage(e) => e,
            ApiConfigError::NotFound(id) => Error::NotFound(format!("API configuration {}", id)),
            ApiConfigError::Test(msg) => Error::Backend(msg),
            invalid @ ApiConfigError::Invalid(_) => Error::Validation(invalid.to_string()),
        }
    }
}

type Result<T> = std::result::Result<T, ApiConfigError>;

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Check a credential form; every failing field is reported
pub fn validate_form(form: &ApiConfigurationForm, editing: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if form.name.trim().is_empty() {
        errors.push(FieldError::new("name", "name is required"));
    }
    if !editing && form.access_token.trim().is_empty() {
        errors.push(FieldError::new("access_token", "access token is required"));
    }

    if form.api_type.is_evolution() {
        if is_blank(&form.instance_name) {
            errors.push(FieldError::new(
                "instance_name",
                "instance name is required for Evolution APIs",
            ));
        }
        if is_blank(&form.base_url) {
            errors.push(FieldError::new(
                "base_url",
                "base URL is required for Evolution APIs",
            ));
        }
    } else if is_blank(&form.phone_number_id) {
        errors.push(FieldError::new(
            "phone_number_id",
            "phone number ID is required for Meta Cloud",
        ));
    }

    errors
}

/// Manages the user's provider credentials
#[derive(Clone)]
pub struct ApiConfigManager {
    repo: ApiConfigurationRepository,
    backend: Arc<dyn Backend>,
}

impl ApiConfigManager {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            repo: ApiConfigurationRepository::new(backend.clone()),
            backend,
        }
    }

    pub async fn list(&self) -> Result<Vec<ApiConfiguration>> {
        Ok(self.repo.list().await?)
    }

    /// Configurations offered by the wizard's basic-info step
    pub async fn list_active(&self) -> Result<Vec<ApiConfiguration>> {
        Ok(self.repo.list_active().await?)
    }

    pub async fn create(&self, form: &ApiConfigurationForm) -> Result<ApiConfiguration> {
        let errors = validate_form(form, false);
        if !errors.is_empty() {
            return Err(ApiConfigError::Invalid(errors));
        }

        let config = self.repo.insert(form).await?;
        info!(config_id = %config.id, api_type = %config.api_type, "API configuration created");
        Ok(config)
    }

    pub async fn update(
        &self,
        id: ApiConfigId,
        form: &ApiConfigurationForm,
    ) -> Result<ApiConfiguration> {
        let errors = validate_form(form, true);
        if !errors.is_empty() {
            return Err(ApiConfigError::Invalid(errors));
        }
        Ok(self.repo.update(id, form).await.map_err(|e| self.not_found(id, e))?)
    }

    pub async fn set_active(&self, id: ApiConfigId, is_active: bool) -> Result<ApiConfiguration> {
        Ok(self
            .repo
            .set_active(id, is_active)
            .await
            .map_err(|e| self.not_found(id, e))?)
    }

    pub async fn delete(&self, id: ApiConfigId) -> Result<()> {
        self.repo.delete(id).await?;
        info!(config_id = %id, "API configuration deleted");
        Ok(())
    }

    /// Probe the provider and persist the resulting connection status
    pub async fn test_connection(&self, id: ApiConfigId) -> Result<ApiTestResponse> {
        let credentials = self
            .repo
            .credentials(id)
            .await?
            .ok_or(ApiConfigError::NotFound(id))?;

        let request = ApiTestRequest::from(credentials);
        let args = serde_json::to_value(&request).map_err(Error::from)?;

        let response = match self
            .backend
            .invoke(RemoteProcedure::TestApiConnection, args)
            .await
            .and_then(|value| Ok(serde_json::from_value::<ApiTestResponse>(value)?))
        {
            Ok(response) => response,
            Err(err) => {
                warn!(config_id = %id, "Connection test could not run: {}", err);
                self.repo.record_test(id, ConnectionStatus::Error).await?;
                return Err(ApiConfigError::Test(err.to_string()));
            }
        };

        let status = if response.success {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Error
        };
        self.repo.record_test(id, status).await?;

        if response.success {
            info!(config_id = %id, "API connection test succeeded");
        } else {
            warn!(config_id = %id, "API connection test failed: {}", response.message);
        }
        Ok(response)
    }

    fn not_found(&self, id: ApiConfigId, err: Error) -> ApiConfigError {
        match err {
            Error::NotFound(_) => ApiConfigError::NotFound(id),
            other => ApiConfigError::Storage(other),
        }
    }
}
