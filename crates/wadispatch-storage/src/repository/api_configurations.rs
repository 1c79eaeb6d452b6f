//! API configuration repository
//!
//! Tokens never travel in plain text through table writes: inserts go
//! through the encrypting procedure and token changes are encrypted first.

use crate::backend::{decode, decode_all, Backend, Order, Query, RemoteProcedure, ResourceKind};
use crate::models::{ApiConfiguration, ApiConfigurationForm, ApiCredentials};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use wadispatch_common::types::{ApiConfigId, ConnectionStatus};
use wadispatch_common::{Error, Result};

#[derive(Clone)]
pub struct ApiConfigurationRepository {
    backend: Arc<dyn Backend>,
}

/// Empty optional text is stored as null
fn non_empty(value: &Option<String>) -> Value {
    match value.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => json!(s),
        _ => Value::Null,
    }
}

impl ApiConfigurationRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    async fn list_where(&self, query: Query) -> Result<Vec<ApiConfiguration>> {
        let user_id = self.backend.require_user()?;
        let rows = self
            .backend
            .list(
                ResourceKind::ApiConfigurations,
                &query
                    .eq("user_id", user_id)
                    .order_by("created_at", Order::Desc),
            )
            .await?;
        decode_all(rows)
    }

    /// Every configuration of the user, newest first
    pub async fn list(&self) -> Result<Vec<ApiConfiguration>> {
        self.list_where(Query::new()).await
    }

    /// Configurations usable by new campaigns
    pub async fn list_active(&self) -> Result<Vec<ApiConfiguration>> {
        self.list_where(Query::new().eq("is_active", true)).await
    }

    pub async fn get(&self, id: ApiConfigId) -> Result<Option<ApiConfiguration>> {
        Ok(self.list_where(Query::by_id(id)).await?.into_iter().next())
    }

    /// Insert through the encrypting procedure and read the row back
    pub async fn insert(&self, form: &ApiConfigurationForm) -> Result<ApiConfiguration> {
        let user_id = self.backend.require_user()?;

        let id = self
            .backend
            .invoke(
                RemoteProcedure::InsertApiConfig,
                json!({
                    "p_user_id": user_id,
                    "p_name": form.name,
                    "p_api_type": form.api_type,
                    "p_instance_name": non_empty(&form.instance_name),
                    "p_access_token": form.access_token,
                    "p_phone_number": non_empty(&form.phone_number),
                    "p_phone_number_id": non_empty(&form.phone_number_id),
                    "p_base_url": non_empty(&form.base_url),
                }),
            )
            .await?;
        let id: Uuid = serde_json::from_value(id)
            .map_err(|e| Error::Backend(format!("Insert returned no configuration id: {}", e)))?;

        let config = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("api configuration {}", id)))?;
        info!(api_config_id = %config.id, api_type = %config.api_type, "API configuration created");
        Ok(config)
    }

    /// Apply an edit; a blank token keeps the stored one
    pub async fn update(
        &self,
        id: ApiConfigId,
        form: &ApiConfigurationForm,
    ) -> Result<ApiConfiguration> {
        self.require(id).await?;

        let mut patch = json!({
            "name": form.name,
            "api_type": form.api_type,
            "instance_name": non_empty(&form.instance_name),
            "phone_number": non_empty(&form.phone_number),
            "phone_number_id": non_empty(&form.phone_number_id),
            "base_url": non_empty(&form.base_url),
        });

        if !form.access_token.trim().is_empty() {
            patch["access_token"] = json!(self.encrypt_token(&form.access_token).await?);
        }

        decode(
            self.backend
                .update(ResourceKind::ApiConfigurations, id, patch)
                .await?,
        )
    }

    pub async fn set_active(&self, id: ApiConfigId, is_active: bool) -> Result<ApiConfiguration> {
        self.require(id).await?;
        decode(
            self.backend
                .update(
                    ResourceKind::ApiConfigurations,
                    id,
                    json!({ "is_active": is_active }),
                )
                .await?,
        )
    }

    /// Record the outcome of a connection test
    pub async fn record_test(
        &self,
        id: ApiConfigId,
        status: ConnectionStatus,
    ) -> Result<ApiConfiguration> {
        self.require(id).await?;
        decode(
            self.backend
                .update(
                    ResourceKind::ApiConfigurations,
                    id,
                    json!({ "connection_status": status, "last_tested_at": Utc::now() }),
                )
                .await?,
        )
    }

    pub async fn delete(&self, id: ApiConfigId) -> Result<()> {
        let user_id = self.backend.require_user()?;
        self.backend
            .delete_matching(
                ResourceKind::ApiConfigurations,
                &Query::by_id(id).eq("user_id", user_id),
            )
            .await
    }

    /// Ciphertext for a plain token
    pub async fn encrypt_token(&self, token: &str) -> Result<String> {
        self.backend.require_user()?;
        match self
            .backend
            .invoke(RemoteProcedure::EncryptToken, json!({ "token": token }))
            .await?
        {
            Value::String(cipher) => Ok(cipher),
            other => Err(Error::Backend(format!(
                "Unexpected encrypt_token result: {}",
                other
            ))),
        }
    }

    /// Configuration with its decrypted token
    pub async fn credentials(&self, id: ApiConfigId) -> Result<Option<ApiCredentials>> {
        self.backend.require_user()?;
        let rows = self
            .backend
            .invoke(
                RemoteProcedure::GetApiConfigWithToken,
                json!({ "config_id": id }),
            )
            .await?;

        match rows {
            Value::Array(rows) => rows.into_iter().next().map(decode).transpose(),
            Value::Null => Ok(None),
            row @ Value::Object(_) => decode(row).map(Some),
            other => Err(Error::Backend(format!(
                "Unexpected get_api_config_with_token result: {}",
                other
            ))),
        }
    }

    async fn require(&self, id: ApiConfigId) -> Result<ApiConfiguration> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("api configuration {}", id)))
    }
}
