//! In-process backend for tests and offline use

use crate::backend::{Backend, Order, Query, RemoteProcedure, ResourceKind};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;
use wadispatch_common::types::UserId;
use wadispatch_common::{Error, Result};

/// Handler standing in for a remote procedure
pub type ProcedureHandler = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

const CIPHER_PREFIX: &str = "enc:";

/// Backend keeping every table in memory.
///
/// Database procedures (encrypting insert, token encryption, decrypting
/// lookup) are emulated with a reversible `enc:` marker. Edge functions
/// must be registered with [`MemoryBackend::with_procedure`].
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<ResourceKind, Vec<Value>>>,
    procedures: HashMap<RemoteProcedure, ProcedureHandler>,
    user_id: Option<UserId>,
}

impl MemoryBackend {
    /// Unauthenticated, empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with a signed-in user
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Register (or override) a remote procedure
    pub fn with_procedure<F>(mut self, procedure: RemoteProcedure, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.procedures.insert(procedure, Arc::new(handler));
        self
    }

    /// Snapshot of a table
    pub async fn rows(&self, kind: ResourceKind) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Insert a row, filling in id and timestamps when missing
    async fn insert(&self, kind: ResourceKind, row: Value) -> Result<Value> {
        let Value::Object(mut fields) = row else {
            return Err(Error::Validation(format!(
                "Row for {} must be a JSON object",
                kind
            )));
        };

        let now = json!(Utc::now());
        fields
            .entry("id")
            .or_insert_with(|| json!(Uuid::new_v4()));
        fields.entry("created_at").or_insert_with(|| now.clone());
        fields.entry("updated_at").or_insert(now);

        let row = Value::Object(fields);
        self.tables
            .write()
            .await
            .entry(kind)
            .or_default()
            .push(row.clone());

        Ok(row)
    }

    async fn insert_api_config(&self, args: Value) -> Result<Value> {
        let arg = |name: &str| args.get(name).cloned().unwrap_or(Value::Null);
        let token = args
            .get("p_access_token")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let row = self
            .insert(
                ResourceKind::ApiConfigurations,
                json!({
                    "user_id": arg("p_user_id"),
                    "name": arg("p_name"),
                    "api_type": arg("p_api_type"),
                    "instance_name": arg("p_instance_name"),
                    "access_token": encrypt(token),
                    "phone_number": arg("p_phone_number"),
                    "phone_number_id": arg("p_phone_number_id"),
                    "base_url": arg("p_base_url"),
                    "is_active": true,
                    "connection_status": "unknown",
                    "last_tested_at": null,
                }),
            )
            .await?;

        Ok(row.get("id").cloned().unwrap_or(Value::Null))
    }

    async fn api_config_with_token(&self, args: Value) -> Result<Value> {
        let config_id = args
            .get("config_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut query = Query::new().eq("id", config_id);
        if let Some(user_id) = self.user_id {
            query = query.eq("user_id", user_id);
        }

        let rows = self
            .list(ResourceKind::ApiConfigurations, &query)
            .await?
            .into_iter()
            .map(|mut row| {
                if let Some(token) = row.get("access_token").and_then(Value::as_str) {
                    let plain = token.strip_prefix(CIPHER_PREFIX).unwrap_or(token).to_string();
                    row["access_token"] = Value::String(plain);
                }
                row
            })
            .collect();

        Ok(Value::Array(rows))
    }
}

fn encrypt(token: &str) -> String {
    format!("{}{}", CIPHER_PREFIX, token)
}

/// Ordering over JSON scalars: nulls first, numbers numerically,
/// everything else by string form
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn merge(row: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        row.insert(key, value);
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    async fn list(&self, kind: ResourceKind, query: &Query) -> Result<Vec<Value>> {
        let mut rows: Vec<Value> = self
            .tables
            .read()
            .await
            .get(&kind)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if !query.order.is_empty() {
            rows.sort_by(|a, b| {
                query
                    .order
                    .iter()
                    .map(|(column, order)| {
                        let ordering = compare_values(a.get(column), b.get(column));
                        match order {
                            Order::Asc => ordering,
                            Order::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn create(&self, kind: ResourceKind, row: Value) -> Result<Value> {
        self.insert(kind, row).await
    }

    async fn update(&self, kind: ResourceKind, id: Uuid, patch: Value) -> Result<Value> {
        let Value::Object(patch) = patch else {
            return Err(Error::Validation(format!(
                "Patch for {} must be a JSON object",
                kind
            )));
        };

        let mut tables = self.tables.write().await;
        let by_id = Query::by_id(id);
        let row = tables
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|r| by_id.matches(r)))
            .ok_or_else(|| Error::NotFound(format!("{} {}", kind, id)))?;

        if let Value::Object(fields) = row {
            merge(fields, patch);
            fields.insert("updated_at".to_string(), json!(Utc::now()));
        }

        Ok(row.clone())
    }

    async fn delete_matching(&self, kind: ResourceKind, query: &Query) -> Result<()> {
        if query.filters.is_empty() {
            return Err(Error::Validation(format!(
                "Refusing unfiltered delete on {}",
                kind
            )));
        }

        if let Some(rows) = self.tables.write().await.get_mut(&kind) {
            let before = rows.len();
            rows.retain(|r| !query.matches(r));
            debug!(table = %kind, removed = before - rows.len(), "Deleted rows");
        }

        Ok(())
    }

    async fn invoke(&self, procedure: RemoteProcedure, args: Value) -> Result<Value> {
        if let Some(handler) = self.procedures.get(&procedure) {
            return handler(args);
        }

        match procedure {
            RemoteProcedure::InsertApiConfig => self.insert_api_config(args).await,
            RemoteProcedure::EncryptToken => {
                let token = args.get("token").and_then(Value::as_str).unwrap_or_default();
                Ok(Value::String(encrypt(token)))
            }
            RemoteProcedure::GetApiConfigWithToken => self.api_config_with_token(args).await,
            RemoteProcedure::TestApiConnection => Err(Error::Backend(format!(
                "Remote procedure {} is not available",
                procedure.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let backend = MemoryBackend::new();
        let row = backend
            .create(ResourceKind::Campaigns, json!({ "name": "Promo" }))
            .await
            .unwrap();

        assert!(row["id"].as_str().is_some());
        assert!(row["created_at"].as_str().is_some());
        assert_eq!(backend.rows(ResourceKind::Campaigns).await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_orders_and_limits() {
        let backend = MemoryBackend::new();
        for (campaign, index) in [("a", 2), ("a", 0), ("b", 1), ("a", 1)] {
            backend
                .create(
                    ResourceKind::CampaignMessages,
                    json!({ "campaign_id": campaign, "order_index": index }),
                )
                .await
                .unwrap();
        }

        let rows = backend
            .list(
                ResourceKind::CampaignMessages,
                &Query::new()
                    .eq("campaign_id", "a")
                    .order_by("order_index", Order::Desc)
                    .limit(2),
            )
            .await
            .unwrap();

        let indexes: Vec<_> = rows.iter().map(|r| r["order_index"].clone()).collect();
        assert_eq!(indexes, vec![json!(2), json!(1)]);
    }

    #[tokio::test]
    async fn test_list_breaks_ties_with_later_keys() {
        let backend = MemoryBackend::new();
        let stamp = "2024-05-01T10:00:00Z";
        for id in ["b", "c", "a"] {
            backend
                .create(
                    ResourceKind::CampaignContacts,
                    json!({ "id": id, "created_at": stamp }),
                )
                .await
                .unwrap();
        }

        let rows = backend
            .list(
                ResourceKind::CampaignContacts,
                &Query::new()
                    .order_by("created_at", Order::Asc)
                    .order_by("id", Order::Asc),
            )
            .await
            .unwrap();

        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[tokio::test]
    async fn test_update_merges_and_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let row = backend
            .create(
                ResourceKind::Campaigns,
                json!({ "name": "Promo", "status": "draft" }),
            )
            .await
            .unwrap();
        let id: Uuid = serde_json::from_value(row["id"].clone()).unwrap();

        let updated = backend
            .update(ResourceKind::Campaigns, id, json!({ "status": "running" }))
            .await
            .unwrap();
        assert_eq!(updated["name"], "Promo");
        assert_eq!(updated["status"], "running");

        let err = backend
            .update(ResourceKind::Campaigns, Uuid::new_v4(), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_matching() {
        let backend = MemoryBackend::new();
        for campaign in ["a", "b", "a"] {
            backend
                .create(
                    ResourceKind::CampaignContacts,
                    json!({ "campaign_id": campaign }),
                )
                .await
                .unwrap();
        }

        backend
            .delete_matching(
                ResourceKind::CampaignContacts,
                &Query::new().eq("campaign_id", "a"),
            )
            .await
            .unwrap();

        assert_eq!(backend.rows(ResourceKind::CampaignContacts).await.len(), 1);
        assert!(backend
            .delete_matching(ResourceKind::CampaignContacts, &Query::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_token_procedures_round_trip() {
        let user = Uuid::new_v4();
        let backend = MemoryBackend::new().with_user(user);

        let id = backend
            .invoke(
                RemoteProcedure::InsertApiConfig,
                json!({
                    "p_user_id": user,
                    "p_name": "Main",
                    "p_api_type": "meta_cloud",
                    "p_access_token": "secret",
                    "p_phone_number_id": "1234",
                }),
            )
            .await
            .unwrap();

        let stored = backend.rows(ResourceKind::ApiConfigurations).await;
        assert_eq!(stored[0]["access_token"], "enc:secret");

        let rows = backend
            .invoke(
                RemoteProcedure::GetApiConfigWithToken,
                json!({ "config_id": id }),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["access_token"], "secret");
        assert_eq!(rows[0]["phone_number_id"], "1234");

        let cipher = backend
            .invoke(RemoteProcedure::EncryptToken, json!({ "token": "other" }))
            .await
            .unwrap();
        assert_eq!(cipher, json!("enc:other"));
    }

    #[tokio::test]
    async fn test_edge_function_requires_handler() {
        let backend = MemoryBackend::new();
        assert!(backend
            .invoke(RemoteProcedure::TestApiConnection, json!({}))
            .await
            .is_err());

        let backend = MemoryBackend::new().with_procedure(RemoteProcedure::TestApiConnection, |_| {
            Ok(json!({ "success": true, "message": "ok" }))
        });
        let result = backend
            .invoke(RemoteProcedure::TestApiConnection, json!({}))
            .await
            .unwrap();
        assert_eq!(result["success"], true);
    }
}
