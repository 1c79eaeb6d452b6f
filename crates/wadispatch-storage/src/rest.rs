//! REST backend speaking the hosted database's HTTP conventions

use crate::backend::{Backend, Query, RemoteProcedure, ResourceKind};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;
use wadispatch_common::config::BackendConfig;
use wadispatch_common::types::UserId;
use wadispatch_common::{Error, Result};

/// Backend reached over HTTP.
///
/// Table reads and writes go to `/rest/v1/<table>`, database procedures to
/// `/rest/v1/rpc/<prefix><name>` and edge functions to `/functions/v1/<name>`.
pub struct RestBackend {
    base_url: String,
    api_key: Option<String>,
    access_token: Option<String>,
    user_id: Option<UserId>,
    table_prefix: String,
    client: Client,
}

impl RestBackend {
    /// Create a backend client from configuration
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = config
            .url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::Config("backend.url is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
            user_id: config.user_id,
            table_prefix: config.table_prefix.clone(),
            client,
        })
    }

    fn table_path(&self, kind: ResourceKind) -> String {
        format!("/rest/v1/{}", kind.table(&self.table_prefix))
    }

    fn procedure_path(&self, procedure: RemoteProcedure) -> String {
        if procedure.is_edge_function() {
            format!("/functions/v1/{}", procedure.name())
        } else {
            format!("/rest/v1/rpc/{}{}", self.table_prefix, procedure.name())
        }
    }

    /// Build a request carrying the project key and the session token
    fn build_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);

        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        if let Some(token) = self.access_token.as_ref().or(self.api_key.as_ref()) {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        request
    }

    /// PostgREST query-string parameters for a read or filtered write
    fn query_params(query: &Query) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = query
            .filters
            .iter()
            .map(|f| (f.column.clone(), format!("eq.{}", f.value)))
            .collect();

        if !query.order.is_empty() {
            let keys: Vec<String> = query
                .order
                .iter()
                .map(|(column, order)| format!("{}.{}", column, order.as_str()))
                .collect();
            params.push(("order".to_string(), keys.join(",")));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Backend(format!("{} request failed: {}", context, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|e| {
            warn!("Failed to read backend error body: {}", e);
            String::new()
        });
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);

        warn!(context, status = %status, "Backend request failed: {}", message);

        Err(match status {
            StatusCode::UNAUTHORIZED => Error::Auth(message),
            StatusCode::FORBIDDEN => Error::PermissionDenied(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            _ => Error::Backend(format!("{} failed ({}): {}", context, status, message)),
        })
    }

    async fn json(response: Response, context: &str) -> Result<Value> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Backend(format!("Failed to read {} response: {}", context, e)))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Representation responses are arrays; take the first row
    fn first_row(value: Value, what: &str) -> Result<Value> {
        match value {
            Value::Array(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| Error::NotFound(what.to_string())),
            Value::Null => Err(Error::NotFound(what.to_string())),
            other => Ok(other),
        }
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    async fn list(&self, kind: ResourceKind, query: &Query) -> Result<Vec<Value>> {
        debug!(table = %kind, filters = query.filters.len(), "Listing rows");

        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(Self::query_params(query));

        let request = self
            .build_request(Method::GET, &self.table_path(kind))
            .query(&params);
        let response = self.send(request, "list").await?;

        match Self::json(response, "list").await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Err(Error::Backend(format!(
                "Unexpected list response for {}: {}",
                kind, other
            ))),
        }
    }

    async fn create(&self, kind: ResourceKind, row: Value) -> Result<Value> {
        let request = self
            .build_request(Method::POST, &self.table_path(kind))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(request, "create").await?;
        Self::first_row(Self::json(response, "create").await?, kind.suffix())
    }

    async fn create_batch(&self, kind: ResourceKind, rows: Vec<Value>) -> Result<Vec<Value>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        debug!(table = %kind, count = rows.len(), "Inserting rows");

        let request = self
            .build_request(Method::POST, &self.table_path(kind))
            .header("Prefer", "return=representation")
            .json(&rows);
        let response = self.send(request, "create").await?;

        match Self::json(response, "create").await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    async fn update(&self, kind: ResourceKind, id: Uuid, patch: Value) -> Result<Value> {
        let request = self
            .build_request(Method::PATCH, &self.table_path(kind))
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id))])
            .json(&patch);
        let response = self.send(request, "update").await?;
        Self::first_row(
            Self::json(response, "update").await?,
            &format!("{} {}", kind, id),
        )
    }

    async fn delete_matching(&self, kind: ResourceKind, query: &Query) -> Result<()> {
        if query.filters.is_empty() {
            return Err(Error::Validation(format!(
                "Refusing unfiltered delete on {}",
                kind
            )));
        }

        let request = self
            .build_request(Method::DELETE, &self.table_path(kind))
            .query(&Self::query_params(query));
        self.send(request, "delete").await?;
        Ok(())
    }

    async fn invoke(&self, procedure: RemoteProcedure, args: Value) -> Result<Value> {
        debug!(procedure = procedure.name(), "Invoking remote procedure");

        let request = self
            .build_request(Method::POST, &self.procedure_path(procedure))
            .json(&args);
        let response = self.send(request, procedure.name()).await?;
        Self::json(response, procedure.name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Order;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> RestBackend {
        let config = BackendConfig {
            url: Some(server.uri()),
            api_key: Some("anon-key".to_string()),
            access_token: Some("session-jwt".to_string()),
            user_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        RestBackend::new(&config).unwrap()
    }

    #[test]
    fn test_missing_url_is_config_error() {
        let err = RestBackend::new(&BackendConfig::default()).err().unwrap();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_list_sends_filters_and_headers() {
        let server = MockServer::start().await;
        let campaign_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/rest/v1/wa_dispatcher_v4_campaign_messages"))
            .and(query_param("select", "*"))
            .and(query_param("campaign_id", format!("eq.{}", campaign_id)))
            .and(query_param("order", "order_index.asc"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer session-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "1", "order_index": 0 },
                { "id": "2", "order_index": 1 }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let rows = backend
            .list(
                ResourceKind::CampaignMessages,
                &Query::new()
                    .eq("campaign_id", campaign_id)
                    .order_by("order_index", Order::Asc),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], "2");
    }

    #[tokio::test]
    async fn test_list_joins_sort_keys() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/wa_dispatcher_v4_campaign_contacts"))
            .and(query_param("order", "created_at.asc,id.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = backend_for(&server)
            .list(
                ResourceKind::CampaignContacts,
                &Query::new()
                    .order_by("created_at", Order::Asc)
                    .order_by("id", Order::Asc),
            )
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_create_requests_representation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/wa_dispatcher_v4_campaigns"))
            .and(header("Prefer", "return=representation"))
            .and(body_json(json!({ "name": "Promo" })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!([{ "id": "c1", "name": "Promo" }])),
            )
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let row = backend
            .create(ResourceKind::Campaigns, json!({ "name": "Promo" }))
            .await
            .unwrap();

        assert_eq!(row, json!({ "id": "c1", "name": "Promo" }));
    }

    #[tokio::test]
    async fn test_update_of_missing_row_is_not_found() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/wa_dispatcher_v4_campaigns"))
            .and(query_param("id", format!("eq.{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend
            .update(ResourceKind::Campaigns, id, json!({ "name": "x" }))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_rpc_and_edge_function_paths() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/wa_dispatcher_v4_encrypt_token"))
            .and(body_json(json!({ "token": "secret" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("ciphertext")))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/functions/v1/test-api-connection"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "message": "ok" })),
            )
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let encrypted = backend
            .invoke(RemoteProcedure::EncryptToken, json!({ "token": "secret" }))
            .await
            .unwrap();
        assert_eq!(encrypted, json!("ciphertext"));

        let result = backend
            .invoke(RemoteProcedure::TestApiConnection, json!({}))
            .await
            .unwrap();
        assert_eq!(result["success"], true);
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/wa_dispatcher_v4_campaigns"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "JWT expired" })),
            )
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/rest/v1/wa_dispatcher_v4_campaigns"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let backend = backend_for(&server);

        let err = backend
            .list(ResourceKind::Campaigns, &Query::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Authentication error: JWT expired");

        let err = backend
            .delete(ResourceKind::Campaigns, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BACKEND_ERROR");
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_unfiltered_delete_is_rejected() {
        let server = MockServer::start().await;
        let backend = backend_for(&server);

        let err = backend
            .delete_matching(ResourceKind::CampaignContacts, &Query::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
