//! Backend collaborator abstraction

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;
use wadispatch_common::types::UserId;
use wadispatch_common::{Error, Result};

/// Resource tables held by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    ApiConfigurations,
    Campaigns,
    CampaignMessages,
    CampaignContacts,
    SendingConfigurations,
}

impl ResourceKind {
    /// Table name without the deployment prefix
    pub fn suffix(self) -> &'static str {
        match self {
            ResourceKind::ApiConfigurations => "api_configurations",
            ResourceKind::Campaigns => "campaigns",
            ResourceKind::CampaignMessages => "campaign_messages",
            ResourceKind::CampaignContacts => "campaign_contacts",
            ResourceKind::SendingConfigurations => "sending_configurations",
        }
    }

    /// Full table name for the given prefix
    pub fn table(self, prefix: &str) -> String {
        format!("{}{}", prefix, self.suffix())
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Server-side procedures reachable through the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteProcedure {
    /// Encrypting insert of an API configuration; returns the new id
    InsertApiConfig,
    /// Encrypts a plain token; returns the ciphertext string
    EncryptToken,
    /// Returns the configuration rows with the token decrypted
    GetApiConfigWithToken,
    /// Edge function probing a provider; returns `{success, message, details?}`
    TestApiConnection,
}

impl RemoteProcedure {
    /// Name as deployed (RPC names are table-prefixed, functions are not)
    pub fn name(self) -> &'static str {
        match self {
            RemoteProcedure::InsertApiConfig => "insert_api_config",
            RemoteProcedure::EncryptToken => "encrypt_token",
            RemoteProcedure::GetApiConfigWithToken => "get_api_config_with_token",
            RemoteProcedure::TestApiConnection => "test-api-connection",
        }
    }

    /// Edge functions live outside the RPC namespace
    pub fn is_edge_function(self) -> bool {
        self == RemoteProcedure::TestApiConnection
    }
}

/// Equality filter on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    /// Whether a JSON row satisfies the filter
    pub fn matches(&self, row: &Value) -> bool {
        match row.get(&self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// Read query: equality filters, sort keys and an optional limit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<Filter>,
    /// Sort keys, most significant first
    pub order: Vec<(String, Order)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Append a sort key; later keys break ties of earlier ones
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query selecting a single row by id
    pub fn by_id(id: Uuid) -> Self {
        Self::new().eq("id", id)
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }
}

/// Hosted relational backend with row-level security.
///
/// Rows travel as JSON; repositories convert them to typed records.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Identity of the current session, if authenticated
    fn user_id(&self) -> Option<UserId>;

    async fn list(&self, kind: ResourceKind, query: &Query) -> Result<Vec<Value>>;

    async fn create(&self, kind: ResourceKind, row: Value) -> Result<Value>;

    async fn create_batch(&self, kind: ResourceKind, rows: Vec<Value>) -> Result<Vec<Value>> {
        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            created.push(self.create(kind, row).await?);
        }
        Ok(created)
    }

    /// Partial merge of `patch` into the row; `NotFound` when absent
    async fn update(&self, kind: ResourceKind, id: Uuid, patch: Value) -> Result<Value>;

    /// Delete every row matching the query's filters
    async fn delete_matching(&self, kind: ResourceKind, query: &Query) -> Result<()>;

    async fn delete(&self, kind: ResourceKind, id: Uuid) -> Result<()> {
        self.delete_matching(kind, &Query::by_id(id)).await
    }

    async fn invoke(&self, procedure: RemoteProcedure, args: Value) -> Result<Value>;

    /// Session identity or an authentication error
    fn require_user(&self) -> Result<UserId> {
        self.user_id().ok_or_else(Error::unauthenticated)
    }
}

/// Deserialize one row into a record
pub fn decode<T: DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}

/// Deserialize a batch of rows
pub fn decode_all<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter().map(decode).collect()
}

/// Serialize a record into a row body
pub fn encode<T: Serialize>(record: &T) -> Result<Value> {
    Ok(serde_json::to_value(record)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_table_names() {
        assert_eq!(
            ResourceKind::CampaignContacts.table("wa_dispatcher_v4_"),
            "wa_dispatcher_v4_campaign_contacts"
        );
        assert_eq!(ResourceKind::Campaigns.to_string(), "campaigns");
    }

    #[test]
    fn test_filter_matches_string_forms() {
        let row = json!({ "id": "abc", "order_index": 2, "is_active": true, "name": null });

        assert!(Filter::eq("id", "abc").matches(&row));
        assert!(Filter::eq("order_index", 2).matches(&row));
        assert!(Filter::eq("is_active", true).matches(&row));
        assert!(!Filter::eq("is_active", false).matches(&row));
        assert!(!Filter::eq("name", "null").matches(&row));
        assert!(!Filter::eq("missing", "x").matches(&row));
    }

    #[test]
    fn test_query_builder() {
        let id = Uuid::new_v4();
        let query = Query::new()
            .eq("campaign_id", id)
            .order_by("order_index", Order::Asc)
            .order_by("id", Order::Desc)
            .limit(10);

        assert_eq!(query.filters, vec![Filter::eq("campaign_id", id)]);
        assert_eq!(
            query.order,
            vec![
                ("order_index".to_string(), Order::Asc),
                ("id".to_string(), Order::Desc)
            ]
        );
        assert_eq!(query.limit, Some(10));
        assert!(query.matches(&json!({ "campaign_id": id.to_string() })));
    }

    #[test]
    fn test_procedure_names() {
        assert_eq!(RemoteProcedure::EncryptToken.name(), "encrypt_token");
        assert!(RemoteProcedure::TestApiConnection.is_edge_function());
        assert!(!RemoteProcedure::GetApiConfigWithToken.is_edge_function());
    }
}
