//! Record models exchanged with the hosted backend

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use wadispatch_common::types::{
    ApiConfigId, ApiType, CampaignId, CampaignStatus, ConnectionStatus, ContactId, ContactStatus,
    ContentType, MessageId, UserId,
};

/// Free-form per-contact fields, keyed by the source column header
pub type CustomFields = BTreeMap<String, String>;

// ============================================================================
// API configurations
// ============================================================================

/// Stored credential set for one WhatsApp provider integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfiguration {
    pub id: ApiConfigId,
    pub user_id: UserId,
    pub name: String,
    pub api_type: ApiType,
    pub instance_name: Option<String>,
    /// Ciphertext as stored; never the plain token
    #[serde(default)]
    pub access_token: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number_id: Option<String>,
    pub base_url: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub connection_status: ConnectionStatus,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create / edit form for an API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfigurationForm {
    pub name: String,
    pub api_type: ApiType,
    #[serde(default)]
    pub instance_name: Option<String>,
    /// Plain token; blank on edit keeps the stored one
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ApiConfigurationForm {
    /// Empty form for the given provider
    pub fn new(name: impl Into<String>, api_type: ApiType) -> Self {
        Self {
            name: name.into(),
            api_type,
            instance_name: None,
            access_token: String::new(),
            phone_number: None,
            phone_number_id: None,
            base_url: None,
        }
    }
}

/// Credentials with the decrypted token, as returned by the backend's
/// privileged lookup procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCredentials {
    pub api_type: ApiType,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
}

/// Payload of the connection-test function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiTestRequest {
    pub api_type: ApiType,
    pub base_url: String,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,
}

impl From<ApiCredentials> for ApiTestRequest {
    fn from(c: ApiCredentials) -> Self {
        Self {
            api_type: c.api_type,
            base_url: c.base_url.unwrap_or_default(),
            access_token: c.access_token.unwrap_or_default(),
            instance_name: c.instance_name.filter(|s| !s.is_empty()),
            phone_number_id: c.phone_number_id.filter(|s| !s.is_empty()),
        }
    }
}

/// Result of the connection-test function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiTestResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

// ============================================================================
// Campaigns
// ============================================================================

/// Campaign model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub user_id: UserId,
    pub api_config_id: ApiConfigId,
    pub name: String,
    pub status: CampaignStatus,
    pub google_sheets_url: Option<String>,
    pub sheet_id_column: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create campaign input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCampaign {
    pub name: String,
    pub api_config_id: ApiConfigId,
    pub google_sheets_url: Option<String>,
    pub sheet_id_column: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Update campaign input; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateCampaign {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_config_id: Option<ApiConfigId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_sheets_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_id_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl From<CreateCampaign> for UpdateCampaign {
    fn from(c: CreateCampaign) -> Self {
        Self {
            name: Some(c.name),
            api_config_id: Some(c.api_config_id),
            google_sheets_url: c.google_sheets_url,
            sheet_id_column: c.sheet_id_column,
            scheduled_at: c.scheduled_at,
        }
    }
}

/// Status change with the lifecycle timestamps it stamps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub status: CampaignStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Campaign messages
// ============================================================================

/// Stored campaign message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMessage {
    pub id: MessageId,
    pub campaign_id: CampaignId,
    pub content_type: ContentType,
    #[serde(default)]
    pub content: String,
    pub media_url: Option<String>,
    pub order_index: u32,
    pub created_at: DateTime<Utc>,
}

/// Message under construction in the editor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCampaignMessage {
    pub content_type: ContentType,
    pub content: String,
    #[serde(default)]
    pub media_url: Option<String>,
    pub order_index: u32,
}

impl From<CampaignMessage> for NewCampaignMessage {
    fn from(m: CampaignMessage) -> Self {
        Self {
            content_type: m.content_type,
            content: m.content,
            media_url: m.media_url,
            order_index: m.order_index,
        }
    }
}

// ============================================================================
// Campaign contacts
// ============================================================================

/// Stored campaign contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignContact {
    pub id: ContactId,
    pub campaign_id: CampaignId,
    pub external_id: Option<String>,
    pub phone_number: String,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_custom_fields")]
    pub custom_fields: CustomFields,
    #[serde(default)]
    pub status: ContactStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A prospective recipient before it is persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCampaignContact {
    /// Digits only
    pub phone_number: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_custom_fields")]
    pub custom_fields: CustomFields,
}

impl From<CampaignContact> for NewCampaignContact {
    fn from(c: CampaignContact) -> Self {
        Self {
            phone_number: c.phone_number,
            name: c.name,
            external_id: c.external_id,
            custom_fields: c.custom_fields,
        }
    }
}

/// Stored custom fields may hold any JSON value; coerce them to strings
/// (null becomes the empty string)
fn deserialize_custom_fields<'de, D>(deserializer: D) -> Result<CustomFields, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Null => String::new(),
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

// ============================================================================
// Sending configuration
// ============================================================================

/// Stored pacing policy of a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendingConfiguration {
    pub id: uuid::Uuid,
    pub campaign_id: CampaignId,
    pub min_delay_seconds: u32,
    pub max_delay_seconds: u32,
    pub pause_after_messages: u32,
    pub pause_duration_seconds: u32,
    pub daily_limit: Option<u32>,
    #[serde(default, with = "time_of_day")]
    pub allowed_hours_start: Option<NaiveTime>,
    #[serde(default, with = "time_of_day")]
    pub allowed_hours_end: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
}

/// Pacing policy being edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendingConfigurationForm {
    pub min_delay_seconds: u32,
    pub max_delay_seconds: u32,
    pub pause_after_messages: u32,
    pub pause_duration_seconds: u32,
    #[serde(default)]
    pub daily_limit: Option<u32>,
    #[serde(default, with = "time_of_day")]
    pub allowed_hours_start: Option<NaiveTime>,
    #[serde(default, with = "time_of_day")]
    pub allowed_hours_end: Option<NaiveTime>,
}

impl Default for SendingConfigurationForm {
    fn default() -> Self {
        Self {
            min_delay_seconds: 5,
            max_delay_seconds: 10,
            pause_after_messages: 50,
            pause_duration_seconds: 300,
            daily_limit: None,
            allowed_hours_start: None,
            allowed_hours_end: None,
        }
    }
}

impl From<SendingConfiguration> for SendingConfigurationForm {
    fn from(c: SendingConfiguration) -> Self {
        Self {
            min_delay_seconds: c.min_delay_seconds,
            max_delay_seconds: c.max_delay_seconds,
            pause_after_messages: c.pause_after_messages,
            pause_duration_seconds: c.pause_duration_seconds,
            daily_limit: c.daily_limit,
            allowed_hours_start: c.allowed_hours_start,
            allowed_hours_end: c.allowed_hours_end,
        }
    }
}

/// `HH:MM` time-of-day (accepts `HH:MM:SS` as returned by the database)
mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => NaiveTime::parse_from_str(s, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Campaign with its sub-resources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignWithDetails {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub messages: Vec<CampaignMessage>,
    pub contacts: Vec<CampaignContact>,
    pub sending_configuration: Option<SendingConfiguration>,
}

/// Delivery statistics of a campaign
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub total_contacts: u32,
    pub contacts_sent: u32,
    pub contacts_failed: u32,
    pub contacts_pending: u32,
    /// Percentage of contacts sent, rounded
    pub success_rate: u32,
}

impl CampaignStats {
    /// Tally contact statuses
    pub fn from_statuses(statuses: impl IntoIterator<Item = ContactStatus>) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.total_contacts += 1;
            match status {
                ContactStatus::Sent => stats.contacts_sent += 1,
                ContactStatus::Failed => stats.contacts_failed += 1,
                ContactStatus::Pending => stats.contacts_pending += 1,
            }
        }

        if stats.total_contacts > 0 {
            let rate = f64::from(stats.contacts_sent) / f64::from(stats.total_contacts) * 100.0;
            stats.success_rate = rate.round() as u32;
        }

        stats
    }
}
