//! Common types for wadispatch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for users
pub type UserId = Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for API credential configurations
pub type ApiConfigId = Uuid;

/// Unique identifier for campaign messages
pub type MessageId = Uuid;

/// Unique identifier for campaign contacts
pub type ContactId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

/// Campaign status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Running,
    Paused,
    Completed,
    Failed,
}

impl CampaignStatus {
    /// Whether a campaign may move from `self` to `next`
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Draft, Scheduled)
                | (Draft, Running)
                | (Scheduled, Running)
                | (Running, Paused)
                | (Running, Completed)
                | (Running, Failed)
                | (Paused, Running)
                | (Paused, Failed)
        )
    }

    /// Only drafts may be edited
    pub fn is_editable(self) -> bool {
        self == CampaignStatus::Draft
    }

    /// Only drafts may be deleted
    pub fn is_deletable(self) -> bool {
        self == CampaignStatus::Draft
    }

    /// Terminal states stamp `completed_at`
    pub fn is_terminal(self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Failed)
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "draft"),
            CampaignStatus::Scheduled => write!(f, "scheduled"),
            CampaignStatus::Running => write!(f, "running"),
            CampaignStatus::Paused => write!(f, "paused"),
            CampaignStatus::Completed => write!(f, "completed"),
            CampaignStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "running" => Ok(CampaignStatus::Running),
            "paused" => Ok(CampaignStatus::Paused),
            "completed" => Ok(CampaignStatus::Completed),
            "failed" => Ok(CampaignStatus::Failed),
            _ => Err(crate::Error::Validation(format!(
                "Invalid campaign status: {}",
                s
            ))),
        }
    }
}

/// Kind of content carried by a campaign message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Document,
}

impl ContentType {
    /// Media messages carry a URL and an optional caption
    pub fn is_media(self) -> bool {
        self != ContentType::Text
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Text => write!(f, "text"),
            ContentType::Image => write!(f, "image"),
            ContentType::Video => write!(f, "video"),
            ContentType::Audio => write!(f, "audio"),
            ContentType::Document => write!(f, "document"),
        }
    }
}

/// WhatsApp provider integration behind an API configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiType {
    EvolutionWeb,
    EvolutionCloud,
    MetaCloud,
}

impl ApiType {
    /// Human-readable provider label
    pub fn label(self) -> &'static str {
        match self {
            ApiType::EvolutionWeb => "Evolution Web",
            ApiType::EvolutionCloud => "Evolution Cloud",
            ApiType::MetaCloud => "Meta Cloud",
        }
    }

    /// Evolution providers are addressed by instance name and base URL
    pub fn is_evolution(self) -> bool {
        matches!(self, ApiType::EvolutionWeb | ApiType::EvolutionCloud)
    }
}

impl std::fmt::Display for ApiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiType::EvolutionWeb => write!(f, "evolution_web"),
            ApiType::EvolutionCloud => write!(f, "evolution_cloud"),
            ApiType::MetaCloud => write!(f, "meta_cloud"),
        }
    }
}

/// Last known connectivity of an API configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    #[default]
    Unknown,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Unknown => write!(f, "unknown"),
            ConnectionStatus::Error => write!(f, "error"),
        }
    }
}

/// Delivery status of a single campaign contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactStatus::Pending => write!(f, "pending"),
            ContactStatus::Sent => write!(f, "sent"),
            ContactStatus::Failed => write!(f, "failed"),
        }
    }
}
