//! Campaign Manager - campaign lifecycle over the backend repositories

use crate::wizard::{CampaignDraft, CampaignPersistence, StepError};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use wadispatch_common::types::{CampaignId, CampaignStatus};
use wadispatch_common::Error;
use wadispatch_storage::models::{
    Campaign, CampaignStats, CampaignWithDetails, CreateCampaign, StatusChange, UpdateCampaign,
};
use wadispatch_storage::{Backend, Repositories};

/// Campaign manager errors
#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("campaign {0} not found")]
    NotFound(CampaignId),

    #[error("cannot move a campaign from {from} to {to}")]
    InvalidTransition {
        from: CampaignStatus,
        to: CampaignStatus,
    },

    #[error("cannot delete a running campaign")]
    Running,

    #[error("campaign is {0}; only drafts can be changed")]
    NotDraft(CampaignStatus),

    #[error(transparent)]
    Invalid(#[from] StepError),

    #[error(transparent)]
    Storage(#[from] Error),
}

impl From<CampaignError> for Error {
    fn from(err: CampaignError) -> Self {
        match err {
            CampaignError::Storage(e) => e,
            CampaignError::NotFound(id) => Error::NotFound(format!("campaign {}", id)),
            other => Error::Validation(other.to_string()),
        }
    }
}

type Result<T> = std::result::Result<T, CampaignError>;

/// Dashboard counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CampaignOverview {
    pub total: usize,
    pub draft: usize,
    pub scheduled: usize,
    pub running: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
}

impl CampaignOverview {
    pub fn from_campaigns(campaigns: &[Campaign]) -> Self {
        let mut overview = Self {
            total: campaigns.len(),
            ..Default::default()
        };
        for campaign in campaigns {
            let counter = match campaign.status {
                CampaignStatus::Draft => &mut overview.draft,
                CampaignStatus::Scheduled => &mut overview.scheduled,
                CampaignStatus::Running => &mut overview.running,
                CampaignStatus::Paused => &mut overview.paused,
                CampaignStatus::Completed => &mut overview.completed,
                CampaignStatus::Failed => &mut overview.failed,
            };
            *counter += 1;
        }
        overview
    }
}

/// Campaign Manager - Manages campaign lifecycle
#[derive(Clone)]
pub struct CampaignManager {
    repos: Repositories,
}

impl CampaignManager {
    /// Create a new campaign manager
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            repos: Repositories::new(backend),
        }
    }

    /// The user's campaigns, newest first
    pub async fn list(&self) -> Result<Vec<Campaign>> {
        Ok(self.repos.campaigns.list().await?)
    }

    pub async fn overview(&self) -> Result<CampaignOverview> {
        Ok(CampaignOverview::from_campaigns(&self.list().await?))
    }

    /// Campaign with messages, contacts and sending configuration
    pub async fn get(&self, id: CampaignId) -> Result<Option<CampaignWithDetails>> {
        let Some(campaign) = self.repos.campaigns.get(id).await? else {
            return Ok(None);
        };

        Ok(Some(CampaignWithDetails {
            messages: self.repos.messages.list(id).await?,
            contacts: self.repos.contacts.list(id).await?,
            sending_configuration: self.repos.sending_configurations.get(id).await?,
            campaign,
        }))
    }

    pub async fn stats(&self, id: CampaignId) -> Result<CampaignStats> {
        self.require(id).await?;
        let statuses = self.repos.contacts.statuses(id).await?;
        Ok(CampaignStats::from_statuses(statuses))
    }

    pub async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        Ok(self.repos.campaigns.create(input).await?)
    }

    /// Edit campaign fields; only drafts are editable
    pub async fn update(&self, id: CampaignId, input: UpdateCampaign) -> Result<Campaign> {
        let campaign = self.require(id).await?;
        if !campaign.status.is_editable() {
            return Err(CampaignError::NotDraft(campaign.status));
        }
        Ok(self.repos.campaigns.update(id, input).await?)
    }

    /// Move a campaign to a new status, stamping lifecycle timestamps
    pub async fn transition(&self, id: CampaignId, next: CampaignStatus) -> Result<Campaign> {
        let campaign = self.require(id).await?;
        if !campaign.status.can_transition_to(next) {
            return Err(CampaignError::InvalidTransition {
                from: campaign.status,
                to: next,
            });
        }

        let now = Utc::now();
        let change = StatusChange {
            status: next,
            started_at: (next == CampaignStatus::Running && campaign.started_at.is_none())
                .then_some(now),
            completed_at: next.is_terminal().then_some(now),
        };

        let updated = self.repos.campaigns.set_status(id, change).await?;
        info!(campaign_id = %id, from = %campaign.status, to = %next, "Campaign status changed");
        Ok(updated)
    }

    pub async fn schedule(&self, id: CampaignId) -> Result<Campaign> {
        self.transition(id, CampaignStatus::Scheduled).await
    }

    pub async fn start(&self, id: CampaignId) -> Result<Campaign> {
        self.transition(id, CampaignStatus::Running).await
    }

    pub async fn pause(&self, id: CampaignId) -> Result<Campaign> {
        self.transition(id, CampaignStatus::Paused).await
    }

    pub async fn resume(&self, id: CampaignId) -> Result<Campaign> {
        self.transition(id, CampaignStatus::Running).await
    }

    pub async fn complete(&self, id: CampaignId) -> Result<Campaign> {
        self.transition(id, CampaignStatus::Completed).await
    }

    /// Stop a running or paused campaign for good
    pub async fn stop(&self, id: CampaignId) -> Result<Campaign> {
        self.transition(id, CampaignStatus::Failed).await
    }

    /// Delete a draft together with its sub-resources
    pub async fn delete(&self, id: CampaignId) -> Result<()> {
        let campaign = self.require(id).await?;
        match campaign.status {
            CampaignStatus::Running => return Err(CampaignError::Running),
            status if !status.is_deletable() => return Err(CampaignError::NotDraft(status)),
            _ => {}
        }

        self.repos.messages.delete_for_campaign(id).await?;
        self.repos.contacts.delete_for_campaign(id).await?;
        self.repos
            .sending_configurations
            .delete_for_campaign(id)
            .await?;
        self.repos.campaigns.delete(id).await?;
        Ok(())
    }

    /// Create or update a campaign from a finished wizard draft.
    ///
    /// A newly created campaign's id is written back into the draft before
    /// the sub-resources are stored, so retrying after a partial failure
    /// updates that campaign instead of creating another one.
    pub async fn save_draft(&self, draft: &mut CampaignDraft) -> Result<Campaign> {
        let input = draft.campaign_input()?;

        let campaign = match draft.campaign_id {
            Some(id) => self.update(id, UpdateCampaign::from(input)).await?,
            None => {
                let campaign = self.create(input).await?;
                draft.campaign_id = Some(campaign.id);
                campaign
            }
        };

        let messages = self
            .repos
            .messages
            .replace_all(campaign.id, draft.messages.as_slice())
            .await?;
        let contacts = self
            .repos
            .contacts
            .replace_all(campaign.id, draft.contacts.as_slice())
            .await?;
        self.repos
            .sending_configurations
            .upsert(campaign.id, &draft.sending)
            .await?;

        debug!(campaign_id = %campaign.id, "Draft sub-resources stored");
        info!(
            campaign_id = %campaign.id,
            messages = messages.len(),
            contacts = contacts.len(),
            "Campaign draft saved"
        );
        Ok(campaign)
    }

    async fn require(&self, id: CampaignId) -> Result<Campaign> {
        self.repos
            .campaigns
            .get(id)
            .await?
            .ok_or(CampaignError::NotFound(id))
    }
}

#[async_trait]
impl CampaignPersistence for CampaignManager {
    async fn save_draft(&self, draft: &mut CampaignDraft) -> wadispatch_common::Result<Campaign> {
        Ok(CampaignManager::save_draft(self, draft).await?)
    }
}
