//! Campaign repository

use crate::backend::{decode, decode_all, encode, Backend, Order, Query, ResourceKind};
use crate::models::{Campaign, CreateCampaign, StatusChange, UpdateCampaign};
use crate::repository::row_with;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use wadispatch_common::types::{CampaignId, CampaignStatus};
use wadispatch_common::{Error, Result};

/// Campaign repository, scoped to the session user
#[derive(Clone)]
pub struct CampaignRepository {
    backend: Arc<dyn Backend>,
}

impl CampaignRepository {
    /// Create a new campaign repository
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// List the user's campaigns, newest first
    pub async fn list(&self) -> Result<Vec<Campaign>> {
        let user_id = self.backend.require_user()?;
        let rows = self
            .backend
            .list(
                ResourceKind::Campaigns,
                &Query::new()
                    .eq("user_id", user_id)
                    .order_by("created_at", Order::Desc),
            )
            .await?;
        decode_all(rows)
    }

    /// Get a campaign by ID
    pub async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let user_id = self.backend.require_user()?;
        let rows = self
            .backend
            .list(
                ResourceKind::Campaigns,
                &Query::by_id(id).eq("user_id", user_id).limit(1),
            )
            .await?;
        rows.into_iter().next().map(decode).transpose()
    }

    /// Get a campaign or fail with `NotFound`
    pub async fn require(&self, id: CampaignId) -> Result<Campaign> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {}", id)))
    }

    /// Create a new campaign in `draft` status
    pub async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        let user_id = self.backend.require_user()?;
        let row = row_with(
            &input,
            &[
                ("user_id", json!(user_id)),
                ("status", json!(CampaignStatus::Draft)),
            ],
        )?;

        let campaign: Campaign = decode(self.backend.create(ResourceKind::Campaigns, row).await?)?;
        info!(campaign_id = %campaign.id, name = %campaign.name, "Campaign created");
        Ok(campaign)
    }

    /// Update campaign fields
    pub async fn update(&self, id: CampaignId, input: UpdateCampaign) -> Result<Campaign> {
        self.require(id).await?;
        let row = self
            .backend
            .update(ResourceKind::Campaigns, id, encode(&input)?)
            .await?;
        decode(row)
    }

    /// Write a status change and its timestamps
    pub async fn set_status(&self, id: CampaignId, change: StatusChange) -> Result<Campaign> {
        self.require(id).await?;
        let row = self
            .backend
            .update(ResourceKind::Campaigns, id, encode(&change)?)
            .await?;
        decode(row)
    }

    /// Delete a campaign
    pub async fn delete(&self, id: CampaignId) -> Result<()> {
        let user_id = self.backend.require_user()?;
        self.backend
            .delete_matching(
                ResourceKind::Campaigns,
                &Query::by_id(id).eq("user_id", user_id),
            )
            .await?;
        info!(campaign_id = %id, "Campaign deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn new_campaign(name: &str) -> CreateCampaign {
        CreateCampaign {
            name: name.to_string(),
            api_config_id: Uuid::new_v4(),
            google_sheets_url: None,
            sheet_id_column: Some("ID".to_string()),
            scheduled_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_starts_as_draft() {
        let user = Uuid::new_v4();
        let repo = CampaignRepository::new(Arc::new(MemoryBackend::new().with_user(user)));

        let campaign = repo.create(new_campaign("Promo")).await.unwrap();
        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert_eq!(campaign.user_id, user);
        assert_eq!(campaign.sheet_id_column.as_deref(), Some("ID"));

        let listed = repo.list().await.unwrap();
        assert_eq!(listed, vec![campaign]);
    }

    #[tokio::test]
    async fn test_requires_authenticated_user() {
        let repo = CampaignRepository::new(Arc::new(MemoryBackend::new()));

        let err = repo.list().await.unwrap_err();
        assert_eq!(err.to_string(), "Authentication error: user not authenticated");
        assert!(repo.create(new_campaign("Promo")).await.is_err());
    }

    #[tokio::test]
    async fn test_other_users_campaigns_are_invisible() {
        let backend = Arc::new(MemoryBackend::new().with_user(Uuid::new_v4()));
        backend
            .create(
                ResourceKind::Campaigns,
                json!({ "user_id": Uuid::new_v4(), "name": "Theirs", "status": "draft" }),
            )
            .await
            .unwrap();

        let repo = CampaignRepository::new(backend);
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_status_change() {
        let repo = CampaignRepository::new(Arc::new(MemoryBackend::new().with_user(Uuid::new_v4())));
        let campaign = repo.create(new_campaign("Promo")).await.unwrap();

        let renamed = repo
            .update(
                campaign.id,
                UpdateCampaign {
                    name: Some("Promo 2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Promo 2");
        assert_eq!(renamed.sheet_id_column.as_deref(), Some("ID"));

        let running = repo
            .set_status(
                campaign.id,
                StatusChange {
                    status: CampaignStatus::Running,
                    started_at: Some(chrono::Utc::now()),
                    completed_at: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(running.status, CampaignStatus::Running);
        assert!(running.started_at.is_some());

        repo.delete(campaign.id).await.unwrap();
        assert!(repo.get(campaign.id).await.unwrap().is_none());
        assert_eq!(
            repo.update(campaign.id, UpdateCampaign::default())
                .await
                .unwrap_err()
                .code(),
            "NOT_FOUND"
        );
    }
}
