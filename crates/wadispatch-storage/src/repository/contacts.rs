//! Campaign contact repository

use crate::backend::{decode, decode_all, encode, Backend, Order, Query, ResourceKind};
use crate::models::{CampaignContact, NewCampaignContact};
use crate::repository::row_with;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use wadispatch_common::types::{CampaignId, ContactId, ContactStatus};
use wadispatch_common::Result;

#[derive(Clone)]
pub struct CampaignContactRepository {
    backend: Arc<dyn Backend>,
}

impl CampaignContactRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Query listing a campaign's contacts.
    ///
    /// Rows of one batch insert share `created_at`, so `id` breaks the tie:
    /// the order is stable across reloads but not the import order within
    /// a batch.
    fn list_query(campaign_id: CampaignId) -> Query {
        Query::new()
            .eq("campaign_id", campaign_id)
            .order_by("created_at", Order::Asc)
            .order_by("id", Order::Asc)
    }

    /// Contacts of a campaign, oldest insert first
    pub async fn list(&self, campaign_id: CampaignId) -> Result<Vec<CampaignContact>> {
        self.backend.require_user()?;
        let rows = self
            .backend
            .list(ResourceKind::CampaignContacts, &Self::list_query(campaign_id))
            .await?;
        decode_all(rows)
    }

    /// Insert contacts in one batch
    pub async fn add(
        &self,
        campaign_id: CampaignId,
        contacts: &[NewCampaignContact],
    ) -> Result<Vec<CampaignContact>> {
        self.backend.require_user()?;
        let rows = contacts
            .iter()
            .map(|c| {
                row_with(
                    c,
                    &[
                        ("campaign_id", json!(campaign_id)),
                        ("status", json!(ContactStatus::Pending)),
                    ],
                )
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(campaign_id = %campaign_id, count = rows.len(), "Adding campaign contacts");
        decode_all(
            self.backend
                .create_batch(ResourceKind::CampaignContacts, rows)
                .await?,
        )
    }

    pub async fn update(
        &self,
        id: ContactId,
        contact: &NewCampaignContact,
    ) -> Result<CampaignContact> {
        self.backend.require_user()?;
        decode(
            self.backend
                .update(ResourceKind::CampaignContacts, id, encode(contact)?)
                .await?,
        )
    }

    pub async fn delete(&self, id: ContactId) -> Result<()> {
        self.backend.require_user()?;
        self.backend.delete(ResourceKind::CampaignContacts, id).await
    }

    pub async fn delete_for_campaign(&self, campaign_id: CampaignId) -> Result<()> {
        self.backend.require_user()?;
        self.backend
            .delete_matching(
                ResourceKind::CampaignContacts,
                &Query::new().eq("campaign_id", campaign_id),
            )
            .await
    }

    /// Replace every contact of a campaign
    pub async fn replace_all(
        &self,
        campaign_id: CampaignId,
        contacts: &[NewCampaignContact],
    ) -> Result<Vec<CampaignContact>> {
        self.delete_for_campaign(campaign_id).await?;
        self.add(campaign_id, contacts).await
    }

    /// Delivery status of every contact of a campaign
    pub async fn statuses(&self, campaign_id: CampaignId) -> Result<Vec<ContactStatus>> {
        self.backend.require_user()?;
        let rows = self
            .backend
            .list(
                ResourceKind::CampaignContacts,
                &Query::new().eq("campaign_id", campaign_id),
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row.get("status")
                    .cloned()
                    .and_then(|s: Value| serde_json::from_value(s).ok())
                    .unwrap_or_default()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn contact(phone: &str) -> NewCampaignContact {
        NewCampaignContact {
            phone_number: phone.to_string(),
            name: Some("Ana".to_string()),
            external_id: None,
            custom_fields: [("cidade".to_string(), "SP".to_string())].into(),
        }
    }

    #[tokio::test]
    async fn test_add_defaults_to_pending() {
        let repo = CampaignContactRepository::new(Arc::new(
            MemoryBackend::new().with_user(Uuid::new_v4()),
        ));
        let campaign_id = Uuid::new_v4();

        let stored = repo
            .add(campaign_id, &[contact("5511999999999"), contact("5511888888888")])
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].status, ContactStatus::Pending);
        assert_eq!(stored[0].custom_fields["cidade"], "SP");
        assert_eq!(
            repo.statuses(campaign_id).await.unwrap(),
            vec![ContactStatus::Pending, ContactStatus::Pending]
        );
    }

    #[test]
    fn test_list_order_has_a_tie_breaker() {
        let query = CampaignContactRepository::list_query(Uuid::new_v4());
        assert_eq!(
            query.order,
            vec![
                ("created_at".to_string(), Order::Asc),
                ("id".to_string(), Order::Asc)
            ]
        );
    }

    #[tokio::test]
    async fn test_list_is_stable_for_one_batch() {
        let repo = CampaignContactRepository::new(Arc::new(
            MemoryBackend::new().with_user(Uuid::new_v4()),
        ));
        let campaign_id = Uuid::new_v4();
        let phones: Vec<_> = (0..5)
            .map(|i| contact(&format!("551190000000{}", i)))
            .collect();
        repo.add(campaign_id, &phones).await.unwrap();

        let first: Vec<_> = repo.list(campaign_id).await.unwrap();
        let second: Vec<_> = repo.list(campaign_id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    #[tokio::test]
    async fn test_replace_all_drops_previous_contacts() {
        let repo = CampaignContactRepository::new(Arc::new(
            MemoryBackend::new().with_user(Uuid::new_v4()),
        ));
        let campaign_id = Uuid::new_v4();
        repo.add(campaign_id, &[contact("5511999999999")])
            .await
            .unwrap();

        repo.replace_all(campaign_id, &[contact("5511777777777")])
            .await
            .unwrap();

        let phones: Vec<_> = repo
            .list(campaign_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.phone_number)
            .collect();
        assert_eq!(phones, vec!["5511777777777"]);
    }
}
