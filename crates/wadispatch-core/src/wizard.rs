//! Wizard Orchestrator - step-by-step campaign authoring
//!
//! The wizard owns a [`CampaignDraft`] across five ordered steps. Moving
//! forward runs the current step's validation; moving back never does.
//! Finishing hands the whole draft to a [`CampaignPersistence`].

use crate::contacts::ContactSet;
use crate::estimator::CampaignEstimate;
use crate::messages::MessageSequence;
use crate::sending::{validate_sending_config, SendingConfigError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use wadispatch_common::config::DefaultsConfig;
use wadispatch_common::types::{ApiConfigId, CampaignId, CampaignStatus};
use wadispatch_common::{Error, Result};
use wadispatch_storage::models::{Campaign, CreateCampaign, SendingConfigurationForm};

/// Authoring steps, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    BasicInfo,
    Contacts,
    Messages,
    SendingConfig,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::BasicInfo,
        WizardStep::Contacts,
        WizardStep::Messages,
        WizardStep::SendingConfig,
        WizardStep::Review,
    ];

    pub fn index(self) -> usize {
        match self {
            WizardStep::BasicInfo => 0,
            WizardStep::Contacts => 1,
            WizardStep::Messages => 2,
            WizardStep::SendingConfig => 3,
            WizardStep::Review => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn id(self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "basic",
            WizardStep::Contacts => "contacts",
            WizardStep::Messages => "messages",
            WizardStep::SendingConfig => "sending",
            WizardStep::Review => "review",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "Basic information",
            WizardStep::Contacts => "Contacts",
            WizardStep::Messages => "Messages",
            WizardStep::SendingConfig => "Sending settings",
            WizardStep::Review => "Review",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "Campaign name and API configuration",
            WizardStep::Contacts => "Import or add recipients",
            WizardStep::Messages => "Write the messages to send",
            WizardStep::SendingConfig => "Delays, pauses and limits",
            WizardStep::Review => "Check everything before saving",
        }
    }

    pub fn is_last(self) -> bool {
        self == WizardStep::Review
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Progress indicator entry for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step: WizardStep,
    pub current: bool,
    pub completed: bool,
}

/// Step validation failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("campaign name is required")]
    NameRequired,

    #[error("select an API configuration")]
    ApiConfigRequired,

    #[error("add at least one contact")]
    NoContacts,

    #[error("add at least one message")]
    NoMessages,

    #[error(transparent)]
    Sending(#[from] SendingConfigError),

    #[error("the campaign can only be saved from the review step")]
    NotOnLastStep,

    #[error("the wizard has been closed")]
    Closed,

    #[error("only draft campaigns can be edited (campaign is {0})")]
    NotEditable(CampaignStatus),
}

impl From<StepError> for Error {
    fn from(err: StepError) -> Self {
        Error::Validation(err.to_string())
    }
}

/// Top-level campaign fields edited on the first step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub name: String,
    pub api_config_id: Option<ApiConfigId>,
    pub google_sheets_url: Option<String>,
    pub sheet_id_column: String,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl BasicInfo {
    fn new(defaults: &DefaultsConfig) -> Self {
        Self {
            name: String::new(),
            api_config_id: None,
            google_sheets_url: None,
            sheet_id_column: defaults.sheet_id_column.clone(),
            scheduled_at: None,
        }
    }
}

/// Everything the wizard accumulates before saving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDraft {
    /// Set when editing an existing campaign
    pub campaign_id: Option<CampaignId>,
    pub basic: BasicInfo,
    pub contacts: ContactSet,
    pub messages: MessageSequence,
    pub sending: SendingConfigurationForm,
}

impl Default for CampaignDraft {
    fn default() -> Self {
        Self::new(&DefaultsConfig::default())
    }
}

impl CampaignDraft {
    pub fn new(defaults: &DefaultsConfig) -> Self {
        Self {
            campaign_id: None,
            basic: BasicInfo::new(defaults),
            contacts: ContactSet::new(),
            messages: MessageSequence::new(),
            sending: SendingConfigurationForm {
                min_delay_seconds: defaults.min_delay_seconds,
                max_delay_seconds: defaults.max_delay_seconds,
                pause_after_messages: defaults.pause_after_messages,
                pause_duration_seconds: defaults.pause_duration_seconds,
                ..Default::default()
            },
        }
    }

    /// Draft for editing; only the campaign's own fields are carried over
    pub fn from_campaign(campaign: &Campaign, defaults: &DefaultsConfig) -> Self {
        let mut draft = Self::new(defaults);
        draft.campaign_id = Some(campaign.id);
        draft.basic = BasicInfo {
            name: campaign.name.clone(),
            api_config_id: Some(campaign.api_config_id),
            google_sheets_url: campaign.google_sheets_url.clone(),
            sheet_id_column: campaign
                .sheet_id_column
                .clone()
                .unwrap_or_else(|| defaults.sheet_id_column.clone()),
            scheduled_at: campaign.scheduled_at,
        };
        draft
    }

    /// Validate the data owned by one step
    pub fn validate_step(&self, step: WizardStep) -> std::result::Result<(), StepError> {
        match step {
            WizardStep::BasicInfo => {
                if self.basic.name.trim().is_empty() {
                    return Err(StepError::NameRequired);
                }
                if self.basic.api_config_id.is_none() {
                    return Err(StepError::ApiConfigRequired);
                }
            }
            WizardStep::Contacts => {
                if self.contacts.is_empty() {
                    return Err(StepError::NoContacts);
                }
            }
            WizardStep::Messages => {
                if self.messages.is_empty() {
                    return Err(StepError::NoMessages);
                }
            }
            WizardStep::SendingConfig => validate_sending_config(&self.sending)?,
            WizardStep::Review => {}
        }
        Ok(())
    }

    pub fn estimate(&self) -> CampaignEstimate {
        CampaignEstimate::compute(self.contacts.len(), self.messages.len(), &self.sending)
    }

    /// Campaign fields as submitted to the backend
    pub fn campaign_input(&self) -> std::result::Result<CreateCampaign, StepError> {
        let api_config_id = self.basic.api_config_id.ok_or(StepError::ApiConfigRequired)?;
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(CreateCampaign {
            name: self.basic.name.trim().to_string(),
            api_config_id,
            google_sheets_url: optional(&self.basic.google_sheets_url),
            sheet_id_column: optional(&Some(self.basic.sheet_id_column.clone())),
            scheduled_at: self.basic.scheduled_at,
        })
    }
}

/// Destination of a finished draft
#[async_trait]
pub trait CampaignPersistence: Send + Sync {
    /// Create or update the campaign with all of its sub-resources.
    ///
    /// Once the campaign row exists its id must be recorded in
    /// `draft.campaign_id`, even when a later step fails.
    async fn save_draft(&self, draft: &mut CampaignDraft) -> Result<Campaign>;
}

/// Campaign authoring state machine
#[derive(Debug, Clone)]
pub struct CampaignWizard {
    current: WizardStep,
    draft: CampaignDraft,
    defaults: DefaultsConfig,
    error: Option<String>,
    closed: bool,
}

impl CampaignWizard {
    /// Wizard for a new campaign
    pub fn new(defaults: &DefaultsConfig) -> Self {
        Self::start(CampaignDraft::new(defaults), defaults)
    }

    /// Wizard editing an existing draft campaign
    pub fn edit(
        campaign: &Campaign,
        defaults: &DefaultsConfig,
    ) -> std::result::Result<Self, StepError> {
        if !campaign.status.is_editable() {
            return Err(StepError::NotEditable(campaign.status));
        }
        Ok(Self::start(
            CampaignDraft::from_campaign(campaign, defaults),
            defaults,
        ))
    }

    fn start(draft: CampaignDraft, defaults: &DefaultsConfig) -> Self {
        info!(editing = draft.campaign_id.is_some(), "Campaign wizard opened");
        Self {
            current: WizardStep::BasicInfo,
            draft,
            defaults: defaults.clone(),
            error: None,
            closed: false,
        }
    }

    pub fn current_step(&self) -> WizardStep {
        self.current
    }

    pub fn current_index(&self) -> usize {
        self.current.index()
    }

    /// Message of the last failed validation or save
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn draft(&self) -> &CampaignDraft {
        &self.draft
    }

    /// Mutable access to the draft; any edit clears the step error
    pub fn draft_mut(&mut self) -> &mut CampaignDraft {
        self.error = None;
        &mut self.draft
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_editing(&self) -> bool {
        self.draft.campaign_id.is_some()
    }

    pub fn step_views(&self) -> Vec<StepView> {
        WizardStep::ALL
            .iter()
            .map(|&step| StepView {
                step,
                current: step == self.current,
                completed: step.index() < self.current.index(),
            })
            .collect()
    }

    /// Validate the current step and advance when it passes
    pub fn next(&mut self) -> std::result::Result<WizardStep, StepError> {
        if self.closed {
            return Err(StepError::Closed);
        }

        if let Err(err) = self.draft.validate_step(self.current) {
            debug!(step = %self.current, "Step validation failed: {}", err);
            self.error = Some(err.to_string());
            return Err(err);
        }

        self.error = None;
        if let Some(next) = WizardStep::from_index(self.current.index() + 1) {
            debug!(from = %self.current, to = %next, "Wizard advanced");
            self.current = next;
        }
        Ok(self.current)
    }

    /// Go back one step without validating
    pub fn previous(&mut self) -> WizardStep {
        if let Some(index) = self.current.index().checked_sub(1) {
            self.current = WizardStep::from_index(index).unwrap_or(WizardStep::BasicInfo);
        }
        self.current
    }

    /// Validate the draft and save it; on success the wizard closes.
    ///
    /// Failures are recorded in [`CampaignWizard::error`] and leave the
    /// wizard open for a retry.
    pub async fn finish(&mut self, persistence: &dyn CampaignPersistence) -> Result<Campaign> {
        if self.closed {
            return Err(StepError::Closed.into());
        }
        if !self.current.is_last() {
            return Err(StepError::NotOnLastStep.into());
        }

        if let Some(err) = WizardStep::ALL
            .iter()
            .find_map(|&step| self.draft.validate_step(step).err())
        {
            self.error = Some(err.to_string());
            return Err(err.into());
        }

        self.error = None;
        match persistence.save_draft(&mut self.draft).await {
            Ok(campaign) => {
                info!(
                    campaign_id = %campaign.id,
                    contacts = self.draft.contacts.len(),
                    messages = self.draft.messages.len(),
                    "Campaign saved from wizard"
                );
                self.close();
                Ok(campaign)
            }
            Err(err) => {
                warn!("Failed to save campaign: {}", err);
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Discard the draft and close the wizard
    pub fn close(&mut self) {
        self.draft = CampaignDraft::new(&self.defaults);
        self.current = WizardStep::BasicInfo;
        self.error = None;
        self.closed = true;
    }
}
