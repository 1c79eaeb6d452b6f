//! wadispatch Core - campaign authoring pipeline
//!
//! Contacts are ingested from CSV or manual entry, messages are
//! personalised with `{{key}}` placeholders, pacing parameters are
//! validated and estimated, and the wizard sequences it all before
//! handing the draft to the persistence layer.

pub mod api_configs;
pub mod campaigns;
pub mod contacts;
pub mod estimator;
pub mod messages;
pub mod review;
pub mod sending;
pub mod template;
pub mod wizard;

pub use api_configs::{validate_form, ApiConfigError, ApiConfigManager, FieldError};
pub use campaigns::{CampaignError, CampaignManager, CampaignOverview};
pub use contacts::{
    normalize_phone, parse_csv, ContactError, ContactImportResult, ContactSet, ImportError,
    CSV_TEMPLATE,
};
pub use estimator::{format_duration, CampaignEstimate};
pub use messages::{MessageError, MessageSequence};
pub use review::ReviewSummary;
pub use sending::{advisories, validate_sending_config, SendingAdvisory, SendingConfigError};
pub use template::{available_variables, placeholders, TemplateRenderer, TemplateVariable};
pub use wizard::{
    BasicInfo, CampaignDraft, CampaignPersistence, CampaignWizard, StepError, StepView,
    WizardStep,
};
