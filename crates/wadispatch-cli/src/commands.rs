//! Subcommand handlers

use crate::args::PreviewArgs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use wadispatch_common::config::DefaultsConfig;
use wadispatch_common::types::ContentType;
use wadispatch_core::{
    advisories, available_variables, validate_sending_config, ApiConfigManager, CampaignEstimate,
    CampaignManager, ContactImportResult, ContactSet, MessageSequence, TemplateRenderer,
};
use wadispatch_storage::models::SendingConfigurationForm;
use wadispatch_storage::Backend;

/// Everything `preview` reports about a contacts file
#[derive(Debug, Serialize)]
pub struct PreviewReport {
    pub import: ContactImportResult,
    pub contact_count: usize,
    pub variables: Vec<String>,
    /// Rendered messages for the first imported contact
    pub first_contact: Vec<String>,
    pub sending: SendingConfigurationForm,
    pub sending_error: Option<String>,
    pub advisories: Vec<String>,
    pub estimate: CampaignEstimate,
    pub estimated_duration: String,
}

/// Pacing from configured defaults with command-line overrides
pub fn sending_form(args: &PreviewArgs, defaults: &DefaultsConfig) -> SendingConfigurationForm {
    SendingConfigurationForm {
        min_delay_seconds: args.min_delay.unwrap_or(defaults.min_delay_seconds),
        max_delay_seconds: args.max_delay.unwrap_or(defaults.max_delay_seconds),
        pause_after_messages: args.pause_after.unwrap_or(defaults.pause_after_messages),
        pause_duration_seconds: args
            .pause_duration
            .unwrap_or(defaults.pause_duration_seconds),
        daily_limit: args.daily_limit,
        ..Default::default()
    }
}

pub fn build_preview(
    csv: &str,
    message: Option<&str>,
    sending: SendingConfigurationForm,
) -> Result<PreviewReport> {
    let mut contacts = ContactSet::new();
    let import = contacts.import_csv(csv);

    let mut messages = MessageSequence::new();
    if let Some(body) = message {
        messages
            .add(ContentType::Text, body, None)
            .context("Invalid message template")?;
    }

    let first_contact = contacts
        .first()
        .map(|contact| TemplateRenderer::default().preview(messages.as_slice(), contact))
        .unwrap_or_default();

    // without a template each contact still receives one send
    let estimate = CampaignEstimate::compute(contacts.len(), messages.len().max(1), &sending);

    Ok(PreviewReport {
        contact_count: contacts.len(),
        variables: available_variables(contacts.iter())
            .iter()
            .map(|v| v.placeholder())
            .collect(),
        first_contact,
        sending_error: validate_sending_config(&sending).err().map(|e| e.to_string()),
        advisories: advisories(&sending).iter().map(ToString::to_string).collect(),
        estimated_duration: estimate.formatted(),
        estimate,
        sending,
        import,
    })
}

pub fn print_preview(report: &PreviewReport) {
    let import = &report.import;
    println!(
        "Imported {} contacts ({} rejected)",
        import.success_count, import.error_count
    );
    for error in &import.errors {
        if error.row == 0 {
            println!("  error: {}", error.message);
        } else {
            println!("  row {} [{}]: {}", error.row, error.field, error.message);
        }
    }

    println!("Variables: {}", report.variables.join(" "));

    if !report.first_contact.is_empty() {
        println!("First contact preview:");
        for (index, body) in report.first_contact.iter().enumerate() {
            println!("  [{}] {}", index + 1, body);
        }
    }

    let sending = &report.sending;
    println!(
        "Sending: {}-{}s delay, pause {}s every {} sends",
        sending.min_delay_seconds,
        sending.max_delay_seconds,
        sending.pause_duration_seconds,
        sending.pause_after_messages
    );
    if let Some(error) = &report.sending_error {
        println!("  invalid: {}", error);
    }
    for advisory in &report.advisories {
        println!("  warning: {}", advisory);
    }

    println!(
        "Estimate: {} sends, about {}",
        report.estimate.total_sends, report.estimated_duration
    );
    if let Some(days) = report.estimate.daily_limit_days {
        println!("  spread over {} day(s) by the daily limit", days);
    }
}

pub async fn preview(args: &PreviewArgs, defaults: &DefaultsConfig, json: bool) -> Result<()> {
    let csv = std::fs::read_to_string(&args.csv)
        .with_context(|| format!("Failed to read {}", args.csv.display()))?;
    let message = args
        .message
        .as_ref()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))
        })
        .transpose()?;

    let report = build_preview(&csv, message.as_deref(), sending_form(args, defaults))?;
    info!(
        contacts = report.contact_count,
        rejected = report.import.error_count,
        "Preview built"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_preview(&report);
    }
    Ok(())
}

pub async fn campaigns(backend: Arc<dyn Backend>, json: bool) -> Result<()> {
    let manager = CampaignManager::new(backend);
    let campaigns = manager.list().await?;
    let overview = wadispatch_core::CampaignOverview::from_campaigns(&campaigns);

    if json {
        let body = serde_json::json!({ "overview": overview, "campaigns": campaigns });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!(
        "{} campaigns: {} draft, {} scheduled, {} running, {} paused, {} completed, {} failed",
        overview.total,
        overview.draft,
        overview.scheduled,
        overview.running,
        overview.paused,
        overview.completed,
        overview.failed
    );
    for campaign in &campaigns {
        println!(
            "{}  {:<10} {}  (created {})",
            campaign.id,
            campaign.status,
            campaign.name,
            campaign.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub async fn apis(backend: Arc<dyn Backend>, json: bool) -> Result<()> {
    let configs = ApiConfigManager::new(backend).list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&configs)?);
        return Ok(());
    }

    for config in &configs {
        println!(
            "{}  {:<16} {:<12} {}{}",
            config.id,
            config.api_type.label(),
            config.connection_status,
            config.name,
            if config.is_active { "" } else { " (inactive)" }
        );
    }
    Ok(())
}

pub async fn test_api(backend: Arc<dyn Backend>, id: Uuid, json: bool) -> Result<()> {
    let response = ApiConfigManager::new(backend)
        .test_connection(id)
        .await
        .map_err(wadispatch_common::Error::from)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if response.success {
        println!("Connected: {}", response.message);
    } else {
        println!("Connection failed: {}", response.message);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const CSV: &str = "telefone,nome,cidade\n\
                       (11) 99999-0001,Ana,São Paulo\n\
                       123,Bruno,Rio\n\
                       5511999990002,,Recife";

    #[test]
    fn test_build_preview() {
        let report = build_preview(
            CSV,
            Some("Oi {{nome}} de {{cidade}}"),
            SendingConfigurationForm::default(),
        )
        .unwrap();

        assert_eq!(report.contact_count, 2);
        assert_eq!(report.import.error_count, 1);
        assert_eq!(report.import.errors[0].row, 3);
        assert_eq!(
            report.variables,
            vec!["{{nome}}", "{{telefone}}", "{{id}}", "{{cidade}}"]
        );
        assert_eq!(report.first_contact, vec!["Oi Ana de São Paulo"]);
        assert_eq!(report.sending_error, None);
        assert_eq!(report.estimate.total_sends, 2);
        assert_eq!(report.estimated_duration, "0min");
    }

    #[test]
    fn test_build_preview_without_message() {
        let form = SendingConfigurationForm {
            min_delay_seconds: 0,
            pause_after_messages: 0,
            ..Default::default()
        };
        let report = build_preview(CSV, None, form).unwrap();

        assert!(report.first_contact.is_empty());
        assert_eq!(report.estimate.total_sends, 2);
        assert!(report.sending_error.is_some());
        assert_eq!(
            report.advisories,
            vec!["pause_after_messages is 0, sending will never pause"]
        );
    }

    #[test]
    fn test_sending_form_overrides() {
        let args = PreviewArgs {
            csv: PathBuf::from("c.csv"),
            max_delay: Some(30),
            pause_after: Some(0),
            ..Default::default()
        };
        let form = sending_form(&args, &DefaultsConfig::default());
        assert_eq!(form.min_delay_seconds, 5);
        assert_eq!(form.max_delay_seconds, 30);
        assert_eq!(form.pause_after_messages, 0);
        assert_eq!(form.pause_duration_seconds, 300);
    }

    #[tokio::test]
    async fn test_preview_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("contacts.csv");
        std::fs::write(&csv, CSV).unwrap();

        let args = PreviewArgs {
            csv,
            ..Default::default()
        };
        preview(&args, &DefaultsConfig::default(), true)
            .await
            .unwrap();

        let missing = PreviewArgs {
            csv: dir.path().join("missing.csv"),
            ..Default::default()
        };
        assert!(preview(&missing, &DefaultsConfig::default(), false)
            .await
            .is_err());
    }
}
