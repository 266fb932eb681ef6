use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::AlertSettings;
use crate::error::AppError;
use crate::models::{ActionType, Alert, AlertAction, AlertPriority};
use crate::utils::time::format_timestamp;

/// A delivery mechanism for alerts.
///
/// `target` is the per-action destination override (webhook URL or email
/// recipient); channels fall back to their configured destination.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn kind(&self) -> ActionType;

    fn is_enabled(&self) -> bool;

    async fn send(&self, alert: &Alert, target: Option<&str>) -> Result<String, AppError>;
}

/// Writes alerts to the tracing log. Always enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn kind(&self) -> ActionType {
        ActionType::Log
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, alert: &Alert, _target: Option<&str>) -> Result<String, AppError> {
        match alert.priority {
            AlertPriority::Critical | AlertPriority::High => warn!(
                alert_id = %alert.id,
                rule = %alert.rule_id,
                address = %alert.address,
                chain_id = alert.chain_id,
                priority = %alert.priority,
                "ALERT: {}",
                alert.message
            ),
            _ => info!(
                alert_id = %alert.id,
                rule = %alert.rule_id,
                address = %alert.address,
                chain_id = alert.chain_id,
                priority = %alert.priority,
                "ALERT: {}",
                alert.message
            ),
        }
        Ok("logged".to_string())
    }
}

/// Posts a Slack-compatible JSON payload, with the full alert attached.
pub struct WebhookChannel {
    client: Client,
    url: Option<String>,
}

impl WebhookChannel {
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn from_settings(settings: &AlertSettings) -> Result<Self, AppError> {
        let url = if settings.webhook_enabled { settings.webhook_url.clone() } else { None };
        Self::new(url, Duration::from_secs(settings.request_timeout_seconds))
    }

    fn payload(alert: &Alert) -> serde_json::Value {
        let color = match alert.priority {
            AlertPriority::Critical => "#FF0000",
            AlertPriority::High => "#FF8C00",
            AlertPriority::Medium => "#FFD700",
            AlertPriority::Low => "#32CD32",
            AlertPriority::Info => "#808080",
        };
        let risk_score = alert.assessment.get("risk_score").map(|s| s.to_string()).unwrap_or_else(|| "N/A".to_string());

        json!({
            "text": alert.title,
            "attachments": [{
                "color": color,
                "title": alert.title,
                "text": alert.message,
                "fields": [
                    { "title": "Priority", "value": alert.priority.to_string().to_uppercase(), "short": true },
                    { "title": "Risk Score", "value": risk_score, "short": true },
                    { "title": "Address", "value": alert.address, "short": false },
                    { "title": "Chain", "value": alert.chain_id.to_string(), "short": true },
                    { "title": "Triggered", "value": format_timestamp(alert.triggered_at), "short": true }
                ],
                "footer": "Address Risk Monitor",
                "ts": alert.triggered_at.timestamp()
            }],
            "alert": alert
        })
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn kind(&self) -> ActionType {
        ActionType::Webhook
    }

    fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    async fn send(&self, alert: &Alert, target: Option<&str>) -> Result<String, AppError> {
        let url = target
            .or(self.url.as_deref())
            .ok_or_else(|| AppError::AlertError("No webhook URL configured".to_string()))?;

        let response = self.client
            .post(url)
            .json(&Self::payload(alert))
            .send()
            .await
            .map_err(|e| AppError::AlertError(format!("Failed to send webhook alert: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::AlertError(format!("Webhook returned status: {}", response.status())));
        }

        Ok(format!("webhook delivered ({})", response.status()))
    }
}

/// Sends mail through an HTTP relay API. Disabled unless configured.
pub struct EmailChannel {
    client: Client,
    api_url: Option<String>,
    api_key: Option<String>,
    sender: String,
    recipients: Vec<String>,
    enabled: bool,
}

impl EmailChannel {
    pub fn from_settings(settings: &AlertSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_url: settings.email_api_url.clone(),
            api_key: settings.email_api_key.clone(),
            sender: settings.email_sender.clone().unwrap_or_else(|| "alerts@localhost".to_string()),
            recipients: settings.email_recipients.clone(),
            enabled: settings.email_enabled && settings.email_api_url.is_some(),
        })
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn kind(&self) -> ActionType {
        ActionType::Email
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, alert: &Alert, target: Option<&str>) -> Result<String, AppError> {
        let api_url = self.api_url.as_deref()
            .ok_or_else(|| AppError::AlertError("No email API configured".to_string()))?;
        let recipients: Vec<String> = match target {
            Some(recipient) => vec![recipient.to_string()],
            None => self.recipients.clone(),
        };
        if recipients.is_empty() {
            return Err(AppError::AlertError("No email recipients configured".to_string()));
        }

        let payload = json!({
            "from": self.sender,
            "to": recipients,
            "subject": format!("[{}] {}", alert.priority.to_string().to_uppercase(), alert.title),
            "text": alert.message,
        });

        let mut request = self.client.post(api_url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::AlertError(format!("Failed to send email alert: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::AlertError(format!("Email API returned status: {}", response.status())));
        }

        Ok(format!("email sent to {} recipient(s)", recipients.len()))
    }
}

/// Routes alert actions to channels and records every outcome on the alert.
pub struct AlertDispatcher {
    channels: HashMap<ActionType, Arc<dyn AlertChannel>>,
}

impl AlertDispatcher {
    /// Dispatcher with only the log channel.
    pub fn new() -> Self {
        let mut channels: HashMap<ActionType, Arc<dyn AlertChannel>> = HashMap::new();
        channels.insert(ActionType::Log, Arc::new(LogChannel));
        Self { channels }
    }

    pub fn from_settings(settings: &AlertSettings) -> Result<Self, AppError> {
        Ok(Self::new()
            .with_channel(Arc::new(WebhookChannel::from_settings(settings)?))
            .with_channel(Arc::new(EmailChannel::from_settings(settings)?)))
    }

    /// Register a channel, replacing any existing channel of the same kind.
    pub fn with_channel(mut self, channel: Arc<dyn AlertChannel>) -> Self {
        self.channels.insert(channel.kind(), channel);
        self
    }

    pub fn has_channel(&self, kind: ActionType) -> bool {
        self.channels.get(&kind).is_some_and(|c| c.is_enabled())
    }

    /// Execute actions in order. A failing action never stops the rest.
    /// Returns the number of successful deliveries.
    pub async fn dispatch(&self, alert: &mut Alert, actions: &[AlertAction]) -> usize {
        for action in actions {
            let outcome = match self.channels.get(&action.action_type) {
                None => Err(AppError::AlertError(format!("No channel for action {}", action.action_type))),
                Some(channel) if !channel.is_enabled() => {
                    Err(AppError::AlertError(format!("Channel {} is disabled", action.action_type)))
                }
                Some(channel) => channel.send(alert, action.target.as_deref()).await,
            };

            let channel_name = action.action_type.to_string();
            match outcome {
                Ok(message) => {
                    counter!("risk_monitor_alert_actions_total", 1, "channel" => channel_name.clone(), "outcome" => "success");
                    alert.record_action(action.action_type, &channel_name, true, message);
                }
                Err(e) => {
                    warn!(alert_id = %alert.id, channel = %channel_name, error = %e, "Alert action failed");
                    counter!("risk_monitor_alert_actions_total", 1, "channel" => channel_name.clone(), "outcome" => "failure");
                    alert.record_action(action.action_type, &channel_name, false, e.to_string());
                }
            }
        }

        let delivered = alert.successful_actions();
        info!(alert_id = %alert.id, delivered, attempted = actions.len(), "Alert dispatched");
        delivered
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
