//! WhatsApp bill dispatch through Twilio's Messages API.
//!
//! Send-once semantics: the core never retries, and a dispatch failure does
//! not touch any committed billing state. Twilio fetches the bill PDF over
//! HTTP itself, so the message carries a media URL, not the document.

use base64::Engine;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Clone)]
struct TwilioCredentials {
    account_sid: String,
    auth_token: String,
    from_number: String,
}

/// Outbound WhatsApp sender. Constructed once at startup; unconfigured
/// deployments get a sender that reports a typed failure instead of
/// panicking at send time.
#[derive(Clone)]
pub struct WhatsAppSender {
    http: reqwest::Client,
    credentials: Option<TwilioCredentials>,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
}

impl WhatsAppSender {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let credentials = match (
            cfg.twilio_account_sid.clone(),
            cfg.twilio_auth_token.clone(),
            cfg.twilio_whatsapp_number.clone(),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioCredentials {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => {
                warn!("Twilio not configured; WhatsApp dispatch disabled");
                None
            }
        };

        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            credentials,
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    /// Test constructor pointing at a stand-in API host.
    #[doc(hidden)]
    pub fn with_api_base(
        account_sid: &str,
        auth_token: &str,
        from_number: &str,
        api_base: &str,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials: Some(TwilioCredentials {
                account_sid: account_sid.to_string(),
                auth_token: auth_token.to_string(),
                from_number: from_number.to_string(),
            }),
            api_base: api_base.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Sends one WhatsApp message, optionally with a bill PDF media link.
    ///
    /// `to` is an E.164 number without the `whatsapp:` prefix.
    #[instrument(skip(self, body))]
    pub async fn send(
        &self,
        to: &str,
        body: &str,
        media_url: Option<&str>,
    ) -> Result<String, ServiceError> {
        let creds = self.credentials.as_ref().ok_or_else(|| {
            ServiceError::ExternalServiceError("WhatsApp dispatch is not configured".to_string())
        })?;

        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base, creds.account_sid
        );
        let auth = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", creds.account_sid, creds.auth_token));

        let mut form = vec![
            ("From", creds.from_number.clone()),
            ("To", format!("whatsapp:{to}")),
            ("Body", body.to_string()),
        ];
        if let Some(media) = media_url {
            form.push(("MediaUrl", media.to_string()));
        }

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Basic {auth}"))
            .form(&form)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Twilio request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, %detail, "Twilio rejected the message");
            return Err(ServiceError::ExternalServiceError(format!(
                "Twilio returned {status}"
            )));
        }

        let message: TwilioMessageResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Twilio response: {e}")))?;

        info!(sid = %message.sid, "WhatsApp message dispatched");
        Ok(message.sid)
    }
}
