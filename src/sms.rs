//! Pluggable SMS delivery. Provider selected by `SMS_PROVIDER`; the mock
//! provider only logs, which is the default outside production.

use std::str::FromStr;

use thiserror::Error;

use crate::config::{Config, NetgsmConfig, TwilioConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsProviderKind {
    Netgsm,
    Twilio,
    Mock,
}

impl FromStr for SmsProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NETGSM" => Ok(SmsProviderKind::Netgsm),
            "TWILIO" => Ok(SmsProviderKind::Twilio),
            "MOCK" => Ok(SmsProviderKind::Mock),
            other => Err(format!("unknown SMS provider {other:?}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("sms provider selected but not configured")]
    NotConfigured,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider error: {0}")]
    Provider(String),
}

#[derive(Clone)]
pub struct SmsService {
    http: reqwest::Client,
    kind: SmsProviderKind,
    netgsm: Option<NetgsmConfig>,
    twilio: Option<TwilioConfig>,
}

impl SmsService {
    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            kind: config.sms_provider,
            netgsm: config.netgsm.clone(),
            twilio: config.twilio.clone(),
        }
    }

    pub async fn send(&self, phone: &str, message: &str) -> Result<(), SmsError> {
        match self.kind {
            SmsProviderKind::Mock => {
                tracing::info!(phone, message, "mock SMS send");
                Ok(())
            }
            SmsProviderKind::Netgsm => {
                let config = self.netgsm.as_ref().ok_or(SmsError::NotConfigured)?;
                self.send_netgsm(config, phone, message).await
            }
            SmsProviderKind::Twilio => {
                let config = self.twilio.as_ref().ok_or(SmsError::NotConfigured)?;
                self.send_twilio(config, phone, message).await
            }
        }
    }

    async fn send_netgsm(
        &self,
        config: &NetgsmConfig,
        phone: &str,
        message: &str,
    ) -> Result<(), SmsError> {
        let resp = self
            .http
            .get("https://api.netgsm.com.tr/sms/send/get")
            .query(&[
                ("usercode", config.usercode.as_str()),
                ("password", config.password.as_str()),
                ("gsmno", phone),
                ("message", message),
                ("msgheader", config.header.as_str()),
            ])
            .send()
            .await?;
        let body = resp.text().await?;

        // Netgsm replies with a numeric result code; 00/01/02 are accepted.
        match body.split_whitespace().next() {
            Some("00") | Some("01") | Some("02") => Ok(()),
            _ => Err(SmsError::Provider(body)),
        }
    }

    async fn send_twilio(
        &self,
        config: &TwilioConfig,
        phone: &str,
        message: &str,
    ) -> Result<(), SmsError> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            config.account_sid
        );
        let resp = self
            .http
            .post(url)
            .basic_auth(&config.account_sid, Some(&config.auth_token))
            .form(&[
                ("To", phone),
                ("From", config.from_number.as_str()),
                ("Body", message),
            ])
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(SmsError::Provider(resp.text().await.unwrap_or_default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!(
            "NETGSM".parse::<SmsProviderKind>().unwrap(),
            SmsProviderKind::Netgsm
        );
        assert_eq!(
            "twilio".parse::<SmsProviderKind>().unwrap(),
            SmsProviderKind::Twilio
        );
        assert_eq!(
            "MOCK".parse::<SmsProviderKind>().unwrap(),
            SmsProviderKind::Mock
        );
        assert!("SMSC".parse::<SmsProviderKind>().is_err());
    }

    #[tokio::test]
    async fn test_mock_always_succeeds() {
        let service = SmsService {
            http: reqwest::Client::new(),
            kind: SmsProviderKind::Mock,
            netgsm: None,
            twilio: None,
        };
        assert!(service.send("+905551112233", "hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_closed() {
        let service = SmsService {
            http: reqwest::Client::new(),
            kind: SmsProviderKind::Netgsm,
            netgsm: None,
            twilio: None,
        };
        assert!(matches!(
            service.send("+905551112233", "hello").await,
            Err(SmsError::NotConfigured)
        ));
    }
}
