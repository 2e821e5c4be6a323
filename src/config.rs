//! Process configuration, loaded once at startup from the environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::info;

use crate::sms::SmsProviderKind;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Shared secret of the delegated auth provider; used only to verify
    /// bearer tokens, never to mint them.
    pub auth_jwt_secret: String,
    pub site_url: String,
    pub paytr: Option<PaytrConfig>,
    pub sms_provider: SmsProviderKind,
    pub netgsm: Option<NetgsmConfig>,
    pub twilio: Option<TwilioConfig>,
    pub email: Option<EmailConfig>,
    pub nats_url: Option<String>,
    pub storage: Option<StorageConfig>,
}

/// Merchant credentials for the payment gateway. Absent credentials are a
/// request-time error on checkout, not a startup failure.
#[derive(Clone)]
pub struct PaytrConfig {
    pub merchant_id: String,
    pub merchant_key: String,
    pub merchant_salt: String,
    pub test_mode: bool,
}

#[derive(Clone)]
pub struct NetgsmConfig {
    pub usercode: String,
    pub password: String,
    pub header: String,
}

#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub from_address: String,
    pub support_address: String,
}

#[derive(Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub public_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let paytr = match (
            env::var("PAYTR_MERCHANT_ID").ok(),
            env::var("PAYTR_MERCHANT_KEY").ok(),
            env::var("PAYTR_MERCHANT_SALT").ok(),
        ) {
            (Some(merchant_id), Some(merchant_key), Some(merchant_salt)) => Some(PaytrConfig {
                merchant_id,
                merchant_key,
                merchant_salt,
                test_mode: flag("PAYTR_TEST_MODE"),
            }),
            _ => None,
        };

        let netgsm = match (
            env::var("NETGSM_USERCODE").ok(),
            env::var("NETGSM_PASSWORD").ok(),
        ) {
            (Some(usercode), Some(password)) => Some(NetgsmConfig {
                usercode,
                password,
                header: env::var("NETGSM_HEADER").unwrap_or_default(),
            }),
            _ => None,
        };

        let twilio = match (
            env::var("TWILIO_ACCOUNT_SID").ok(),
            env::var("TWILIO_AUTH_TOKEN").ok(),
            env::var("TWILIO_FROM_NUMBER").ok(),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let email = env::var("EMAIL_API_KEY").ok().map(|api_key| EmailConfig {
            api_key,
            from_address: try_load("EMAIL_FROM", "store@maison.example"),
            support_address: try_load("SUPPORT_EMAIL", "support@maison.example"),
        });

        let storage = env::var("S3_BUCKET").ok().map(|bucket| {
            let public_base_url = env::var("S3_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("https://{}.s3.amazonaws.com", bucket));
            StorageConfig {
                bucket,
                endpoint: env::var("S3_ENDPOINT").ok(),
                public_base_url,
            }
        });

        Ok(Self {
            port: try_load("PORT", "8083"),
            database_url: env::var("DATABASE_URL")?,
            auth_jwt_secret: env::var("AUTH_JWT_SECRET")?,
            site_url: try_load("SITE_URL", "http://localhost:3000"),
            paytr,
            sms_provider: try_load("SMS_PROVIDER", "MOCK"),
            netgsm,
            twilio,
            email,
            nats_url: env::var("NATS_URL").ok(),
            storage,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .unwrap_or_else(|e| panic!("invalid {key} value {raw:?}: {e}"))
}

fn flag(key: &str) -> bool {
    matches!(
        env::var(key).unwrap_or_default().as_str(),
        "1" | "true" | "TRUE"
    )
}
