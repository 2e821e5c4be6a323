//! PayTR iframe-token client.
//!
//! The concatenation order inside [`sign`] and the appended-salt placement
//! are the binding part of the gateway contract: any reordering produces a
//! token the gateway rejects.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::config::PaytrConfig;

const TOKEN_ENDPOINT: &str = "https://www.paytr.com/odeme/api/get-token";

#[derive(Debug, Error)]
pub enum PaytrError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with a non-success status; carries its reason
    /// verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Everything the gateway needs for one payment session, minus the merchant
/// credentials that live in [`PaytrConfig`].
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub user_ip: String,
    pub merchant_oid: String,
    pub email: String,
    /// Integer minor currency units (total × 100, rounded).
    pub payment_amount: i64,
    /// Base64 basket descriptor from [`encode_basket`].
    pub user_basket: String,
    pub no_installment: u8,
    pub max_installment: u8,
    pub currency: String,
    pub user_name: String,
    pub user_address: String,
    pub user_phone: String,
    pub ok_url: String,
    pub fail_url: String,
}

/// Serializes the `(title, price, quantity)` triples to a JSON array and
/// base64-encodes it. Display/audit data only.
pub fn encode_basket(basket: &[(String, String, i32)]) -> String {
    let json = serde_json::to_string(basket).unwrap_or_else(|_| "[]".to_string());
    BASE64.encode(json.as_bytes())
}

/// HMAC-SHA256 over the fixed field concatenation, salt appended last,
/// keyed by the merchant key, base64-encoded.
pub fn sign(config: &PaytrConfig, req: &TokenRequest) -> String {
    let payload = format!(
        "{}{}{}{}{}{}{}{}{}{}{}",
        config.merchant_id,
        req.user_ip,
        req.merchant_oid,
        req.email,
        req.payment_amount,
        req.user_basket,
        req.no_installment,
        req.max_installment,
        req.currency,
        test_mode_flag(config),
        config.merchant_salt,
    );
    hmac_base64(&config.merchant_key, &payload)
}

/// Expected digest for the gateway's out-of-band result callback.
pub fn callback_signature(config: &PaytrConfig, merchant_oid: &str, status: &str, total_amount: &str) -> String {
    let payload = format!(
        "{}{}{}{}",
        merchant_oid, config.merchant_salt, status, total_amount
    );
    hmac_base64(&config.merchant_key, &payload)
}

pub fn verify_callback(
    config: &PaytrConfig,
    merchant_oid: &str,
    status: &str,
    total_amount: &str,
    hash: &str,
) -> bool {
    callback_signature(config, merchant_oid, status, total_amount) == hash
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    status: String,
    token: Option<String>,
    reason: Option<String>,
}

/// One-shot token exchange; no retry. A failed exchange means the buyer
/// restarts checkout, which creates a new order and merchant_oid.
pub async fn request_iframe_token(
    http: &reqwest::Client,
    config: &PaytrConfig,
    req: &TokenRequest,
) -> Result<String, PaytrError> {
    let token = sign(config, req);
    let test_mode = test_mode_flag(config);

    let params: Vec<(&str, String)> = vec![
        ("merchant_id", config.merchant_id.clone()),
        ("user_ip", req.user_ip.clone()),
        ("merchant_oid", req.merchant_oid.clone()),
        ("email", req.email.clone()),
        ("payment_amount", req.payment_amount.to_string()),
        ("paytr_token", token),
        ("user_basket", req.user_basket.clone()),
        ("debug_on", "0".to_string()),
        ("no_installment", req.no_installment.to_string()),
        ("max_installment", req.max_installment.to_string()),
        ("user_name", req.user_name.clone()),
        ("user_address", req.user_address.clone()),
        ("user_phone", req.user_phone.clone()),
        ("merchant_ok_url", req.ok_url.clone()),
        ("merchant_fail_url", req.fail_url.clone()),
        ("timeout_limit", "30".to_string()),
        ("currency", req.currency.clone()),
        ("test_mode", test_mode.to_string()),
    ];

    let resp = http.post(TOKEN_ENDPOINT).form(&params).send().await?;
    let body = resp.text().await?;

    let parsed = serde_json::from_str::<TokenResponse>(&body)
        .map_err(|e| PaytrError::InvalidResponse(format!("{e}; body={body}")))?;

    if parsed.status == "success" {
        parsed
            .token
            .ok_or_else(|| PaytrError::InvalidResponse("success without token".to_string()))
    } else {
        Err(PaytrError::Rejected(
            parsed.reason.unwrap_or_else(|| "unknown reason".to_string()),
        ))
    }
}

fn test_mode_flag(config: &PaytrConfig) -> u8 {
    u8::from(config.test_mode)
}

fn hmac_base64(key: &str, payload: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaytrConfig {
        PaytrConfig {
            merchant_id: "123456".into(),
            merchant_key: "test-key".into(),
            merchant_salt: "test-salt".into(),
            test_mode: true,
        }
    }

    fn request() -> TokenRequest {
        TokenRequest {
            user_ip: "203.0.113.7".into(),
            merchant_oid: "ORDabc123XYZ0".into(),
            email: "buyer@example.com".into(),
            payment_amount: 16000,
            user_basket: encode_basket(&[("p1-title".into(), "80".into(), 2)]),
            no_installment: 0,
            max_installment: 0,
            currency: "TL".into(),
            user_name: "Ayşe Yılmaz".into(),
            user_address: "Kadıköy, İstanbul".into(),
            user_phone: "+905551112233".into(),
            ok_url: "https://store.example/checkout/ok".into(),
            fail_url: "https://store.example/checkout/fail".into(),
        }
    }

    #[test]
    fn test_signature_is_deterministic() {
        assert_eq!(sign(&config(), &request()), sign(&config(), &request()));
    }

    #[test]
    fn test_any_field_change_changes_signature() {
        let base = sign(&config(), &request());

        let mut req = request();
        req.email = "other@example.com".into();
        assert_ne!(sign(&config(), &req), base);

        let mut req = request();
        req.payment_amount += 1;
        assert_ne!(sign(&config(), &req), base);

        let mut cfg = config();
        cfg.merchant_salt = "other-salt".into();
        assert_ne!(sign(&cfg, &request()), base);

        let mut cfg = config();
        cfg.test_mode = false;
        assert_ne!(sign(&cfg, &request()), base);
    }

    #[test]
    fn test_field_order_matters() {
        // Swapping two fields of equal textual weight must not collide:
        // the concatenation order is part of the gateway contract.
        let mut a = request();
        a.no_installment = 0;
        a.max_installment = 1;
        let mut b = request();
        b.no_installment = 1;
        b.max_installment = 0;
        assert_ne!(sign(&config(), &a), sign(&config(), &b));
    }

    #[test]
    fn test_basket_round_trip() {
        let basket = vec![
            ("p1-title".to_string(), "80".to_string(), 2),
            ("Şık Çay Takımı".to_string(), "129.9".to_string(), 1),
        ];
        let encoded = encode_basket(&basket);

        let decoded = BASE64.decode(encoded.as_bytes()).unwrap();
        let round: Vec<(String, String, i32)> =
            serde_json::from_slice(&decoded).unwrap();
        assert_eq!(round, basket);
    }

    #[test]
    fn test_callback_verification() {
        let cfg = config();
        let good = callback_signature(&cfg, "ORDabc123XYZ0", "success", "16000");
        assert!(verify_callback(&cfg, "ORDabc123XYZ0", "success", "16000", &good));
        assert!(!verify_callback(&cfg, "ORDabc123XYZ0", "failed", "16000", &good));
        assert!(!verify_callback(&cfg, "ORDabc123XYZ0", "success", "16001", &good));
        assert!(!verify_callback(&cfg, "ORDother", "success", "16000", &good));
    }
}
