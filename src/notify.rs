//! Transactional email through a third-party API.
//!
//! Sends are spawned and their failures logged, never surfaced: a broken
//! email vendor must not block an order or a ticket write.

use serde_json::json;

use crate::config::EmailConfig;
use crate::models::{Order, SupportTicket};

const EMAIL_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    config: Option<EmailConfig>,
    site_url: String,
}

impl Mailer {
    pub fn new(http: reqwest::Client, config: Option<EmailConfig>, site_url: String) -> Self {
        Self {
            http,
            config,
            site_url,
        }
    }

    pub fn ticket_created(&self, ticket: &SupportTicket) {
        let Some(config) = self.config.clone() else {
            return;
        };
        let subject = format!("New support ticket: {}", ticket.subject);
        let link = format!("{}/admin/support/{}", self.site_url, ticket.id);
        let html = format!(
            "<p>A new ticket was opened.</p><p><a href=\"{link}\">Open in the admin panel</a></p>"
        );
        self.spawn_send(config.clone(), config.support_address.clone(), subject, html);
    }

    pub fn order_confirmation(&self, to: &str, order: &Order) {
        let Some(config) = self.config.clone() else {
            return;
        };
        let subject = format!("Order received: {}", order.merchant_oid);
        let link = format!("{}/orders/{}", self.site_url, order.id);
        let html = format!(
            "<p>We received your order of {} TL.</p><p><a href=\"{link}\">Track it here</a></p>",
            order.total
        );
        self.spawn_send(config, to.to_string(), subject, html);
    }

    fn spawn_send(&self, config: EmailConfig, to: String, subject: String, html: String) {
        let http = self.http.clone();
        tokio::spawn(async move {
            let body = json!({
                "from": config.from_address,
                "to": [to],
                "subject": subject,
                "html": html,
            });
            let result = http
                .post(EMAIL_ENDPOINT)
                .bearer_auth(&config.api_key)
                .json(&body)
                .send()
                .await;
            match result {
                Ok(resp) if !resp.status().is_success() => {
                    tracing::warn!(status = %resp.status(), "email API rejected notification");
                }
                Err(e) => tracing::warn!(error = %e, "failed to send notification email"),
                Ok(_) => {}
            }
        });
    }
}
