//! Fulfillment email delivery via the SendGrid API.
//!
//! This is a boundary module: every failure (missing API key, unreadable
//! attachment, provider rejection, network error) collapses into the
//! returned [`EmailSendResult`] so the confirmation flow can record the
//! outcome and continue. Nothing here propagates as an error.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;

use crate::config::EmailConfig;
use crate::models::User;

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Result of attempting to send the fulfillment email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    /// Provider accepted the message
    Sent {
        /// Whether the PDF was attached (false = "on its way" fallback body)
        pdf_attached: bool,
    },
    /// No API key configured - delivery disabled, log only
    NoApiKey,
    /// Provider rejected the message or the request failed
    Failed,
}

impl EmailSendResult {
    /// Whether the provider confirmed acceptance.
    pub fn delivered(&self) -> bool {
        matches!(self, EmailSendResult::Sent { .. })
    }
}

// ============ SendGrid request body ============

#[derive(Debug, Serialize)]
struct MailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<MailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct MailContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: String,
}

#[derive(Debug, Serialize)]
struct MailAttachment<'a> {
    /// Base64-encoded file content
    content: String,
    #[serde(rename = "type")]
    content_type: &'a str,
    filename: &'a str,
    disposition: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: MailAddress<'a>,
    subject: String,
    content: Vec<MailContent<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<MailAttachment<'a>>,
}

/// Email service using the SendGrid API.
#[derive(Clone)]
pub struct EmailService {
    api_key: Option<String>,
    from_email: String,
    from_name: String,
    product_name: String,
    pdf_path: String,
    http_client: Client,
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
            product_name: config.product_name.clone(),
            pdf_path: config.pdf_path.clone(),
            http_client: Client::new(),
        }
    }

    /// Send the purchase fulfillment email to `user`.
    ///
    /// Attaches the configured PDF when it is readable; otherwise sends the
    /// "on its way" variant without an attachment. Returns `Sent` only on a
    /// 2xx provider response.
    pub async fn send_fulfillment_email(&self, user: &User) -> EmailSendResult {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(
                to = %user.email,
                "No SendGrid API key configured, cannot send fulfillment email"
            );
            return EmailSendResult::NoApiKey;
        };

        // Attach PDF if available; fall back to the pending-delivery body.
        let (body, attachment) = match tokio::fs::read(&self.pdf_path).await {
            Ok(pdf_bytes) => (
                build_email_body(&user.name, &self.product_name),
                Some(MailAttachment {
                    content: BASE64.encode(&pdf_bytes),
                    content_type: "application/pdf",
                    filename: "Interview-Questions.pdf",
                    disposition: "attachment",
                }),
            ),
            Err(e) => {
                tracing::warn!(
                    path = %self.pdf_path,
                    error = %e,
                    to = %user.email,
                    "Could not read PDF, sending email without attachment"
                );
                (build_email_body_pending(&user.name, &self.product_name), None)
            }
        };
        let pdf_attached = attachment.is_some();

        let request = SendMailRequest {
            personalizations: vec![Personalization {
                to: vec![MailAddress {
                    email: &user.email,
                    name: Some(&user.name),
                }],
            }],
            from: MailAddress {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            subject: format!("Your {} is here!", self.product_name),
            content: vec![MailContent {
                content_type: "text/html",
                value: body,
            }],
            attachments: attachment.into_iter().collect(),
        };

        let response = match self
            .http_client
            .post(SENDGRID_API_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(to = %user.email, error = %e, "Failed to send request to SendGrid");
                return EmailSendResult::Failed;
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::info!(
                to = %user.email,
                pdf_attached,
                "Fulfillment email sent via SendGrid"
            );
            EmailSendResult::Sent { pdf_attached }
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                to = %user.email,
                status = %status,
                body = %body,
                "SendGrid API rejected fulfillment email"
            );
            EmailSendResult::Failed
        }
    }
}

fn build_email_body(name: &str, product_name: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">Thank you, {}!</h2>
<p>Your purchase is complete. Attached is your <strong>{}</strong>.</p>
<p style="color: #666;">Keep this email safe - it's your proof of purchase.</p>
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<p style="color: #999; font-size: 12px;">If the attachment is missing, reply to this email and we'll resend it.</p>
</body>
</html>"#,
        name, product_name
    )
}

fn build_email_body_pending(name: &str, product_name: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">Thank you, {}!</h2>
<p>Your purchase is complete. Your <strong>{}</strong> is on its way and will reach this address within 24 hours.</p>
<p style="color: #666;">Keep this email safe - it's your proof of purchase.</p>
</body>
</html>"#,
        name, product_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_body_includes_buyer_and_product() {
        let body = build_email_body("Asha", "Interview Questions eBook");
        assert!(body.contains("Asha"));
        assert!(body.contains("Interview Questions eBook"));
        assert!(body.contains("Attached"));
    }

    #[test]
    fn test_pending_body_promises_delivery() {
        let body = build_email_body_pending("Asha", "Interview Questions eBook");
        assert!(body.contains("on its way"));
        assert!(!body.contains("Attached is"));
    }

    #[test]
    fn test_send_result_delivered() {
        assert!(EmailSendResult::Sent { pdf_attached: true }.delivered());
        assert!(EmailSendResult::Sent { pdf_attached: false }.delivered());
        assert!(!EmailSendResult::NoApiKey.delivered());
        assert!(!EmailSendResult::Failed.delivered());
    }
}
