use serde::{Deserialize, Serialize};

use super::MailError;

/// Subject of the notification sent by [`SendEmailJob`](super::SendEmailJob).
pub const NOTICE_SUBJECT: &str = "Test email";

/// Body of the notification sent by [`SendEmailJob`](super::SendEmailJob).
pub const NOTICE_BODY: &str = "Test email from courier with a background worker";

/// A plain-text email ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Email {
    pub fn builder() -> EmailBuilder {
        EmailBuilder::default()
    }

    /// The fixed notification from `from` to `to`.
    pub fn fixed_notice(from: &str, to: &str) -> Result<Self, MailError> {
        Self::builder()
            .from(from)
            .to(to)
            .subject(NOTICE_SUBJECT)
            .text(NOTICE_BODY)
            .build()
    }
}

/// Builder for [`Email`].
#[derive(Debug, Default)]
pub struct EmailBuilder {
    from: Option<String>,
    to: Option<String>,
    subject: Option<String>,
    text: Option<String>,
}

impl EmailBuilder {
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to = Some(address.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Check that sender, recipient, subject and body are present.
    ///
    /// Addresses are not validated here; the transport rejects what it cannot
    /// parse.
    pub fn build(self) -> Result<Email, MailError> {
        let to = self
            .to
            .ok_or_else(|| MailError::Build("recipient required".into()))?;
        let from = self
            .from
            .ok_or_else(|| MailError::Build("from address required".into()))?;
        let subject = self
            .subject
            .ok_or_else(|| MailError::Build("subject required".into()))?;
        let text = self
            .text
            .ok_or_else(|| MailError::Build("body required".into()))?;

        Ok(Email {
            from,
            to,
            subject,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_notice_has_constant_content() {
        let email = Email::fixed_notice("sender@example.com", "user@example.com").unwrap();

        assert_eq!(email.from, "sender@example.com");
        assert_eq!(email.to, "user@example.com");
        assert_eq!(email.subject, NOTICE_SUBJECT);
        assert_eq!(email.text, NOTICE_BODY);
    }

    #[test]
    fn malformed_recipient_is_passed_through() {
        let email = Email::fixed_notice("sender@example.com", "not an address").unwrap();
        assert_eq!(email.to, "not an address");
    }

    #[test]
    fn build_requires_recipient() {
        let result = Email::builder().from("a@b.com").subject("Hi").text("Body").build();
        assert!(result.is_err());
    }

    #[test]
    fn later_recipient_replaces_earlier() {
        let email = Email::builder()
            .from("a@b.com")
            .to("first@b.com")
            .to("second@b.com")
            .subject("Hi")
            .text("Body")
            .build()
            .unwrap();
        assert_eq!(email.to, "second@b.com");
    }

    #[test]
    fn build_requires_from() {
        let result = Email::builder().to("a@b.com").subject("Hi").text("Body").build();
        assert!(result.is_err());
    }

    #[test]
    fn build_requires_body() {
        let result = Email::builder().from("a@b.com").to("a@b.com").subject("Hi").build();
        assert!(result.is_err());
    }
}
