//! Conversion between the stored email payload and the materialized email
//! handed to a mail transport.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// An attachment as it is stored in a message payload.
///
/// `content` is base64 (standard alphabet, padded) when written by
/// [`EmailPayload::from_email`]. Producers that write the payload themselves
/// may store plain text instead; see [`EmailPayload::to_email`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentData {
    pub filename: String,
    pub content: String,
    pub mimetype: String,
}

/// The serialized form of an email, stored as JSON in the message row.
///
/// Rows written by older producers use `message` for the body,
/// `recipient_list` for the recipients and a single `html_message`; those
/// are read as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailPayload {
    pub subject: String,
    #[serde(alias = "message")]
    pub body: String,
    pub from_email: String,
    #[serde(alias = "recipient_list")]
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Vec<String>,
    pub extra_headers: BTreeMap<String, String>,
    /// Alternative bodies as `(content, mimetype)` pairs, in order
    pub alternatives: Vec<(String, String)>,
    pub attachments: Vec<AttachmentData>,
    /// HTML body of the older format, delivered as a `text/html` alternative
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    pub content: String,
    pub mimetype: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
    pub mimetype: String,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        content: impl Into<Vec<u8>>,
        mimetype: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            mimetype: mimetype.into(),
        }
    }
}

/// A fully materialized email, ready to be handed to a transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub body: String,
    pub from_email: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Vec<String>,
    pub extra_headers: BTreeMap<String, String>,
    pub alternatives: Vec<Alternative>,
    pub attachments: Vec<Attachment>,
}

impl OutgoingEmail {
    /// Start a plain text email
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        from_email: impl Into<String>,
        to: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            from_email: from_email.into(),
            to: to.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_alternative(mut self, content: impl Into<String>, mimetype: impl Into<String>) -> Self {
        self.alternatives.push(Alternative {
            content: content.into(),
            mimetype: mimetype.into(),
        });
        self
    }

    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    /// Every envelope recipient: `to`, `cc` and `bcc`
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
    }

    pub fn has_recipients(&self) -> bool {
        self.recipients().next().is_some()
    }
}

impl EmailPayload {
    /// Capture an email for storage. Attachment bytes are always base64
    /// encoded, so binary content survives the JSON column untouched.
    pub fn from_email(email: &OutgoingEmail) -> Self {
        Self {
            subject: email.subject.clone(),
            body: email.body.clone(),
            from_email: email.from_email.clone(),
            to: email.to.clone(),
            cc: email.cc.clone(),
            bcc: email.bcc.clone(),
            reply_to: email.reply_to.clone(),
            extra_headers: email.extra_headers.clone(),
            alternatives: email
                .alternatives
                .iter()
                .map(|alternative| (alternative.content.clone(), alternative.mimetype.clone()))
                .collect(),
            attachments: email
                .attachments
                .iter()
                .map(|attachment| AttachmentData {
                    filename: attachment.filename.clone(),
                    content: STANDARD.encode(&attachment.content),
                    mimetype: attachment.mimetype.clone(),
                })
                .collect(),
            html_message: None,
        }
    }

    /// Rebuild the email. Attachment content that is not valid base64 is
    /// taken verbatim as UTF-8 bytes.
    pub fn to_email(&self) -> OutgoingEmail {
        OutgoingEmail {
            subject: self.subject.clone(),
            body: self.body.clone(),
            from_email: self.from_email.clone(),
            to: self.to.clone(),
            cc: self.cc.clone(),
            bcc: self.bcc.clone(),
            reply_to: self.reply_to.clone(),
            extra_headers: self.extra_headers.clone(),
            alternatives: self
                .alternatives
                .iter()
                .map(|(content, mimetype)| Alternative {
                    content: content.clone(),
                    mimetype: mimetype.clone(),
                })
                .chain(
                    self.html_message
                        .iter()
                        .filter(|html| !html.is_empty())
                        .map(|html| Alternative {
                            content: html.clone(),
                            mimetype: "text/html".to_string(),
                        }),
                )
                .collect(),
            attachments: self
                .attachments
                .iter()
                .map(|attachment| Attachment {
                    filename: attachment.filename.clone(),
                    content: STANDARD
                        .decode(&attachment.content)
                        .unwrap_or_else(|_| attachment.content.as_bytes().to_vec()),
                    mimetype: attachment.mimetype.clone(),
                })
                .collect(),
        }
    }

    /// Serialize into the JSON stored alongside the message
    ///
    /// # Errors
    /// Only if a map key fails to serialize, which cannot happen for the
    /// string keys used here.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
