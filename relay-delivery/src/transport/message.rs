//! Rendering an [`OutgoingEmail`] as a lettre message.
//!
//! Layout of the body:
//! - body only: a single `text/plain` part
//! - with alternatives: `multipart/alternative` of the plain body and each
//!   alternative, in order
//! - with attachments: the above wrapped in `multipart/mixed`, followed by one
//!   part per attachment

use lettre::{
    Message,
    message::{
        Attachment, Mailbox, MultiPart, SinglePart,
        header::{ContentType, HeaderName, HeaderValue},
    },
};
use relay_common::OutgoingEmail;

use crate::{DeliveryError, error::PermanentError};

const FALLBACK_MIMETYPE: &str = "application/octet-stream";

fn content_type(mimetype: &str) -> Result<ContentType, DeliveryError> {
    ContentType::parse(mimetype)
        .or_else(|_| ContentType::parse(FALLBACK_MIMETYPE))
        .map_err(|err| PermanentError::InvalidMessage(err.to_string()).into())
}

fn mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse()
        .map_err(|err| PermanentError::InvalidAddress(format!("{address}: {err}")).into())
}

enum Body {
    Single(SinglePart),
    Multi(MultiPart),
}

fn body(email: &OutgoingEmail) -> Result<Body, DeliveryError> {
    let plain = SinglePart::plain(email.body.clone());

    if email.alternatives.is_empty() {
        return Ok(Body::Single(plain));
    }

    let mut alternative = MultiPart::alternative().singlepart(plain);
    for part in &email.alternatives {
        alternative = alternative.singlepart(
            SinglePart::builder()
                .header(content_type(&part.mimetype)?)
                .body(part.content.clone()),
        );
    }

    Ok(Body::Multi(alternative))
}

/// Build the message for `email`, sending from `default_from` when the email
/// has no sender of its own
///
/// # Errors
/// A permanent error when an address does not parse, there is no sender at
/// all, or a header is malformed
pub fn build(email: &OutgoingEmail, default_from: Option<&str>) -> Result<Message, DeliveryError> {
    let from = Some(email.from_email.as_str())
        .filter(|from| !from.is_empty())
        .or(default_from)
        .ok_or_else(|| PermanentError::InvalidMessage("no sender address".to_string()))?;

    let mut builder = Message::builder()
        .from(mailbox(from)?)
        .subject(email.subject.clone());

    for to in &email.to {
        builder = builder.to(mailbox(to)?);
    }
    for cc in &email.cc {
        builder = builder.cc(mailbox(cc)?);
    }
    for bcc in &email.bcc {
        builder = builder.bcc(mailbox(bcc)?);
    }
    for reply_to in &email.reply_to {
        builder = builder.reply_to(mailbox(reply_to)?);
    }

    for (name, value) in &email.extra_headers {
        let name = HeaderName::new_from_ascii(name.clone()).map_err(|_| {
            PermanentError::InvalidMessage(format!("invalid header name {name:?}"))
        })?;
        builder = builder.raw_header(HeaderValue::new(name, value.clone()));
    }

    let message = match (body(email)?, email.attachments.is_empty()) {
        (Body::Single(part), true) => builder.singlepart(part)?,
        (Body::Multi(part), true) => builder.multipart(part)?,
        (body, false) => {
            let mut mixed = match body {
                Body::Single(part) => MultiPart::mixed().singlepart(part),
                Body::Multi(part) => MultiPart::mixed().multipart(part),
            };

            for attachment in &email.attachments {
                mixed = mixed.singlepart(
                    Attachment::new(attachment.filename.clone())
                        .body(attachment.content.clone(), content_type(&attachment.mimetype)?),
                );
            }

            builder.multipart(mixed)?
        }
    };

    Ok(message)
}
