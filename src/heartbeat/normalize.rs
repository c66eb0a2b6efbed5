//! Reply normalization before delivery.

use crate::reply::ReplyPayload;

use super::tokens::strip_heartbeat_token;

/// A reply ready for target resolution and delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedReply {
    /// Nothing should be delivered.
    pub should_skip: bool,
    /// Final text; the caption when attachments are present.
    pub text: String,
    pub has_media: bool,
}

/// Strip the heartbeat token and apply the response prefix.
///
/// A skip signal only skips when there are no attachments; attachments
/// always deliver, with an empty caption if the text was stripped away.
/// The prefix is added once: text already starting with it is left alone,
/// so normalizing normalized text is a no-op.
pub fn normalize_reply(payload: &ReplyPayload, response_prefix: Option<&str>) -> NormalizedReply {
    let stripped = strip_heartbeat_token(payload.text.as_deref());
    let has_media = payload.has_media();

    if stripped.should_skip && !has_media {
        return NormalizedReply {
            should_skip: true,
            text: String::new(),
            has_media,
        };
    }

    let mut text = stripped.text;
    if let Some(prefix) = response_prefix.filter(|p| !p.is_empty()) {
        if !text.is_empty() && !text.starts_with(prefix) {
            text = format!("{} {}", prefix, text);
        }
    }

    NormalizedReply {
        should_skip: false,
        text,
        has_media,
    }
}
