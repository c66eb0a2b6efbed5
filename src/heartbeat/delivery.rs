//! Ordered outbound delivery.

use tracing::debug;

use crate::channels::{chunk_text, MessageSender, SendOptions, TEXT_CHUNK_LIMIT};
use crate::error::Result;

/// One call to [`MessageSender::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSend {
    pub text: String,
    pub media_url: Option<String>,
}

/// Expand a normalized reply into the exact sequence of sends.
///
/// Without attachments the text is split into channel-sized chunks. With
/// attachments there is one send per URL and the text is the caption of
/// the first one only.
pub fn plan_delivery(text: &str, media_urls: &[String]) -> Vec<OutboundSend> {
    if media_urls.is_empty() {
        return chunk_text(text, TEXT_CHUNK_LIMIT)
            .into_iter()
            .map(|chunk| OutboundSend {
                text: chunk.to_string(),
                media_url: None,
            })
            .collect();
    }

    media_urls
        .iter()
        .enumerate()
        .map(|(i, url)| OutboundSend {
            text: if i == 0 { text.to_string() } else { String::new() },
            media_url: Some(url.clone()),
        })
        .collect()
}

/// Execute `plan` against `sender`, one send at a time.
///
/// Each send is awaited before the next starts. The first error aborts the
/// remaining sends and is returned. Returns the number of sends made.
pub async fn dispatch(
    sender: &dyn MessageSender,
    to: &str,
    plan: Vec<OutboundSend>,
) -> Result<usize> {
    let total = plan.len();
    for (i, step) in plan.into_iter().enumerate() {
        let options = match step.media_url {
            Some(url) => SendOptions::with_media(url),
            None => SendOptions::default(),
        };
        debug!(to = to, step = i + 1, total = total, "Sending heartbeat part");
        sender.send(to, &step.text, options).await?;
    }
    Ok(total)
}
