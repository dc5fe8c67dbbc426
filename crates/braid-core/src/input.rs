//! Trailing argument extraction.
//!
//! After a trigger hit, the text following the matched token becomes the
//! command's free-text input. The slice rules are deliberately narrow:
//! exactly one leading space is stripped, never more, so inputs that
//! intentionally start with whitespace survive.

use crate::message::IncomingMessage;
use crate::trigger::TriggerHit;

/// Separator used when folding a replied-to message's text into the input.
const REPLY_SEPARATOR: &str = " ";

/// Populates `extra.input` / `extra.input_reply` from a trigger hit.
///
/// `input` is the content following the matched trigger. When the message
/// replies to another textual message, `input_reply` repeats the
/// extraction against `content + " " + reply.content` — so a bare command
/// sent as a reply picks the replied-to text up as its argument. Without
/// a reply, `input_reply` mirrors `input`.
pub fn extract(message: &mut IncomingMessage, hit: &TriggerHit) {
    message.extra.input = slice_after(&hit.compared, hit.end);

    let reply_text = message
        .reply
        .as_ref()
        .and_then(|reply| reply.content.as_deref())
        .filter(|content| !content.is_empty());

    message.extra.input_reply = match reply_text {
        Some(reply) => {
            let combined = format!("{}{}{}", hit.compared, REPLY_SEPARATOR, reply);
            slice_after(&combined, hit.end)
        }
        None => message.extra.input.clone(),
    };
}

fn slice_after(text: &str, end: usize) -> Option<String> {
    let rest = &text[end..];
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    (!rest.is_empty()).then(|| rest.to_string())
}
