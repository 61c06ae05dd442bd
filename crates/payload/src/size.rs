//! Byte-size estimation for messages.
//!
//! Text is measured in UTF-8 bytes, attachments by the length of their
//! base64 string. The formatted estimate multiplies the raw figure by an
//! inflation factor to cover JSON wrapping; it is an upper bound only.

use bt_domain::message::{Attachment, Message};

/// Raw size: UTF-8 text bytes plus base64 payload lengths.
pub fn estimate(message: &Message) -> usize {
    message.text().len()
        + message
            .attachments
            .iter()
            .map(Attachment::payload_len)
            .sum::<usize>()
}

/// Estimated size of the message once wrapped in its wire form.
pub fn estimate_formatted(message: &Message, inflation_factor: f64) -> usize {
    inflate(estimate(message), inflation_factor)
}

pub fn inflate(raw: usize, inflation_factor: f64) -> usize {
    (raw as f64 * inflation_factor).ceil() as usize
}
