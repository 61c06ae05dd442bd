use bt_domain::message::Message;

/// Copy of `message` with every attachment removed; text untouched.
pub fn strip_attachments(message: &Message) -> Message {
    Message {
        role: message.role,
        text: message.text.clone(),
        attachments: Vec::new(),
    }
}

/// Copy of `message` whose text keeps only its trailing `keep_last_chars`
/// characters. Attachments are carried over unchanged.
pub fn truncate_text(message: &Message, keep_last_chars: usize) -> Message {
    Message {
        role: message.role,
        text: message
            .text
            .as_deref()
            .map(|t| tail_chars(t, keep_last_chars).to_string()),
        attachments: message.attachments.clone(),
    }
}

/// The last `n` characters of `text` (on a char boundary).
pub fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_domain::message::Attachment;

    #[test]
    fn strip_keeps_text_and_role() {
        let msg = Message::model("answer").with_attachment(Attachment::new("image/png", "QUJD"));
        let stripped = strip_attachments(&msg);
        assert_eq!(stripped.role, msg.role);
        assert_eq!(stripped.text(), "answer");
        assert!(stripped.attachments.is_empty());
        // Original untouched.
        assert_eq!(msg.attachments.len(), 1);
    }

    #[test]
    fn truncate_keeps_tail() {
        let msg = Message::user("abcdefghij");
        assert_eq!(truncate_text(&msg, 3).text(), "hij");
        assert_eq!(truncate_text(&msg, 100).text(), "abcdefghij");
        assert_eq!(truncate_text(&msg, 0).text(), "");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let msg = Message::user("前后左右");
        assert_eq!(truncate_text(&msg, 2).text(), "左右");
    }

    #[test]
    fn truncate_without_text_stays_empty() {
        let msg = Message {
            role: bt_domain::message::Role::User,
            text: None,
            attachments: vec![],
        };
        assert!(truncate_text(&msg, 10).text.is_none());
    }
}
