//! Message bodies and inline keyboards (Telegram HTML parse mode).

use super::{CallbackPayload, ChatTasks};

const OPEN_HEADER: &str = "🟢 To do";
const DONE_HEADER: &str = "✅ Completed";
const NONE_LINE: &str = "— none —";
const EMPTY_LIST: &str = "No tasks yet.";

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Body of a task message.
pub fn render_text(title: &str, done: bool, by: Option<&str>, ts: Option<&str>) -> String {
    let title = escape_html(title);
    if done {
        let meta = format!(
            "✅ Completed — {} · {}",
            escape_html(ts.unwrap_or_default()),
            escape_html(by.unwrap_or_default())
        );
        format!("<b>{}</b>\n<code>{}</code>\n<i>{}</i>", DONE_HEADER, title, meta)
    } else {
        format!("<b>{}</b>\n<code>{}</code>", OPEN_HEADER, title)
    }
}

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: CallbackPayload,
    /// Disabled buttons carry the `noop` payload and do nothing when pressed.
    pub enabled: bool,
}

/// Inline controls attached to a task message (a single row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    pub buttons: Vec<Button>,
}

impl Controls {
    /// The actionable button, if any.
    pub fn action(&self) -> Option<&Button> {
        self.buttons.iter().find(|b| b.enabled)
    }

    /// Telegram `InlineKeyboardMarkup` JSON.
    pub fn to_reply_markup(&self) -> serde_json::Value {
        let row = self
            .buttons
            .iter()
            .map(|b| {
                serde_json::json!({
                    "text": b.label,
                    "callback_data": b.payload.encode(),
                })
            })
            .collect::<Vec<_>>();
        serde_json::json!({ "inline_keyboard": [row] })
    }
}

/// Controls for a task: "done" while open, a disabled undo afterwards.
pub fn render_controls(done: bool, chat_id: i64, message_id: i64) -> Controls {
    let button = if done {
        Button {
            label: "↩️ Undo (soon)".to_string(),
            payload: CallbackPayload::Noop,
            enabled: false,
        }
    } else {
        Button {
            label: "✅ Done".to_string(),
            payload: CallbackPayload::MarkDone {
                chat_id,
                message_id,
            },
            enabled: true,
        }
    };
    Controls {
        buttons: vec![button],
    }
}

/// Telegram rejects messages longer than this (UTF-16 code units).
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Room kept for headers and "more" lines while filling a list reply.
const LIST_RESERVE: usize = 160;

fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Reply to the list command.
///
/// Item lines are added until the reply would reach [`MAX_MESSAGE_LEN`];
/// each section then ends with a `… N more` line for what was left out.
pub fn render_list(tasks: &ChatTasks) -> String {
    if tasks.is_empty() {
        return EMPTY_LIST.to_string();
    }

    let open_items: Vec<String> = tasks
        .open
        .iter()
        .map(|record| format!("• {}", escape_html(&record.title)))
        .collect();
    let done_items: Vec<String> = tasks
        .done
        .iter()
        .map(|record| {
            let meta = completion_meta(record.by.as_deref(), record.ts.as_deref());
            if meta.is_empty() {
                format!("• {}", escape_html(&record.title))
            } else {
                format!("• {}  ({})", escape_html(&record.title), escape_html(&meta))
            }
        })
        .collect();

    let mut budget = MAX_MESSAGE_LEN - LIST_RESERVE;
    let mut lines = vec![format!("<b>{}</b>", OPEN_HEADER)];
    push_section(&mut lines, open_items, &mut budget);
    lines.push(String::new());
    lines.push(format!("<b>{}</b>", DONE_HEADER));
    push_section(&mut lines, done_items, &mut budget);

    lines.join("\n")
}

fn push_section(lines: &mut Vec<String>, items: Vec<String>, budget: &mut usize) {
    if items.is_empty() {
        lines.push(NONE_LINE.to_string());
        return;
    }
    let total = items.len();
    let mut shown = 0;
    for item in items {
        // +1 for the joining newline
        let cost = message_len(&item) + 1;
        if cost > *budget {
            break;
        }
        *budget -= cost;
        lines.push(item);
        shown += 1;
    }
    if shown < total {
        lines.push(format!("… {} more", total - shown));
        // Later sections only get their "more" line once one has overflowed.
        *budget = 0;
    }
}

fn completion_meta(by: Option<&str>, ts: Option<&str>) -> String {
    match (by.filter(|s| !s.is_empty()), ts.filter(|s| !s.is_empty())) {
        (Some(by), Some(ts)) => format!("{} — {}", by, ts),
        (Some(by), None) => by.to_string(),
        (None, Some(ts)) => ts.to_string(),
        (None, None) => String::new(),
    }
}

/// Reply to the clear command.
pub fn render_cleared(count: usize) -> String {
    match count {
        0 => "Nothing to clear: no completed tasks.".to_string(),
        1 => "✅ 1 completed task cleared.".to_string(),
        n => format!("✅ {} completed tasks cleared.", n),
    }
}
