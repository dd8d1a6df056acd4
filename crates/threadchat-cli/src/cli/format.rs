//! JSON shapes printed by the CLI.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use threadchat_core::store::{MessageView, ThreadSummary};

/// Human-readable age of a millisecond timestamp relative to `now`
pub fn relative_time(timestamp_ms: u64, now: DateTime<Utc>) -> String {
    let Some(then) = i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
    else {
        return String::new();
    };

    let secs = now.signed_duration_since(then).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s if s < 7 * 86_400 => format!("{}d ago", s / 86_400),
        _ => then.format("%Y-%m-%d").to_string(),
    }
}

pub fn summary_json(summary: &ThreadSummary, now: DateTime<Utc>) -> Value {
    json!({
        "id": summary.id,
        "title": summary.title,
        "preview": summary.preview,
        "lastUpdated": summary.last_updated,
        "updated": summary.last_updated.map(|ts| relative_time(ts, now)),
    })
}

pub fn summaries_json(summaries: &[ThreadSummary], now: DateTime<Utc>) -> Value {
    Value::Array(summaries.iter().map(|s| summary_json(s, now)).collect())
}

pub fn message_json(view: &MessageView) -> Value {
    json!({
        "author": view.author,
        "authorEmail": view.author_email,
        "texts": view.texts,
        "own": view.is_own,
    })
}

pub fn render(value: &Value, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}
