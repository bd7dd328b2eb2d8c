use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::i18n::Translator;
use crate::models::BookingSubmission;

/// Asia/Bishkek: UTC+06:00 all year round.
pub const REGION_UTC_OFFSET_SECONDS: i32 = 6 * 3600;
pub const REGION_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

pub fn regional_offset() -> FixedOffset {
    FixedOffset::east_opt(REGION_UTC_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

pub fn regional_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&regional_offset())
        .format(REGION_TIMESTAMP_FORMAT)
        .to_string()
}

/// Escapes the characters Telegram's legacy Markdown treats as entity markers.
pub fn escape_markdown(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Builds the operator-facing Markdown text for a booking.
pub fn compose_operator_message(submission: &BookingSubmission, translator: &dyn Translator) -> String {
    let draft = &submission.draft;
    let label = |key: &str| translator.text(&format!("notification.{key}"));
    let notes = match draft.notes() {
        Some(notes) => escape_markdown(notes),
        None => label("notes_none"),
    };
    let vehicle = format!(
        "{} ({})",
        translator.text(&draft.vehicle_category.title_key()),
        draft.vehicle_category.as_code()
    );

    let lines = [
        format!("🚗 *{}*", label("title")),
        String::new(),
        format!("🔖 *{}:* {}", label("reference"), submission.short_reference()),
        format!("👤 *{}:* {}", label("client"), escape_markdown(&draft.full_name)),
        format!("📞 *{}:* {}", label("phone"), escape_markdown(&draft.phone)),
        String::new(),
        format!(
            "🛣️ *{}:* {} → {}",
            label("route"),
            escape_markdown(&draft.from),
            escape_markdown(&draft.to)
        ),
        format!("📅 *{}:* {}", label("date"), escape_markdown(&draft.date)),
        format!("⏰ *{}:* {}", label("time"), escape_markdown(&draft.time)),
        format!("👥 *{}:* {}", label("passengers"), draft.passenger_count),
        format!("🚙 *{}:* {}", label("vehicle"), escape_markdown(&vehicle)),
        String::new(),
        format!("📝 *{}:* {}", label("notes"), notes),
        String::new(),
        format!(
            "⏱️ *{}:* {}",
            label("submitted_at"),
            regional_timestamp(submission.submitted_at)
        ),
    ];

    lines.join("\n")
}
