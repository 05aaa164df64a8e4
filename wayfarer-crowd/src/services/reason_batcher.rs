//! Batched reason text generation
//!
//! One model call produces the justification text for every day of the
//! week. The reply is line-oriented and untrusted, so the parser always
//! yields exactly one string per requested day.

use crate::services::{bounded, DayDraft};
use crate::types::{format_hour, GenerativeModel, DEFAULT_REASON_TEXT};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Longest reason text kept from the model, in characters
pub const MAX_REASON_CHARS: usize = 240;

pub struct ReasonTextBatcher {
    model: Arc<dyn GenerativeModel>,
    timeout: Duration,
    morning_threshold_hour: u8,
}

impl ReasonTextBatcher {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        timeout: Duration,
        morning_threshold_hour: u8,
    ) -> Self {
        Self {
            model,
            timeout,
            morning_threshold_hour,
        }
    }

    /// Reason texts for `days`, in order; always `days.len()` entries
    pub async fn reasons(&self, venue_name: &str, days: &[DayDraft]) -> Vec<String> {
        if days.is_empty() {
            return Vec::new();
        }

        let prompt = build_prompt(venue_name, days);
        match bounded(self.timeout, "reason batch", self.model.generate_text(&prompt)).await {
            Ok(Some(reply)) if !reply.trim().is_empty() => {
                let reasons = parse_reasons(&reply, days.len());
                info!(venue = %venue_name, days = days.len(), "Generated batched reason texts");
                reasons
            }
            Ok(_) => {
                warn!(venue = %venue_name, "Model returned no reason texts, using deterministic text");
                self.deterministic(days)
            }
            Err(e) => {
                error!(venue = %venue_name, error = %e, "Batched reason generation failed");
                self.deterministic(days)
            }
        }
    }

    fn deterministic(&self, days: &[DayDraft]) -> Vec<String> {
        days.iter()
            .map(|day| {
                deterministic_reason(&day.quiet_hours, &day.busy_hours, self.morning_threshold_hour)
                    .to_string()
            })
            .collect()
    }
}

/// Reason text derived from provider hints alone
pub fn deterministic_reason(
    quiet_hours: &[u8],
    busy_hours: &[u8],
    morning_threshold_hour: u8,
) -> &'static str {
    if let Some(&first_quiet) = quiet_hours.first() {
        if first_quiet < morning_threshold_hour {
            "Fewer crowds during morning hours make for a more pleasant visit"
        } else {
            "Fewer crowds during evening hours make for a more pleasant visit"
        }
    } else if !busy_hours.is_empty() {
        "Visit outside peak hours for a better experience"
    } else {
        "Visit during off-peak hours for the best experience"
    }
}

/// Split a line-oriented reply into exactly `expected` reason texts
///
/// Blank lines are skipped and list markers removed; missing entries are
/// padded with [`DEFAULT_REASON_TEXT`], extra lines dropped.
pub fn parse_reasons(reply: &str, expected: usize) -> Vec<String> {
    let mut reasons: Vec<String> = reply
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(expected)
        .map(|line| line.chars().take(MAX_REASON_CHARS).collect())
        .collect();
    reasons.resize(expected, DEFAULT_REASON_TEXT.to_string());
    reasons
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(&['-', '*', '•'][..]) {
        return rest.trim_start();
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(&['.', ')'][..]) {
            return rest.trim_start();
        }
    }
    line
}

fn build_prompt(venue_name: &str, days: &[DayDraft]) -> String {
    let mut prompt = format!(
        "Generate specific reason texts for visiting {venue_name} at different times on different days.\n\
         For each day, provide 1-2 sentences explaining why the recommended time window is best for avoiding crowds.\n\
         \n\
         Days and their recommended visit times:\n"
    );

    for (i, day) in days.iter().enumerate() {
        let hours = match (day.open_hour, day.close_hour) {
            (Some(open), Some(close)) if day.is_open => {
                format!("{}-{}", format_hour(open), format_hour(close))
            }
            _ => "Closed".to_string(),
        };
        let quiet = if day.quiet_hours.is_empty() {
            String::new()
        } else {
            format!(", quiet hours: {:?}", day.quiet_hours)
        };
        prompt.push_str(&format!(
            "{}. {} - Best time: {} (Open {}, crowd level {}/100{})\n",
            i + 1,
            day.day_label,
            day.best_window,
            hours,
            day.aggregate_crowd_level,
            quiet
        ));
    }

    prompt.push_str(
        "\nIMPORTANT: Return ONLY the reason texts, one per line, in the same order as the days listed above.\n\
         Each reason should be 1-2 sentences explaining why that time window is best.\n\
         Do NOT include day names, times, or any other information - ONLY the reason text.\n\
         Example format:\n\
         Arrive early to beat the crowds and enjoy the exhibits at your own pace.\n\
         Mid-morning offers a good balance between fewer crowds and full facility availability.",
    );
    prompt
}
