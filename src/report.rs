//! Monthly aggregation over a collection of entries. Pure: same entries and
//! (year, month) always produce the same report, no wall-clock access.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::entry::{Emotion, GratitudeEntry};

pub const TOP_EMOTION_COUNT: usize = 3;

const NO_ENTRIES_SUMMARY: &str = "No entries were recorded this month.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub total_entries: u32,
    /// Every emotion is present, zero-defaulted.
    pub emotion_counts: BTreeMap<Emotion, u32>,
    /// Descending by count, ties broken by the emotion declaration order,
    /// truncated to [`TOP_EMOTION_COUNT`].
    pub top_emotions: Vec<Emotion>,
    /// Percentage of entries with a positive emotion, rounded to the
    /// nearest integer; 0 for an empty month.
    pub positive_rate: u32,
    pub summary: String,
}

/// First and last day of a calendar month, or `None` for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_month.pred_opt()?))
}

pub fn monthly(entries: &[GratitudeEntry], year: i32, month: u32) -> MonthlyReport {
    let in_month: Vec<&GratitudeEntry> = match month_bounds(year, month) {
        Some((first, last)) => entries
            .iter()
            .filter(|e| e.entry_date >= first && e.entry_date <= last)
            .collect(),
        None => Vec::new(),
    };

    let mut emotion_counts: BTreeMap<Emotion, u32> =
        Emotion::ALL.iter().map(|&e| (e, 0)).collect();
    for entry in &in_month {
        // Every recognized emotion is pre-seeded; the closed enum makes an
        // unrecognized tag unrepresentable past the deserialization boundary.
        *emotion_counts.get_mut(&entry.emotion).unwrap() += 1;
    }

    let total_entries = in_month.len() as u32;
    let positive_count: u32 = Emotion::POSITIVE
        .iter()
        .map(|e| emotion_counts[e])
        .sum();
    let positive_rate = if total_entries > 0 {
        (100.0 * f64::from(positive_count) / f64::from(total_entries)).round() as u32
    } else {
        0
    };

    // Stable sort keeps declaration order for equal counts.
    let mut top_emotions = Emotion::ALL.to_vec();
    top_emotions.sort_by(|a, b| emotion_counts[b].cmp(&emotion_counts[a]));
    top_emotions.truncate(TOP_EMOTION_COUNT);

    let summary = if total_entries == 0 {
        NO_ENTRIES_SUMMARY.to_string()
    } else {
        format!(
            "You wrote {} gratitude {} this month, and {}% of them carried a positive mood.",
            total_entries,
            if total_entries == 1 { "entry" } else { "entries" },
            positive_rate,
        )
    };

    MonthlyReport {
        year,
        month,
        total_entries,
        emotion_counts,
        top_emotions,
        positive_rate,
        summary,
    }
}
