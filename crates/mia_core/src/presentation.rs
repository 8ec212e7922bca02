//! Visual state derived from the session: avatar look and stat bars.
//!
//! All functions are total. Moods the client does not know are drawn with the
//! neutral look, since the backend owns the mood vocabulary.

use crate::model::{Mood, Stats, STAT_MAX};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Animation {
    Bounce,
    Pulse,
    FadeIn,
    Shake,
}

/// One row of the mood look-up table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoodStyle {
    pub emoji: &'static str,
    pub gradient: [&'static str; 2],
    pub animation: Animation,
}

const HAPPY: MoodStyle = MoodStyle {
    emoji: "😊",
    gradient: ["#FFD700", "#FFA500"],
    animation: Animation::Bounce,
};
const CONTENT: MoodStyle = MoodStyle {
    emoji: "😌",
    gradient: ["#87CEEB", "#4682B4"],
    animation: Animation::Pulse,
};
const NEUTRAL: MoodStyle = MoodStyle {
    emoji: "😐",
    gradient: ["#D3D3D3", "#A9A9A9"],
    animation: Animation::FadeIn,
};
const SAD: MoodStyle = MoodStyle {
    emoji: "😢",
    gradient: ["#4682B4", "#1E3A8A"],
    animation: Animation::FadeIn,
};
const VERY_SAD: MoodStyle = MoodStyle {
    emoji: "😭",
    gradient: ["#1E3A8A", "#0F172A"],
    animation: Animation::Shake,
};

pub fn mood_style(mood: &Mood) -> MoodStyle {
    match mood {
        Mood::Happy => HAPPY,
        Mood::Content => CONTENT,
        Mood::Neutral => NEUTRAL,
        Mood::Sad => SAD,
        Mood::VerySad => VERY_SAD,
        Mood::Other(label) => {
            tracing::debug!("Unknown mood '{}', drawing neutral avatar", label);
            NEUTRAL
        }
    }
}

/// Everything needed to draw the companion's avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Avatar {
    pub name: String,
    pub color: String,
    pub style: MoodStyle,
    /// Mood shown under the name, underscores replaced by spaces.
    pub label: String,
}

pub fn avatar(mood: &Mood, color: &str, name: &str) -> Avatar {
    Avatar {
        name: name.to_string(),
        color: color.to_string(),
        style: mood_style(mood),
        label: mood.label().replace('_', " "),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatBar {
    pub label: &'static str,
    pub value: u8,
    pub color: &'static str,
}

/// Hunger is stored as a hunger level but shown as fullness.
pub fn fullness(hunger: u8) -> u8 {
    STAT_MAX - hunger.min(STAT_MAX)
}

pub fn stat_bars(stats: &Stats) -> [StatBar; 3] {
    [
        StatBar {
            label: "💖 Affection",
            value: stats.affection.min(STAT_MAX),
            color: "#FF69B4",
        },
        StatBar {
            label: "🍔 Hunger",
            value: fullness(stats.hunger),
            color: "#FFA500",
        },
        StatBar {
            label: "⚡ Energy",
            value: stats.energy.min(STAT_MAX),
            color: "#4169E1",
        },
    ]
}

/// Text gauge such as `[██████░░░░]`, `width` cells wide.
pub fn render_bar(value: u8, width: usize) -> String {
    let filled = (value.min(STAT_MAX) as usize * width + (STAT_MAX as usize / 2)) / STAT_MAX as usize;
    let mut bar = String::with_capacity(width * 3 + 2);
    bar.push('[');
    bar.extend(std::iter::repeat('█').take(filled));
    bar.extend(std::iter::repeat('░').take(width - filled));
    bar.push(']');
    bar
}
