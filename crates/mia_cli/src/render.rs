//! Plain-text rendering of the presentation model.

use mia_core::presentation::{avatar, mood_style, render_bar, stat_bars};
use mia_core::{ChatTurn, Companion, Mood, PersonalityOption, Stats};

const BAR_WIDTH: usize = 20;

pub fn welcome(name: &str) -> String {
    format!("Hi! I'm {}. Talk to me and let's be friends! 💕", name)
}

/// `😊 Momo · happy · Lv.1`
pub fn header(companion: &Companion, mood: &Mood) -> String {
    let look = avatar(mood, &companion.color, &companion.name);
    format!(
        "{} {} · {} · Lv.{}",
        look.style.emoji, look.name, look.label, companion.level
    )
}

pub fn stats_block(stats: &Stats) -> String {
    stat_bars(stats)
        .iter()
        .map(|bar| {
            format!(
                "  {:<12} {} {:>3}",
                bar.label,
                render_bar(bar.value, BAR_WIDTH),
                bar.value
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn turn(turn: &ChatTurn, name: &str) -> String {
    if turn.is_user() {
        format!("You: {}", turn.content)
    } else {
        let emoji = mood_style(turn.emotion.as_ref().unwrap_or(&Mood::Neutral)).emoji;
        format!("{} {}: {}", emoji, name, turn.content)
    }
}

pub fn personality(index: usize, option: &PersonalityOption) -> String {
    format!(
        "  {}) {} {} - {}",
        index + 1,
        option.emoji,
        option.name,
        option.description
    )
}
