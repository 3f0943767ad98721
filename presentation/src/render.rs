//! Terminal rendering of the transcript and the analytics panel.

use application::SessionView;
use colored::{ColoredString, Colorize};
use domain::{Message, ReliabilityIndicator, Role, Sentiment};

const BAR_CELLS: usize = 20;

pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(80)
        .clamp(40, 120)
}

pub fn rule(width: usize) -> String {
    "─".repeat(width).dimmed().to_string()
}

pub fn render_message(message: &Message) -> String {
    let label = match message.role {
        Role::User => "You".cyan().bold(),
        Role::Assistant => "Analyst".green().bold(),
        // Never stored, but keep the match total.
        Role::System => "System".dimmed(),
    };
    format!("{label}: {}", message.content)
}

pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `[#############-------] 65%`
pub fn readability_bar(percent: f64) -> String {
    let percent = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((percent / 100.0) * BAR_CELLS as f64).round() as usize;
    format!(
        "[{}{}] {:.0}%",
        "#".repeat(filled),
        "-".repeat(BAR_CELLS - filled),
        percent
    )
}

fn sentiment_label(sentiment: Option<Sentiment>) -> ColoredString {
    match sentiment {
        Some(Sentiment::Positive) => "Positive".green(),
        Some(Sentiment::Negative) => "Negative".red(),
        Some(Sentiment::Neutral) => "Neutral".yellow(),
        None => "n/a".dimmed(),
    }
}

fn field(out: &mut Vec<String>, name: &str, value: &str) {
    if !value.trim().is_empty() {
        out.push(format!("{:<12} {}", format!("{name}:").bold(), value));
    }
}

/// The analytics card, or `None` while nothing has been analysed.
pub fn render_analytics(view: &SessionView, width: usize) -> Option<String> {
    let snapshot = view.analytics.as_ref()?;
    let mut lines = vec![rule(width), "Article analysis".bold().underline().to_string()];

    field(&mut lines, "Title", &snapshot.title);
    field(&mut lines, "Author", &snapshot.author);
    field(&mut lines, "Language", &snapshot.language);
    let url = snapshot.url.as_deref().or(view.current_url.as_deref());
    field(&mut lines, "URL", url.unwrap_or_default());
    field(&mut lines, "Tone", &snapshot.tone);
    field(&mut lines, "Style", &snapshot.style);
    lines.push(format!(
        "{:<12} {}",
        "Sentiment:".bold(),
        sentiment_label(snapshot.sentiment)
    ));

    let verdict = view.reliability.as_str();
    let reliability = match view.reliability_indicator() {
        ReliabilityIndicator::Reliable => format!("✔ Likely reliable ({verdict})").green(),
        ReliabilityIndicator::Unreliable => format!("✘ Possibly unreliable ({verdict})").red(),
    };
    lines.push(format!("{:<12} {}", "Reliability:".bold(), reliability));

    if let Some(percent) = view.readability_percent {
        lines.push(format!("{:<12} {}", "Readability:".bold(), readability_bar(percent)));
    }
    if !snapshot.keywords.is_empty() {
        field(&mut lines, "Keywords", &snapshot.keywords.join(", "));
    }
    if !snapshot.summary.trim().is_empty() {
        lines.push(String::new());
        lines.push("Summary".bold().to_string());
        lines.push(snapshot.summary.trim().to_string());
    }
    lines.push(rule(width));
    Some(lines.join("\n"))
}
