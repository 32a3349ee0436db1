//! Terminal styling for CLI output

use colored::{Color, Colorize};

pub fn icon_success() -> String {
    "✓".green().to_string()
}

pub fn icon_error() -> String {
    "✗".red().to_string()
}

pub fn icon_warning() -> String {
    "⚠".yellow().to_string()
}

pub fn icon_info() -> String {
    "ℹ".blue().to_string()
}

pub fn print_success(msg: &str) {
    println!("{} {}", icon_success(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", icon_error(), msg.red());
}

pub fn print_warning(msg: &str) {
    println!("{} {}", icon_warning(), msg.yellow());
}

pub fn print_info(msg: &str) {
    println!("{} {}", icon_info(), msg);
}

pub fn print_header(title: &str) {
    println!();
    println!(
        "{}",
        format!("{} {}", title, "─".repeat(50usize.saturating_sub(title.len())))
            .cyan()
            .bold()
    );
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!("  {} {}", format!("{}:", key).bright_black(), value);
}

pub fn print_key_value_colored(key: &str, value: &str, color: Color) {
    println!(
        "  {} {}",
        format!("{}:", key).bright_black(),
        value.color(color)
    );
}

/// Green for strong scores, yellow for middling, red below.
pub fn score_color(score: f64) -> Color {
    if score >= 0.9 {
        Color::Green
    } else if score >= 0.7 {
        Color::Yellow
    } else {
        Color::Red
    }
}

pub fn status_color(status: &str) -> Color {
    match status {
        "COMPLETED" => Color::Green,
        "EVALUATING" => Color::Cyan,
        "QUEUED" => Color::Yellow,
        "FAILED" => Color::Red,
        _ => Color::White,
    }
}

pub fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}
