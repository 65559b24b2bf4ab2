use anstyle::{AnsiColor, Color, Style};

pub const HEADER: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Green)))
    .bold();

pub const USAGE: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Green)))
    .bold();

pub const LITERAL: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

pub const SUCCESS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightGreen)));

pub const FAILURE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightRed)));

pub const PATH: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightCyan)));

pub const HINT: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::White)))
    .dimmed();

/// Wraps `text` in the escape codes for `style`.
pub fn paint(style: Style, text: impl std::fmt::Display) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub fn get_clap_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(HEADER)
        .usage(USAGE)
        .literal(LITERAL)
        .placeholder(LITERAL)
}
