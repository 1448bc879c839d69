//! Status glyph styling for the text reporter: fg-color plus `anstyle::Style`
//! per outcome, narrowed to the palette the reporter actually needs
//! (color-coded status glyphs that degrade gracefully when not a TTY).

use anstyle::{AnsiColor, Color, Style};
use colorchoice::ColorChoice;

/// Case/step outcome a glyph can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
    Warn,
}

fn color_for(outcome: Outcome) -> Color {
    match outcome {
        Outcome::Passed => Color::Ansi(AnsiColor::Green),
        Outcome::Failed => Color::Ansi(AnsiColor::Red),
        Outcome::Skipped => Color::Ansi(AnsiColor::BrightBlack),
        Outcome::Warn => Color::Ansi(AnsiColor::Yellow),
    }
}

fn glyph_for(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Passed => "✓",
        Outcome::Failed => "✗",
        Outcome::Skipped => "○",
        Outcome::Warn => "⚠",
    }
}

/// Render a status glyph, honoring the process-wide color choice (so output
/// piped to a file or CI log stays plain per `colorchoice`'s usual contract).
pub fn styled_glyph(outcome: Outcome) -> String {
    if matches!(ColorChoice::global(), ColorChoice::Never) {
        return glyph_for(outcome).to_string();
    }

    let style = Style::new().fg_color(Some(color_for(outcome)));
    format!("{style}{}{style:#}", glyph_for(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyphs_are_distinct() {
        let glyphs: Vec<&str> = [Outcome::Passed, Outcome::Failed, Outcome::Skipped, Outcome::Warn]
            .into_iter()
            .map(glyph_for)
            .collect();
        let unique: std::collections::HashSet<_> = glyphs.iter().collect();
        assert_eq!(unique.len(), glyphs.len());
    }
}
