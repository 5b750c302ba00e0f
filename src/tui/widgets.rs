//! TUI Widgets - rendering helpers
//!
//! Stateless: take plain data and a theme, produce Ratatui primitives.

use ratatui::text::{Line, Span};

use super::theme::FloodTheme;

/// Line-oriented markdown styling: headings, bullets and rules.
///
/// Full markdown rendering is left to the browser dashboard; this is enough to
/// read the report in a terminal.
pub fn markdown_lines<'a>(content: &'a str, theme: &FloodTheme) -> Vec<Line<'a>> {
    content
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let level = trimmed.chars().take_while(|c| *c == '#').count();
            if level > 0 && trimmed[level..].starts_with(' ') {
                return Line::from(Span::styled(trimmed[level..].trim(), theme.heading(level)));
            }
            if let Some(item) = trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
            {
                return Line::from(vec![
                    Span::styled("  • ", theme.accent()),
                    Span::styled(item, theme.text()),
                ]);
            }
            if trimmed.starts_with("---") {
                return Line::from(Span::styled("─".repeat(40), theme.dimmed()));
            }
            Line::from(Span::styled(line, theme.text()))
        })
        .collect()
}

/// Format duration as HH:MM:SS
pub fn format_duration(secs: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Truncate string with ellipsis, respecting char boundaries
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        s.chars().take(max_chars).collect()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(61), "00:01:01");
        assert_eq!(format_duration(3661), "01:01:01");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("débit élevé", 6), "déb...");
    }

    #[test]
    fn test_markdown_headings_and_bullets() {
        let theme = FloodTheme::new();
        let lines = markdown_lines("# Design\n- pipe A\n#hashtag\nplain", &theme);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].spans[0].content, "Design");
        assert_eq!(lines[0].spans[0].style, theme.heading(1));
        assert_eq!(lines[1].spans[1].content, "pipe A");
        assert_eq!(lines[2].spans[0].content, "#hashtag");
    }
}
