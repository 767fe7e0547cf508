use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::App;
use crate::util::unicode::truncate_to_width;

const KEY_HINTS: &str = concat!(
    "\u{2191}\u{2193} move  \u{21E7}\u{2191}\u{2193} dirs  \u{23CE} toggle  ",
    "o view  e edit  c/C copy  z zoom  q quit"
);

/// Render the footer: the latest notice, else the key hints
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;

    let line = match &app.status {
        Some(status) => {
            let fg = if status.is_error {
                app.theme.red
            } else {
                app.theme.green
            };
            Line::from(Span::styled(
                truncate_to_width(&format!(" {}", status.text), width),
                Style::default().fg(fg).bg(bg),
            ))
        }
        None if app.show_key_hints => Line::from(Span::styled(
            truncate_to_width(&format!(" {}", KEY_HINTS), width),
            Style::default().fg(app.theme.dim).bg(bg),
        )),
        None => Line::from(Span::styled(" ".repeat(width), Style::default().bg(bg))),
    };

    let paragraph = Paragraph::new(line).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::*;

    #[test]
    fn shows_key_hints_by_default() {
        let fx = Fixture::new(&[], &["a.txt"]);
        let app = fx.app();
        let output = render_to_string(100, 1, |frame, area| render_status_row(frame, &app, area));
        assert!(output.starts_with(" \u{2191}\u{2193} move"));
        assert!(output.ends_with("q quit"));
    }

    #[test]
    fn notice_replaces_hints() {
        let fx = Fixture::new(&[], &["a.txt"]);
        let mut app = fx.app();
        app.notify("Copied: a.txt");
        let output = render_to_string(40, 1, |frame, area| render_status_row(frame, &app, area));
        assert_eq!(output, " Copied: a.txt");
    }

    #[test]
    fn hints_can_be_hidden() {
        let fx = Fixture::new(&[], &["a.txt"]);
        let mut app = fx.app();
        app.show_key_hints = false;
        let output = render_to_string(40, 1, |frame, area| render_status_row(frame, &app, area));
        assert_eq!(output, "");
    }
}
