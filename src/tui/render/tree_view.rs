use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::Node;
use crate::ops::navigation::{FlatRow, flatten};
use crate::tui::app::App;
use crate::util::unicode::{display_width, truncate_to_width};

/// Render the visible rows of the tree, keeping the cursor on screen
pub fn render_tree_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let visible_height = area.height as usize;
    if visible_height == 0 {
        return;
    }
    app.page_height = visible_height;

    let rows = flatten(&app.tree);
    let cursor = app.tree.cursor();
    let cursor_pos = rows.iter().position(|r| r.id == cursor).unwrap_or(0);

    if cursor_pos < app.scroll_offset {
        app.scroll_offset = cursor_pos;
    } else if cursor_pos >= app.scroll_offset + visible_height {
        app.scroll_offset = cursor_pos + 1 - visible_height;
    }
    // Don't leave blank rows at the bottom after a collapse
    app.scroll_offset = app
        .scroll_offset
        .min(rows.len().saturating_sub(visible_height));

    let scroll = app.scroll_offset;
    let end = rows.len().min(scroll + visible_height);
    let width = area.width as usize;
    let lines: Vec<Line> = rows[scroll..end]
        .iter()
        .filter_map(|row| {
            let node = app.tree.get(row.id)?;
            Some(render_row(app, row, node, row.id == cursor, width))
        })
        .collect();

    let paragraph = Paragraph::new(lines).style(Style::default().bg(app.theme.background));
    frame.render_widget(paragraph, area);
}

fn render_row<'a>(
    app: &App,
    row: &FlatRow,
    node: &Node,
    is_cursor: bool,
    width: usize,
) -> Line<'a> {
    let theme = &app.theme;
    let row_bg = if is_cursor {
        theme.selection_bg
    } else {
        theme.background
    };
    let guide_style = Style::default().fg(theme.dim).bg(row_bg);
    let mut spans: Vec<Span> = Vec::new();

    // Column 0: cursor bar
    if is_cursor {
        spans.push(Span::styled(
            "\u{258E}",
            Style::default().fg(theme.selection_border).bg(row_bg),
        ));
    } else {
        spans.push(Span::styled(" ", Style::default().bg(row_bg)));
    }

    let mut prefix = String::new();
    for &ancestor_last in &row.ancestor_last {
        prefix.push_str(if ancestor_last { "   " } else { "\u{2502}  " }); // │
    }
    if row.depth > 0 {
        prefix.push_str(if row.is_last_sibling {
            "\u{2514}\u{2500} " // └─
        } else {
            "\u{251C}\u{2500} " // ├─
        });
    }
    if node.is_dir() {
        prefix.push_str(if node.expanded { "\u{25BE} " } else { "\u{25B8} " }); // ▾ / ▸
    } else {
        prefix.push_str("  ");
    }
    let used = 1 + display_width(&prefix);
    spans.push(Span::styled(prefix, guide_style));

    let fg = if node.ignored.is_ignored() {
        theme.ignored
    } else if node.is_dir() {
        theme.directory
    } else if is_cursor {
        theme.text_bright
    } else {
        theme.text
    };
    let mut name_style = Style::default().fg(fg).bg(row_bg);
    if node.is_dir() || is_cursor {
        name_style = name_style.add_modifier(Modifier::BOLD);
    }
    let name = truncate_to_width(&node.name, width.saturating_sub(used));
    let name_width = display_width(&name);
    spans.push(Span::styled(name, name_style));

    // Fill the rest so the cursor highlight spans the row
    let rest = width.saturating_sub(used + name_width);
    if rest > 0 {
        spans.push(Span::styled(" ".repeat(rest), Style::default().bg(row_bg)));
    }
    Line::from(spans)
}
