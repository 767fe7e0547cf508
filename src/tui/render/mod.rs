pub mod status_row;
pub mod tree_view;

#[cfg(test)]
pub(crate) mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::Block;

use super::app::App;

/// Main render function: tree above, one-line footer below
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // tree
            Constraint::Length(1), // footer
        ])
        .split(area);

    tree_view::render_tree_view(frame, app, chunks[0]);
    status_row::render_status_row(frame, app, chunks[1]);
}
