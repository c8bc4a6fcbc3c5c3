//! Edit-profile modal drawn over the profile pane.

use circle_core::user::ProfileSubject;
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::{EditForm, FORM_LABELS};

/// Render the modal centred in `area`.
pub fn draw(f: &mut Frame, area: Rect, subject: &ProfileSubject, form: &EditForm) {
  let modal = centered(area, 60, FORM_LABELS.len() as u16 + 6);
  f.render_widget(Clear, modal);

  let block = Block::default()
    .title(format!(" Edit {} ", subject.display_name()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(modal);
  f.render_widget(block, modal);

  let mut lines: Vec<Line> = FORM_LABELS
    .iter()
    .zip(&form.fields)
    .enumerate()
    .map(|(i, (label, value))| {
      let focused = i == form.focus && !form.submitting;
      let value_style = if focused {
        Style::default().bg(Color::Blue).fg(Color::White)
      } else {
        Style::default()
      };
      let cursor = if focused { "_" } else { "" };
      Line::from(vec![
        Span::styled(
          format!("{label:<14}"),
          Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("{value}{cursor}"), value_style),
      ])
    })
    .collect();

  lines.push(Line::from(""));
  if let Some(error) = &form.error {
    lines.push(Line::from(Span::styled(
      error.clone(),
      Style::default().fg(Color::Red),
    )));
  } else if form.submitting {
    lines.push(Line::from(Span::styled(
      "Syncing…",
      Style::default().fg(Color::Yellow),
    )));
  }

  f.render_widget(Paragraph::new(lines), inner);
}

/// A `width`-percent wide, `height`-row tall rect centred in `area`.
fn centered(area: Rect, width_pct: u16, height: u16) -> Rect {
  let width = (u32::from(area.width) * u32::from(width_pct) / 100) as u16;
  let height = height.min(area.height);
  Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + (area.height - height) / 2,
    width,
    height,
  }
}
