//! TUI rendering — orchestrates all panes.

pub mod edit_form;
pub mod profile;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::app::{App, Mode, Remote};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw<R: Remote>(f: &mut Frame, app: &App<R>) {
  let area = f.area();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);

  // Nothing is drawn for a profile that hasn't loaded.
  let view = app.view();
  if let Some(view) = &view {
    profile::draw(f, rows[1], view, &app.base_url);
  }

  draw_status(f, rows[2], app);

  if let (Some(view), Some(form)) = (&view, &app.form) {
    edit_form::draw(f, rows[1], &view.subject, form);
  }
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header<R: Remote>(f: &mut Frame, area: Rect, app: &App<R>) {
  let date = Local::now().format("%Y-%m-%d").to_string();

  let back = if app.history.is_empty() {
    ""
  } else {
    "← [b] back  "
  };
  let left = Span::styled(
    format!(" circle  {back}[g] go to  [q] quit"),
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{date} "),
    Style::default().fg(Color::DarkGray),
  );

  // Simple left-right header: pad the middle.
  let left_width = left.width() as u16;
  let right_width = right.width() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status<R: Remote>(f: &mut Frame, area: Rect, app: &App<R>) {
  let view = app.view();
  let back = if app.history.is_empty() { "" } else { "b back  " };
  let (mode_label, status) = match (&app.mode, &app.form, &view) {
    (Mode::Goto, ..) => ("GO TO", format!("/{}_", app.goto_input)),
    (_, Some(_), _) => (
      "EDIT",
      "Tab/↑↓ field  Enter save  Esc close".to_string(),
    ),
    (_, None, None) => ("PROFILE", format!("g go to  {back}q quit")),
    (_, None, Some(v)) if v.affordance.can_edit() => (
      "PROFILE",
      format!("e edit  r refresh  g go to  {back}q quit"),
    ),
    (_, None, Some(_)) => (
      "PROFILE",
      format!("f follow/unfollow  r refresh  g go to  {back}q quit"),
    ),
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  );

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
