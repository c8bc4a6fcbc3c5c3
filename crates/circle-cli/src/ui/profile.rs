//! Profile pane — identity card on the left, details on the right.

use circle_core::{
  affordance::{Affordance, FollowAction},
  controller::ProfileView,
};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};

// ─── Public entry ─────────────────────────────────────────────────────────────

/// Render a loaded profile into `area`.
pub fn draw(f: &mut Frame, area: Rect, view: &ProfileView, base_url: &str) {
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
    .split(area);

  draw_card(f, cols[0], view, base_url);
  draw_details(f, cols[1], view);
}

// ─── Identity card ────────────────────────────────────────────────────────────

fn draw_card(f: &mut Frame, area: Rect, view: &ProfileView, base_url: &str) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let avatar = view
    .subject
    .avatar_href(base_url)
    .unwrap_or_else(|| "(no avatar)".into());

  let lines = vec![
    Line::from(Span::styled(avatar, Style::default().fg(Color::DarkGray))),
    Line::from(""),
    Line::from(Span::styled(
      view.subject.display_name().to_string(),
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    button(view),
  ];
  f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

/// The follow/unfollow button, or the edit button on one's own profile.
fn button(view: &ProfileView) -> Line<'static> {
  let (text, style) = match view.affordance {
    Affordance::SelfView => (
      "[e] Edit ✎".to_string(),
      Style::default().fg(Color::White).bg(Color::DarkGray),
    ),
    Affordance::OtherView { .. } => {
      let action = view
        .affordance
        .follow_action()
        .unwrap_or(FollowAction::Follow);
      let style = if view.toggle_busy {
        Style::default().fg(Color::DarkGray)
      } else if action == FollowAction::Unfollow {
        Style::default().fg(Color::White).bg(Color::DarkGray)
      } else {
        Style::default()
          .fg(Color::Black)
          .bg(Color::Blue)
          .add_modifier(Modifier::BOLD)
      };
      (format!("[f] {} {}", action.label(), action.icon()), style)
    }
  };
  Line::from(Span::styled(format!(" {text} "), style))
}

// ─── Details ──────────────────────────────────────────────────────────────────

fn draw_details(f: &mut Frame, area: Rect, view: &ProfileView) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let subject = &view.subject;
  let mut lines = vec![
    info_row("Email", subject.email.as_deref().unwrap_or_default()),
    info_row("Location", subject.location.as_deref().unwrap_or_default()),
    info_row("Date of birth", &view.date_of_birth),
    info_row("About me", subject.bio.as_deref().unwrap_or_default()),
    Line::from(""),
  ];
  lines.push(Line::from(vec![
    count("Followers", subject.follower_count()),
    Span::raw("   "),
    count("Following", subject.following_count()),
  ]));

  f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn info_row(title: &str, info: &str) -> Line<'static> {
  Line::from(vec![
    Span::styled(
      format!("{title:<14}"),
      Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    ),
    Span::raw(info.to_string()),
  ])
}

fn count(title: &str, n: usize) -> Span<'static> {
  Span::styled(
    format!("{title}: {n}"),
    Style::default().add_modifier(Modifier::BOLD),
  )
}
