use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::app::{AppState, ToastLevel};
use crate::form_core::FormPhase;

pub const HELP: &str = "↑↓ move • Enter edit/apply • ←→ change • Space toggle • Del drop chip • Esc back • q quit";

pub fn footer_spans(state: &AppState, last_log: Option<&str>) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    if let Some(t) = &state.toast {
        let color = crate::theme::toast_color(t.level);
        let tag = match t.level {
            ToastLevel::Success => "[OK]",
            ToastLevel::Error => "[ERROR]",
            ToastLevel::Info => "[INFO]",
        };
        spans.push(Span::styled(
            format!("{tag} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!("{}  |  ", t.text),
            Style::default().fg(color),
        ));
    }
    let phase = match state.form.form.phase() {
        FormPhase::Initialized => "ready",
        FormPhase::Editing => "editing",
        FormPhase::Invalid => "invalid",
        FormPhase::Submitted => "submitted",
    };
    spans.push(Span::styled(
        format!("form: {phase}"),
        Style::default().fg(Color::Magenta),
    ));
    if state.form.form.is_dirty() {
        spans.push(Span::styled(" *", Style::default().fg(Color::Magenta)));
    }
    spans.push(Span::raw("  |  "));
    match last_log {
        Some(line) => spans.push(Span::styled(line.to_string(), crate::theme::text_muted())),
        None => spans.push(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
    }
    spans
}

pub fn draw_footer(f: &mut Frame, area: Rect, state: &AppState, last_log: Option<&str>) {
    let p = Paragraph::new(Line::from(footer_spans(state, last_log)));
    f.render_widget(p, area);
}
