use crate::form_core::values::trim_float;
use crate::render::fields::OPTIONS_VISIBLE;
use crate::render::{Control, FieldView, RenderNode};
use crate::theme;
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::*;

/// Narrower grid columns than this fall back to a single column.
pub const MIN_COL_WIDTH: usize = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Submit,
    Reset,
    Cancel,
}

pub const BUTTONS: [Button; 3] = [Button::Submit, Button::Reset, Button::Cancel];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmAction {
    Reset,
    Cancel,
}

/// Everything `draw_form` needs besides the render tree.
pub struct FormView<'a> {
    pub title: &'a str,
    pub subtitle: Option<&'a str>,
    pub nodes: &'a [RenderNode],
    pub focused_field: Option<&'a str>,
    pub focused_button: Option<Button>,
    pub editing: bool,
    pub can_reset: bool,
    pub message: Option<&'a str>,
    pub cursor_on: bool,
}

pub struct Painted {
    pub lines: Vec<Line<'static>>,
    /// Line index of the focused field or button row.
    pub focus_line: Option<usize>,
}

pub fn draw_form(f: &mut Frame, area: Rect, view: &FormView, highlight: bool) {
    let inner_w = area.width.saturating_sub(2) as usize;
    let inner_h = area.height.saturating_sub(2) as usize;
    let painted = form_lines(view, inner_w);
    let tail = if view.editing { OPTIONS_VISIBLE + 2 } else { 3 };
    let scroll = painted
        .focus_line
        .map(|fl| (fl + tail).saturating_sub(inner_h).min(fl))
        .unwrap_or(0);
    let title = if view.editing {
        format!("{} (editing)", view.title)
    } else {
        view.title.to_string()
    };
    let block = panel_block(&title, highlight);
    let p = Paragraph::new(painted.lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    f.render_widget(p, area);
}

pub fn form_lines(view: &FormView, width: usize) -> Painted {
    let mut lines: Vec<Line<'static>> = Vec::new();
    if let Some(sub) = view.subtitle {
        lines.push(Line::from(Span::styled(sub.to_string(), theme::text_muted())));
        lines.push(Line::default());
    }
    let (body, mut focus_line) = paint_children(view.nodes, 0, view, width);
    if let Some(fl) = focus_line.as_mut() {
        *fl += lines.len();
    }
    let has_body = !body.is_empty();
    lines.extend(body);

    if has_body {
        lines.push(Line::default());
    }
    if view.focused_button.is_some() {
        focus_line = Some(lines.len());
    }
    lines.push(button_row(view));
    if let Some(msg) = view.message {
        lines.push(Line::from(Span::styled(msg.to_string(), theme::text_muted())));
    }
    Painted { lines, focus_line }
}

fn button_row(view: &FormView) -> Line<'static> {
    let style_for = |b: Button, base: Style| {
        if view.focused_button == Some(b) {
            theme::list_cursor_style()
        } else {
            base
        }
    };
    let reset_base = if view.can_reset {
        theme::text_active_bold()
    } else {
        theme::text_muted()
    };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(
            "[ Submit ]",
            style_for(Button::Submit, theme::text_active_bold()),
        ),
        Span::raw("  "),
        Span::styled("Reset", style_for(Button::Reset, reset_base)),
        Span::raw("  "),
        Span::styled("Cancel", style_for(Button::Cancel, theme::text_muted())),
    ])
}

type PaintResult = (Vec<Line<'static>>, Option<usize>);

fn paint_children(nodes: &[RenderNode], spacing: u16, view: &FormView, width: usize) -> PaintResult {
    let mut out = Vec::new();
    let mut focus = None;
    for (i, child) in nodes.iter().enumerate() {
        if i > 0 {
            for _ in 0..spacing {
                out.push(Line::default());
            }
        }
        let (lines, f) = paint(child, view, width);
        if let Some(f) = f {
            focus = Some(out.len() + f);
        }
        out.extend(lines);
    }
    (out, focus)
}

fn paint(node: &RenderNode, view: &FormView, width: usize) -> PaintResult {
    match node {
        RenderNode::Stack { spacing, children } => paint_children(children, *spacing, view, width),
        RenderNode::Section { title, children } => {
            let mut out = Vec::new();
            if let Some(t) = title {
                out.push(Line::from(Span::styled(
                    format!("-- {t} --"),
                    theme::section_title(),
                )));
            }
            let (lines, f) = paint_children(children, 0, view, width);
            let focus = f.map(|f| f + out.len());
            out.extend(lines);
            (out, focus)
        }
        RenderNode::Grid {
            cols,
            spacing,
            children,
        } => paint_grid(children, (*cols).max(1) as usize, *spacing, view, width),
        RenderNode::Field(fv) => {
            let focused = view.focused_field == Some(fv.field_id.as_str());
            (paint_field(fv, view), focused.then_some(0))
        }
    }
}

fn paint_grid(
    children: &[RenderNode],
    cols: usize,
    spacing: u16,
    view: &FormView,
    width: usize,
) -> PaintResult {
    let gap = 1 + spacing as usize;
    let col_w = width.saturating_sub(gap * (cols - 1)) / cols;
    if cols == 1 || col_w < MIN_COL_WIDTH {
        return paint_children(children, spacing, view, width);
    }
    let mut out: Vec<Line<'static>> = Vec::new();
    let mut focus = None;
    for (r, row) in children.chunks(cols).enumerate() {
        if r > 0 {
            for _ in 0..spacing {
                out.push(Line::default());
            }
        }
        let cells: Vec<PaintResult> = row.iter().map(|c| paint(c, view, col_w)).collect();
        if let Some(f) = cells.iter().find_map(|(_, f)| *f) {
            focus = Some(out.len() + f);
        }
        let height = cells.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        for y in 0..height {
            let mut spans: Vec<Span<'static>> = Vec::new();
            for (ci, (lines, _)) in cells.iter().enumerate() {
                if ci > 0 {
                    spans.push(Span::raw(" ".repeat(gap)));
                }
                let line = lines.get(y).cloned().unwrap_or_default();
                spans.extend(fit(line, col_w, ci + 1 < cells.len()).spans);
            }
            out.push(Line::from(spans));
        }
    }
    (out, focus)
}

/// Truncate `line` to `width` chars, padding with spaces when `pad`.
pub fn fit(line: Line<'static>, width: usize, pad: bool) -> Line<'static> {
    let mut used = 0;
    let mut spans = Vec::new();
    for span in line.spans {
        if used >= width {
            break;
        }
        let n = span.content.chars().count();
        if used + n <= width {
            used += n;
            spans.push(span);
        } else {
            let take = width - used;
            let text: String = span.content.chars().take(take).collect();
            used += take;
            spans.push(Span::styled(text, span.style));
        }
    }
    if pad && used < width {
        spans.push(Span::raw(" ".repeat(width - used)));
    }
    Line::from(spans)
}

fn paint_field(fv: &FieldView, view: &FormView) -> Vec<Line<'static>> {
    let focused = view.focused_field == Some(fv.field_id.as_str());
    let editing = focused && view.editing;
    let caret = editing && view.cursor_on;
    let sel = if focused { '›' } else { ' ' };
    let req = if fv.required { " *" } else { "" };
    let value_style = if editing {
        theme::text_editing_bold()
    } else if focused {
        theme::text_active_bold()
    } else {
        Style::default()
    };
    let label = fv.label.clone().unwrap_or_default();
    let prefix = format!("{sel} {label}{req}: ");

    let mut lines: Vec<Line<'static>> = Vec::new();
    match &fv.control {
        Control::Text {
            text,
            input_type,
            placeholder,
        } => {
            let shown = if input_type.as_deref() == Some("password") {
                "•".repeat(text.chars().count())
            } else {
                text.clone()
            };
            lines.push(value_line(prefix, shown, placeholder.as_deref(), value_style, editing, caret));
        }
        Control::Date { text, placeholder } => {
            let hint = placeholder.as_deref().unwrap_or("YYYY-MM-DD");
            lines.push(value_line(prefix, text.clone(), Some(hint), value_style, editing, caret));
        }
        Control::Number { text, min, max, .. } => {
            let mut line = value_line(prefix, text.clone(), None, value_style, editing, caret);
            if min.is_some() || max.is_some() {
                let lo = min.map(trim_float).unwrap_or_default();
                let hi = max.map(trim_float).unwrap_or_default();
                line.spans
                    .push(Span::styled(format!("  [{lo}..{hi}]"), theme::text_muted()));
            }
            lines.push(line);
        }
        Control::TextArea {
            text,
            min_rows,
            placeholder,
        } => {
            lines.push(Line::from(format!("{sel} {label}{req}:")));
            let mut body: Vec<Line<'static>> = text
                .lines()
                .map(|l| Line::from(vec![Span::raw("  "), Span::styled(l.to_string(), value_style)]))
                .collect();
            if text.is_empty() {
                if let Some(p) = placeholder {
                    body.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(p.clone(), theme::text_muted()),
                    ]));
                }
            }
            while body.len() < *min_rows {
                body.push(Line::from(Span::styled("  ┆", theme::text_muted())));
            }
            lines.extend(body);
        }
        Control::Select {
            options,
            selected,
            cursor,
            offset,
            placeholder,
        } => {
            let header = match selected.and_then(|i| options.get(i)) {
                Some(o) => Span::styled(o.label.clone(), value_style),
                None => Span::styled(
                    placeholder.clone().unwrap_or_else(|| "(none)".into()),
                    theme::text_muted(),
                ),
            };
            lines.push(Line::from(vec![Span::raw(prefix), header]));
            if editing {
                let marks: Vec<(String, &str)> = options
                    .iter()
                    .enumerate()
                    .map(|(i, o)| (o.label.clone(), if Some(i) == *selected { "(•)" } else { "( )" }))
                    .collect();
                lines.extend(option_window(&marks, *cursor, *offset));
            }
        }
        Control::Radio {
            options,
            selected,
            cursor,
        } => {
            if editing {
                lines.push(Line::from(prefix));
                let marks: Vec<(String, &str)> = options
                    .iter()
                    .enumerate()
                    .map(|(i, o)| (o.label.clone(), if Some(i) == *selected { "(•)" } else { "( )" }))
                    .collect();
                let offset = cursor.saturating_sub(OPTIONS_VISIBLE - 1);
                lines.extend(option_window(&marks, *cursor, offset));
            } else {
                let mut spans = vec![Span::raw(prefix)];
                for (i, o) in options.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::raw("  "));
                    }
                    let on = Some(i) == *selected;
                    let mark = if on { "(•)" } else { "( )" };
                    let style = if on { value_style } else { theme::text_muted() };
                    spans.push(Span::styled(format!("{mark} {}", o.label), style));
                }
                lines.push(Line::from(spans));
            }
        }
        Control::MultiSelect {
            search,
            options,
            tags,
            chip,
            cursor,
            offset,
        } => {
            lines.push(Line::from(vec![
                Span::raw(prefix),
                Span::styled(format!("{} selected", tags.len()), value_style),
            ]));
            if !tags.is_empty() {
                lines.push(chip_line(tags, chip.filter(|_| editing)));
            }
            if editing {
                if let Some(q) = search {
                    let mut q = q.clone();
                    if caret {
                        q.push('▏');
                    }
                    lines.push(Line::from(vec![
                        Span::styled("  Search: ", theme::text_muted()),
                        Span::styled(q, value_style),
                    ]));
                }
                if options.is_empty() {
                    lines.push(Line::from(Span::styled("    (no matches)", theme::text_muted())));
                }
                let marks: Vec<(String, &str)> = options
                    .iter()
                    .map(|(o, on)| (o.label.clone(), if *on { "[x]" } else { "[ ]" }))
                    .collect();
                lines.extend(option_window(&marks, *cursor, *offset));
            }
        }
        Control::Checkbox { label, checked } => {
            let mark = if *checked { "[x]" } else { "[ ]" };
            lines.push(Line::from(vec![
                Span::raw(format!("{sel} ")),
                Span::styled(mark, value_style),
                Span::raw(format!(" {label}{req}")),
            ]));
        }
        Control::Switch { label, on } => {
            let knob = if *on { "(on ●)" } else { "(○ off)" };
            let style = if *on && !focused {
                Style::default().fg(theme::Theme::default().success)
            } else {
                value_style
            };
            lines.push(Line::from(vec![
                Span::raw(format!("{sel} ")),
                Span::styled(knob, style),
                Span::raw(format!(" {label}{req}")),
            ]));
        }
        Control::File {
            files,
            chip,
            draft,
            accept,
            multiple,
        } => {
            let summary = match files.len() {
                0 => Span::styled("(no files)", theme::text_muted()),
                1 => Span::styled("1 file", value_style),
                n => Span::styled(format!("{n} files"), value_style),
            };
            lines.push(Line::from(vec![Span::raw(prefix), summary]));
            if !files.is_empty() {
                lines.push(chip_line(files, chip.filter(|_| editing)));
            }
            if editing {
                let mut d = draft.clone();
                if caret {
                    d.push('▏');
                }
                let mut spans = vec![
                    Span::styled("  path: ", theme::text_muted()),
                    Span::styled(d, value_style),
                ];
                let mut hints = Vec::new();
                if let Some(a) = accept {
                    hints.push(format!("accept {a}"));
                }
                if *multiple {
                    hints.push("multiple".to_string());
                }
                if !hints.is_empty() {
                    spans.push(Span::styled(
                        format!("  ({})", hints.join(", ")),
                        theme::text_muted(),
                    ));
                }
                lines.push(Line::from(spans));
            }
        }
    }
    if let Some(err) = &fv.error {
        lines.push(Line::from(Span::styled(format!("  ! {err}"), theme::text_error())));
    }
    lines
}

fn value_line(
    prefix: String,
    text: String,
    placeholder: Option<&str>,
    style: Style,
    editing: bool,
    caret: bool,
) -> Line<'static> {
    let mut spans = vec![Span::raw(prefix)];
    if text.is_empty() && !editing {
        if let Some(p) = placeholder {
            spans.push(Span::styled(p.to_string(), theme::text_muted()));
            return Line::from(spans);
        }
    }
    let mut text = text;
    if caret {
        text.push('▏');
    }
    spans.push(Span::styled(text, style));
    Line::from(spans)
}

/// `picked` is the chip Delete would remove.
fn chip_line(items: &[String], picked: Option<usize>) -> Line<'static> {
    let mut spans = vec![Span::raw("    ")];
    for (i, t) in items.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        if picked == Some(i) {
            spans.push(Span::styled(format!("›{t} ×‹"), theme::list_cursor_style()));
        } else {
            spans.push(Span::styled(format!("[{t} ×]"), theme::chip()));
        }
    }
    Line::from(spans)
}

fn option_window(items: &[(String, &str)], cursor: usize, offset: usize) -> Vec<Line<'static>> {
    let start = offset.min(items.len());
    let end = (start + OPTIONS_VISIBLE).min(items.len());
    items
        .iter()
        .enumerate()
        .take(end)
        .skip(start)
        .map(|(oi, (label, mark))| {
            let cur = if oi == cursor { '›' } else { ' ' };
            let st = if oi == cursor {
                theme::list_cursor_style()
            } else {
                theme::text_muted()
            };
            Line::from(Span::styled(format!("  {cur} {mark} {label}"), st))
        })
        .collect()
}
