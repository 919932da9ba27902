use crate::app::{Effect, ToastLevel};
use crate::form_core::{FormController, SubmitOutcome};
use crate::model::Renderer;
use crate::render::fields::OPTIONS_VISIBLE;
use crate::render::{focus_order, interact, render_layout, ControlStates, Interaction};
use crate::widgets::form::{draw_form, Button, ConfirmAction, FormView, BUTTONS};
use crossterm::event::KeyCode;
use log::debug;
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use std::collections::HashMap;
use tui_textarea::TextArea;

/// Keyboard front end for a `FormController`. Focus walks the visible fields
/// in layout order, then the Submit / Reset / Cancel buttons.
pub struct FormWidget {
    pub form: FormController,
    pub states: ControlStates,
    pub focus: usize,
    pub editing: bool,
    pub message: Option<String>,
    pub confirm: Option<ConfirmAction>,
    ta_map: HashMap<String, TextArea<'static>>,
}

impl FormWidget {
    pub fn new(form: FormController) -> Self {
        Self {
            form,
            states: ControlStates::new(),
            focus: 0,
            editing: false,
            message: None,
            confirm: None,
            ta_map: HashMap::new(),
        }
    }

    pub fn targets(&self) -> Vec<String> {
        focus_order(self.form.schema(), self.form.values())
    }

    pub fn focused_field(&self) -> Option<String> {
        self.targets().get(self.focus).cloned()
    }

    pub fn focused_button(&self) -> Option<Button> {
        let n = self.targets().len();
        self.focus
            .checked_sub(n)
            .and_then(|i| BUTTONS.get(i).copied())
    }

    fn renderer_of(&self, id: &str) -> Option<Renderer> {
        self.form.schema().field(id).map(|f| f.renderer)
    }

    pub fn is_editing_textarea(&self) -> bool {
        self.editing
            && self
                .focused_field()
                .is_some_and(|id| self.renderer_of(&id) == Some(Renderer::Textarea))
    }

    /// Run one interaction and hand a resulting value to the controller.
    fn apply(&mut self, id: &str, action: Interaction) -> bool {
        let Some(field) = self.form.schema().field(id) else {
            return false;
        };
        let st = self.states.entry(id.to_string()).or_default();
        let next = interact(field, self.form.value(id), st, action);
        match next {
            Some(v) => {
                self.form.change(id, v);
                self.refocus(id);
                true
            }
            None => false,
        }
    }

    /// Keep focus on `id` when fields above it appear or disappear.
    fn refocus(&mut self, id: &str) {
        let targets = self.targets();
        match targets.iter().position(|t| t == id) {
            Some(i) => self.focus = i,
            None => self.focus = self.focus.min(targets.len() + BUTTONS.len() - 1),
        }
    }

    fn move_focus(&mut self, dir: i32, wrap: bool) {
        let total = self.targets().len() + BUTTONS.len();
        self.focus = if dir < 0 {
            match self.focus.checked_sub(1) {
                Some(i) => i,
                None if wrap => total - 1,
                None => 0,
            }
        } else if self.focus + 1 < total {
            self.focus + 1
        } else if wrap {
            0
        } else {
            total - 1
        };
    }

    fn begin_edit(&mut self, id: &str) {
        self.editing = true;
        self.message = None;
        let Some(field) = self.form.schema().field(id) else {
            return;
        };
        if matches!(field.renderer, Renderer::Select | Renderer::Radio) {
            let value = self.form.value(id);
            let selected = field
                .props
                .choices()
                .iter()
                .position(|o| Some(&o.value) == value)
                .unwrap_or(0);
            let st = self.states.entry(id.to_string()).or_default();
            st.cursor = selected;
            st.offset = selected.saturating_sub(OPTIONS_VISIBLE - 1);
        }
    }

    fn end_edit(&mut self) {
        if let Some(id) = self.focused_field() {
            if let Some(st) = self.states.get_mut(&id) {
                st.draft = None;
                st.search.clear();
                st.cursor = 0;
                st.offset = 0;
                st.chip = None;
            }
        }
        self.editing = false;
    }

    fn open_textarea(&mut self, id: &str) {
        let Some(field) = self.form.schema().field(id) else {
            return;
        };
        let text = crate::form_core::values::display_text(self.form.value(id));
        let mut ta = TextArea::new(text.lines().map(str::to_string).collect());
        ta.set_block(
            ratatui::widgets::Block::default()
                .borders(ratatui::widgets::Borders::ALL)
                .title(format!("Editing: {} · Ctrl+S Save · Esc Cancel", field.label)),
        );
        self.ta_map.insert(id.to_string(), ta);
        self.editing = true;
        self.message = None;
    }

    pub fn commit_textarea(&mut self) -> bool {
        if !self.is_editing_textarea() {
            return false;
        }
        let Some(id) = self.focused_field() else {
            return false;
        };
        let Some(ta) = self.ta_map.remove(&id) else {
            return false;
        };
        let text = ta.lines().join("\n");
        self.apply(&id, Interaction::SetText(text));
        self.editing = false;
        true
    }

    pub fn cancel_textarea(&mut self) -> bool {
        if !self.is_editing_textarea() {
            return false;
        }
        if let Some(id) = self.focused_field() {
            self.ta_map.remove(&id);
        }
        self.editing = false;
        true
    }

    pub fn submit(&mut self) -> Vec<Effect> {
        self.end_edit();
        match self.form.submit() {
            SubmitOutcome::Submitted(values) => {
                self.message = Some("Submitted".into());
                vec![
                    Effect::ShowToast {
                        text: "Form submitted".into(),
                        level: ToastLevel::Success,
                        seconds: 2,
                    },
                    Effect::Submitted(values),
                ]
            }
            SubmitOutcome::Rejected(errors) => {
                let n = errors.len();
                self.message = Some(format!(
                    "Please fix {n} field{} before submitting",
                    if n == 1 { "" } else { "s" }
                ));
                if let Some(i) = self.targets().iter().position(|id| errors.contains_key(id)) {
                    self.focus = i;
                }
                vec![Effect::ShowToast {
                    text: "Validation failed".into(),
                    level: ToastLevel::Error,
                    seconds: 3,
                }]
            }
        }
    }

    fn press_reset(&mut self) -> Vec<Effect> {
        if self.confirm == Some(ConfirmAction::Reset) {
            self.confirm = None;
            self.message = None;
            self.form.reset();
            self.states.clear();
            self.ta_map.clear();
            self.editing = false;
            self.focus = self.targets().len() + 1;
            return vec![Effect::ShowToast {
                text: "Reset".into(),
                level: ToastLevel::Info,
                seconds: 2,
            }];
        }
        if self.form.is_dirty() || !self.form.errors().is_empty() {
            self.confirm = Some(ConfirmAction::Reset);
            self.message = Some("Press Enter to confirm Reset · Esc to cancel".into());
        } else {
            self.message = Some("Nothing to reset".into());
        }
        Vec::new()
    }

    fn press_cancel(&mut self) -> Vec<Effect> {
        if self.confirm == Some(ConfirmAction::Cancel) {
            self.confirm = None;
            return vec![Effect::Cancelled];
        }
        self.confirm = Some(ConfirmAction::Cancel);
        self.message = Some("Press Enter to confirm Cancel · Esc to stay".into());
        Vec::new()
    }

    fn press_enter(&mut self) -> Vec<Effect> {
        if let Some(b) = self.focused_button() {
            return match b {
                Button::Submit => self.submit(),
                Button::Reset => self.press_reset(),
                Button::Cancel => self.press_cancel(),
            };
        }
        let Some(id) = self.focused_field() else {
            return Vec::new();
        };
        let Some(renderer) = self.renderer_of(&id) else {
            return Vec::new();
        };
        if !self.editing {
            match renderer {
                Renderer::Checkbox | Renderer::Switch => {
                    self.apply(&id, Interaction::Toggle);
                }
                Renderer::Textarea => self.open_textarea(&id),
                _ => self.begin_edit(&id),
            }
            return Vec::new();
        }
        match renderer {
            Renderer::Select | Renderer::Radio => {
                self.apply(&id, Interaction::Pick);
                self.end_edit();
            }
            Renderer::Multiselect => {
                self.apply(&id, Interaction::Toggle);
            }
            Renderer::File => {
                if self.apply(&id, Interaction::Pick) || !self.editing_has_draft(&id) {
                    self.end_edit();
                } else {
                    self.message = Some("File type not accepted".into());
                }
            }
            _ => self.end_edit(),
        }
        Vec::new()
    }

    fn editing_has_draft(&self, id: &str) -> bool {
        self.states
            .get(id)
            .and_then(|s| s.draft.as_deref())
            .is_some_and(|d| !d.trim().is_empty())
    }

    fn vertical(&mut self, dir: i32) {
        let field = self.focused_field();
        let renderer = field.as_deref().and_then(|id| self.renderer_of(id));
        match (self.editing, field, renderer) {
            (true, Some(id), Some(Renderer::Select | Renderer::Radio | Renderer::Multiselect)) => {
                let action = if dir < 0 {
                    Interaction::CursorUp
                } else {
                    Interaction::CursorDown
                };
                self.apply(&id, action);
            }
            (true, Some(id), Some(Renderer::Number)) => {
                // up increments
                self.apply(&id, Interaction::Step(-dir));
            }
            (true, ..) => {
                self.end_edit();
                self.move_focus(dir, false);
            }
            (false, ..) => self.move_focus(dir, false),
        }
    }

    fn horizontal(&mut self, dir: i32) {
        if let Some(b) = self.focused_button() {
            let i = BUTTONS.iter().position(|x| *x == b).unwrap_or(0) as i32 + dir;
            if (0..BUTTONS.len() as i32).contains(&i) {
                self.focus = self.targets().len() + i as usize;
            }
            return;
        }
        let Some(id) = self.focused_field() else {
            return;
        };
        if self.editing {
            if matches!(self.renderer_of(&id), Some(Renderer::Multiselect | Renderer::File)) {
                self.apply(&id, Interaction::MoveChip(dir));
            }
            return;
        }
        match self.renderer_of(&id) {
            Some(Renderer::Select | Renderer::Radio) => {
                self.apply(&id, Interaction::Cycle(dir));
            }
            Some(Renderer::Number) => {
                self.apply(&id, Interaction::Step(dir));
            }
            Some(Renderer::Checkbox | Renderer::Switch) => {
                let on = crate::form_core::values::truthy(self.form.value(&id));
                if on != (dir > 0) {
                    self.apply(&id, Interaction::Toggle);
                }
            }
            _ => {}
        }
    }

    /// Drop the chip under the chip cursor of the field being edited.
    fn remove_picked_chip(&mut self) {
        let Some(id) = self.focused_field().filter(|_| self.editing) else {
            return;
        };
        if let Some(i) = self.states.get(&id).and_then(|st| st.chip) {
            self.apply(&id, Interaction::RemoveTag(i));
        }
    }

    fn on_char(&mut self, c: char) {
        let Some(id) = self.focused_field() else {
            return;
        };
        if self.editing {
            self.apply(&id, Interaction::Type(c));
            return;
        }
        if c != ' ' {
            return;
        }
        match self.renderer_of(&id) {
            Some(Renderer::Checkbox | Renderer::Switch) => {
                self.apply(&id, Interaction::Toggle);
            }
            Some(Renderer::Multiselect) => {
                // open the list so the toggled option is visible
                self.begin_edit(&id);
                self.apply(&id, Interaction::Toggle);
            }
            _ => {}
        }
    }
}

impl crate::widgets::Widget for FormWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let nodes = render_layout(&self.form, &self.states);
        let field = self.focused_field();
        let textarea = self.is_editing_textarea();
        let schema = self.form.schema();
        let view = FormView {
            title: schema.title(),
            subtitle: schema.meta.subtitle.as_deref(),
            nodes: &nodes,
            focused_field: field.as_deref(),
            focused_button: self.focused_button(),
            editing: self.editing,
            can_reset: self.form.is_dirty(),
            message: self.message.as_deref(),
            cursor_on: tick % 2 == 0 && !textarea,
        };
        draw_form(f, area, &view, focused);
        if textarea {
            if let Some(ta) = field.as_ref().and_then(|id| self.ta_map.get(id)) {
                let rect = centered_rect(80, 70, area);
                f.render_widget(ratatui::widgets::Clear, rect);
                f.render_widget(ta, rect);
            }
        }
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<Effect> {
        if self.is_editing_textarea() {
            if key == KeyCode::Esc {
                self.cancel_textarea();
            } else if let (Some(id), Some(code)) = (self.focused_field(), textarea_key(key)) {
                if let Some(ta) = self.ta_map.get_mut(&id) {
                    let _ = ta.input(rt_event::KeyEvent::new(code, rt_event::KeyModifiers::NONE));
                }
            }
            return Vec::new();
        }
        if self.confirm.is_some() && key != KeyCode::Enter {
            self.confirm = None;
            self.message = None;
            if key == KeyCode::Esc {
                return Vec::new();
            }
        }
        match key {
            KeyCode::Up => self.vertical(-1),
            KeyCode::Down => self.vertical(1),
            KeyCode::Tab => {
                self.end_edit();
                self.move_focus(1, true);
            }
            KeyCode::BackTab => {
                self.end_edit();
                self.move_focus(-1, true);
            }
            KeyCode::Left => self.horizontal(-1),
            KeyCode::Right => self.horizontal(1),
            KeyCode::Enter => return self.press_enter(),
            KeyCode::Esc => {
                if self.editing {
                    self.end_edit();
                }
            }
            KeyCode::Backspace => {
                if self.editing {
                    if let Some(id) = self.focused_field() {
                        self.apply(&id, Interaction::Erase);
                    }
                }
            }
            KeyCode::Delete => self.remove_picked_chip(),
            KeyCode::Char(c) => self.on_char(c),
            other => debug!("form: unhandled key {other:?}"),
        }
        Vec::new()
    }
}

/// crossterm's key codes to the copy re-exported by ratatui, which
/// tui-textarea consumes.
fn textarea_key(key: KeyCode) -> Option<rt_event::KeyCode> {
    Some(match key {
        KeyCode::Char(c) => rt_event::KeyCode::Char(c),
        KeyCode::Enter => rt_event::KeyCode::Enter,
        KeyCode::Backspace => rt_event::KeyCode::Backspace,
        KeyCode::Delete => rt_event::KeyCode::Delete,
        KeyCode::Left => rt_event::KeyCode::Left,
        KeyCode::Right => rt_event::KeyCode::Right,
        KeyCode::Up => rt_event::KeyCode::Up,
        KeyCode::Down => rt_event::KeyCode::Down,
        KeyCode::Home => rt_event::KeyCode::Home,
        KeyCode::End => rt_event::KeyCode::End,
        KeyCode::Tab => rt_event::KeyCode::Tab,
        _ => return None,
    })
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let h = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(v[1]);
    h[1]
}
