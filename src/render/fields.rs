use crate::form_core::values::{display_text, number_value, parse_number, to_number, truthy};
use crate::model::{FieldNode, OptionItem, Renderer};
use log::debug;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

pub const OPTIONS_VISIBLE: usize = 8;

/// Front-end state of a control that is not part of the form value:
/// list cursor and scroll offset, multiselect search text, pending draft,
/// and the chip picked for removal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlState {
    pub cursor: usize,
    pub offset: usize,
    pub search: String,
    pub draft: Option<String>,
    pub chip: Option<usize>,
}

pub type ControlStates = HashMap<String, ControlState>;

/// View-model of one field's control, produced by `control_for`.
#[derive(Clone, Debug, PartialEq)]
pub enum Control {
    Text {
        text: String,
        input_type: Option<String>,
        placeholder: Option<String>,
    },
    Select {
        options: Vec<OptionItem>,
        selected: Option<usize>,
        cursor: usize,
        offset: usize,
        placeholder: Option<String>,
    },
    MultiSelect {
        search: Option<String>,
        /// Options left after the search filter, with their membership flag.
        options: Vec<(OptionItem, bool)>,
        tags: Vec<String>,
        chip: Option<usize>,
        cursor: usize,
        offset: usize,
    },
    TextArea {
        text: String,
        min_rows: usize,
        placeholder: Option<String>,
    },
    Number {
        text: String,
        min: Option<f64>,
        max: Option<f64>,
        step: f64,
    },
    Radio {
        options: Vec<OptionItem>,
        selected: Option<usize>,
        cursor: usize,
    },
    Checkbox {
        label: String,
        checked: bool,
    },
    Switch {
        label: String,
        on: bool,
    },
    Date {
        text: String,
        placeholder: Option<String>,
    },
    File {
        files: Vec<String>,
        chip: Option<usize>,
        draft: String,
        accept: Option<String>,
        multiple: bool,
    },
}

/// One discrete user action on a control.
#[derive(Clone, Debug, PartialEq)]
pub enum Interaction {
    Type(char),
    Erase,
    /// Flip a boolean, or the membership of the option under the cursor.
    Toggle,
    /// Choose the option under the cursor, or commit a file draft.
    Pick,
    CursorUp,
    CursorDown,
    /// Move the selection of a select/radio by one, wrapping.
    Cycle(i32),
    /// Increment or decrement a number by its step.
    Step(i32),
    /// Move the chip cursor over the current selection; past either end clears it.
    MoveChip(i32),
    RemoveTag(usize),
    SetText(String),
}

pub fn control_for(field: &FieldNode, value: Option<&JsonValue>, st: &ControlState) -> Control {
    let props = &field.props;
    match field.renderer {
        Renderer::Text => Control::Text {
            text: display_text(value),
            input_type: field.input_type.clone(),
            placeholder: field.placeholder.clone(),
        },
        Renderer::Select => Control::Select {
            options: props.choices().to_vec(),
            selected: selected_index(props.choices(), value),
            cursor: st.cursor,
            offset: st.offset,
            placeholder: field.placeholder.clone(),
        },
        Renderer::Multiselect => {
            let current = as_items(value);
            let options = filtered_options(field, &st.search)
                .into_iter()
                .map(|o| {
                    let on = current.contains(&o.value);
                    (o.clone(), on)
                })
                .collect();
            let tags = current
                .iter()
                .map(|v| label_for(props.choices(), v))
                .collect();
            Control::MultiSelect {
                search: props.searchable.then(|| st.search.clone()),
                options,
                tags,
                chip: st.chip,
                cursor: st.cursor,
                offset: st.offset,
            }
        }
        Renderer::Textarea => Control::TextArea {
            text: display_text(value),
            min_rows: props.min_rows.unwrap_or(1).max(1),
            placeholder: field.placeholder.clone(),
        },
        Renderer::Number => Control::Number {
            text: st.draft.clone().unwrap_or_else(|| display_text(value)),
            min: props.min,
            max: props.max,
            step: props.step.filter(|s| *s > 0.0).unwrap_or(1.0),
        },
        Renderer::Radio => Control::Radio {
            options: props.choices().to_vec(),
            selected: selected_index(props.choices(), value),
            cursor: st.cursor,
        },
        Renderer::Checkbox => Control::Checkbox {
            label: field.label.clone(),
            checked: truthy(value),
        },
        Renderer::Switch => Control::Switch {
            label: field.label.clone(),
            on: truthy(value),
        },
        Renderer::Date => Control::Date {
            text: display_text(value),
            placeholder: field.placeholder.clone(),
        },
        Renderer::File => Control::File {
            files: as_items(value).iter().map(|v| display_text(Some(v))).collect(),
            chip: st.chip,
            draft: st.draft.clone().unwrap_or_default(),
            accept: props.accept.clone(),
            multiple: props.multiple,
        },
    }
}

/// Apply `action` to the control of `field`. Returns the new field value when
/// the action changes it; the caller hands it to the controller exactly once.
pub fn interact(
    field: &FieldNode,
    value: Option<&JsonValue>,
    st: &mut ControlState,
    action: Interaction,
) -> Option<JsonValue> {
    match field.renderer {
        Renderer::Text | Renderer::Textarea => edit_text(value, action, |_| true),
        Renderer::Date => edit_text(value, action, |c| c.is_ascii_digit() || c == '-'),
        Renderer::Number => interact_number(field, value, st, action),
        Renderer::Checkbox | Renderer::Switch => match action {
            Interaction::Toggle | Interaction::Pick => Some(JsonValue::Bool(!truthy(value))),
            _ => None,
        },
        Renderer::Select | Renderer::Radio => interact_choice(field.props.choices(), value, st, action),
        Renderer::Multiselect => interact_multiselect(field, value, st, action),
        Renderer::File => interact_file(field, value, st, action),
    }
}

fn edit_text(
    value: Option<&JsonValue>,
    action: Interaction,
    allowed: impl Fn(char) -> bool,
) -> Option<JsonValue> {
    let mut text = display_text(value);
    match action {
        Interaction::Type(c) if allowed(c) => text.push(c),
        Interaction::Erase => {
            text.pop();
        }
        Interaction::SetText(s) => text = s,
        _ => return None,
    }
    Some(JsonValue::String(text))
}

fn interact_number(
    field: &FieldNode,
    value: Option<&JsonValue>,
    st: &mut ControlState,
    action: Interaction,
) -> Option<JsonValue> {
    let props = &field.props;
    match action {
        Interaction::Type(c) => {
            let mut draft = st.draft.take().unwrap_or_else(|| display_text(value));
            let accepted = c.is_ascii_digit()
                || (c == '.' && !draft.contains('.'))
                || (c == '-' && draft.is_empty());
            if accepted {
                draft.push(c);
            }
            let parsed = parse_number(&draft);
            st.draft = Some(draft);
            accepted.then_some(parsed)
        }
        Interaction::Erase => {
            let mut draft = st.draft.take().unwrap_or_else(|| display_text(value));
            draft.pop();
            let parsed = parse_number(&draft);
            st.draft = Some(draft);
            Some(parsed)
        }
        Interaction::SetText(s) => {
            st.draft = None;
            Some(parse_number(&s))
        }
        Interaction::Step(dir) => {
            st.draft = None;
            let step = props.step.filter(|s| *s > 0.0).unwrap_or(1.0);
            let mut cur = to_number(value);
            if cur.is_nan() {
                cur = 0.0;
            }
            cur += if dir >= 0 { step } else { -step };
            // snap to the step grid anchored at `min`, then clamp so bounds always win
            let base = props.min.unwrap_or(0.0);
            cur = base + ((cur - base) / step).round() * step;
            if let Some(min) = props.min {
                cur = cur.max(min);
            }
            if let Some(max) = props.max {
                cur = cur.min(max);
            }
            Some(number_value(cur))
        }
        _ => None,
    }
}

fn interact_choice(
    options: &[OptionItem],
    value: Option<&JsonValue>,
    st: &mut ControlState,
    action: Interaction,
) -> Option<JsonValue> {
    match action {
        Interaction::CursorUp => {
            move_cursor(st, -1, options.len());
            None
        }
        Interaction::CursorDown => {
            move_cursor(st, 1, options.len());
            None
        }
        Interaction::Pick | Interaction::Toggle => options.get(st.cursor).map(|o| o.value.clone()),
        Interaction::Cycle(dir) => {
            if options.is_empty() {
                return None;
            }
            let n = options.len();
            let next = match selected_index(options, value) {
                None => 0,
                Some(i) if dir >= 0 => (i + 1) % n,
                Some(i) => (i + n - 1) % n,
            };
            st.cursor = next;
            Some(options[next].value.clone())
        }
        _ => None,
    }
}

fn interact_multiselect(
    field: &FieldNode,
    value: Option<&JsonValue>,
    st: &mut ControlState,
    action: Interaction,
) -> Option<JsonValue> {
    let searchable = field.props.searchable;
    match action {
        Interaction::Type(' ') if !searchable => toggle_at_cursor(field, value, st),
        Interaction::Type(c) if searchable => {
            st.search.push(c);
            st.cursor = 0;
            st.offset = 0;
            None
        }
        Interaction::Erase if !st.search.is_empty() => {
            st.search.pop();
            st.cursor = 0;
            st.offset = 0;
            None
        }
        Interaction::Erase => {
            let items = as_items(value);
            if items.is_empty() {
                return None;
            }
            Some(remove_at(&items, items.len() - 1))
        }
        Interaction::MoveChip(dir) => {
            move_chip(st, dir, as_items(value).len());
            None
        }
        Interaction::RemoveTag(i) => remove_tag(value, st, i),
        Interaction::CursorUp => {
            move_cursor(st, -1, filtered_options(field, &st.search).len());
            None
        }
        Interaction::CursorDown => {
            move_cursor(st, 1, filtered_options(field, &st.search).len());
            None
        }
        Interaction::Toggle | Interaction::Pick => toggle_at_cursor(field, value, st),
        _ => None,
    }
}

fn toggle_at_cursor(
    field: &FieldNode,
    value: Option<&JsonValue>,
    st: &ControlState,
) -> Option<JsonValue> {
    let options = filtered_options(field, &st.search);
    let item = options.get(st.cursor)?;
    Some(toggle_membership(value, &item.value))
}

fn interact_file(
    field: &FieldNode,
    value: Option<&JsonValue>,
    st: &mut ControlState,
    action: Interaction,
) -> Option<JsonValue> {
    let props = &field.props;
    match action {
        Interaction::Type(c) => {
            st.draft.get_or_insert_with(String::new).push(c);
            None
        }
        Interaction::Erase => match st.draft.as_mut().filter(|d| !d.is_empty()) {
            Some(draft) => {
                draft.pop();
                None
            }
            None => {
                let items = as_items(value);
                if items.is_empty() {
                    return None;
                }
                Some(remove_at(&items, items.len() - 1))
            }
        },
        Interaction::Pick | Interaction::SetText(_) => {
            let path = match action {
                Interaction::SetText(s) => s,
                _ => st.draft.clone().unwrap_or_default(),
            };
            let path = path.trim().to_string();
            if path.is_empty() {
                return None;
            }
            if let Some(accept) = &props.accept {
                if !accepts_file(accept, &path) {
                    debug!("file '{path}' rejected for '{}' (accept: {accept})", field.id);
                    return None;
                }
            }
            st.draft = None;
            let mut items = if props.multiple {
                as_items(value)
            } else {
                Vec::new()
            };
            items.push(JsonValue::String(path));
            Some(JsonValue::Array(items))
        }
        Interaction::MoveChip(dir) => {
            move_chip(st, dir, as_items(value).len());
            None
        }
        Interaction::RemoveTag(i) => remove_tag(value, st, i),
        _ => None,
    }
}

fn move_chip(st: &mut ControlState, dir: i32, len: usize) {
    st.chip = match (st.chip, dir < 0) {
        _ if len == 0 => None,
        (None, true) => Some(len - 1),
        (None, false) => Some(0),
        (Some(0), true) => None,
        (Some(i), true) => Some(i.min(len) - 1),
        (Some(i), false) => (i + 1 < len).then_some(i + 1),
    };
}

fn remove_tag(value: Option<&JsonValue>, st: &mut ControlState, i: usize) -> Option<JsonValue> {
    let items = as_items(value);
    if i >= items.len() {
        return None;
    }
    let left = items.len() - 1;
    st.chip = st.chip.filter(|_| left > 0).map(|c| c.min(left - 1));
    Some(remove_at(&items, i))
}

/// Adds `item` when absent (appending, so selection order is kept) and
/// removes it when present. Always returns a fresh array.
pub fn toggle_membership(current: Option<&JsonValue>, item: &JsonValue) -> JsonValue {
    let mut items = as_items(current);
    if let Some(pos) = items.iter().position(|v| v == item) {
        items.remove(pos);
    } else {
        items.push(item.clone());
    }
    JsonValue::Array(items)
}

/// Options whose label contains `search`, case-insensitively.
pub fn filtered_options<'a>(field: &'a FieldNode, search: &str) -> Vec<&'a OptionItem> {
    let needle = search.trim().to_lowercase();
    field
        .props
        .choices()
        .iter()
        .filter(|o| needle.is_empty() || o.label.to_lowercase().contains(&needle))
        .collect()
}

/// `accept` is a comma list; `.ext` entries are checked against the file
/// extension, other entries (MIME patterns) accept anything.
pub fn accepts_file(accept: &str, path: &str) -> bool {
    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let entries: Vec<&str> = accept
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();
    if entries.is_empty() {
        return true;
    }
    entries.iter().any(|entry| match entry.strip_prefix('.') {
        Some(want) => ext.as_deref() == Some(want.to_ascii_lowercase().as_str()),
        None => true,
    })
}

fn as_items(value: Option<&JsonValue>) -> Vec<JsonValue> {
    match value {
        Some(JsonValue::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn remove_at(items: &[JsonValue], idx: usize) -> JsonValue {
    let mut out = items.to_vec();
    out.remove(idx);
    JsonValue::Array(out)
}

fn selected_index(options: &[OptionItem], value: Option<&JsonValue>) -> Option<usize> {
    let v = value?;
    options.iter().position(|o| &o.value == v)
}

fn label_for(options: &[OptionItem], value: &JsonValue) -> String {
    options
        .iter()
        .find(|o| &o.value == value)
        .map(|o| o.label.clone())
        .unwrap_or_else(|| display_text(Some(value)))
}

fn move_cursor(st: &mut ControlState, dir: i32, len: usize) {
    if len == 0 {
        st.cursor = 0;
        st.offset = 0;
        return;
    }
    if dir < 0 {
        st.cursor = st.cursor.saturating_sub(1);
    } else if st.cursor + 1 < len {
        st.cursor += 1;
    }
    st.cursor = st.cursor.min(len - 1);
    if st.cursor < st.offset {
        st.offset = st.cursor;
    }
    if st.cursor >= st.offset + OPTIONS_VISIBLE {
        st.offset = st.cursor + 1 - OPTIONS_VISIBLE;
    }
}
