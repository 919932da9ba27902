use super::fields::{control_for, Control, ControlState, ControlStates};
use crate::form_core::values::ValueMap;
use crate::form_core::{is_visible, FormController};
use crate::model::{FormSchema, LayoutNode};

pub const DEFAULT_GRID_COLS: u16 = 2;

#[derive(Clone, Debug, PartialEq)]
pub struct FieldView {
    pub field_id: String,
    /// `None` for renderers that draw their own inline label.
    pub label: Option<String>,
    pub required: bool,
    pub control: Control,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RenderNode {
    Stack {
        spacing: u16,
        children: Vec<RenderNode>,
    },
    Grid {
        cols: u16,
        spacing: u16,
        children: Vec<RenderNode>,
    },
    Section {
        title: Option<String>,
        children: Vec<RenderNode>,
    },
    Field(FieldView),
}

pub fn render_layout(form: &FormController, states: &ControlStates) -> Vec<RenderNode> {
    form.schema()
        .layout()
        .iter()
        .filter_map(|n| render_node(n, form, states))
        .collect()
}

/// Missing fields, hidden fields and unknown node kinds render nothing.
pub fn render_node(
    node: &LayoutNode,
    form: &FormController,
    states: &ControlStates,
) -> Option<RenderNode> {
    let children = |nodes: &[LayoutNode]| -> Vec<RenderNode> {
        nodes
            .iter()
            .filter_map(|c| render_node(c, form, states))
            .collect()
    };
    match node {
        LayoutNode::Field { field_id } => {
            let field = form.schema().field(field_id)?;
            if !is_visible(field, form.values()) {
                return None;
            }
            let default_state = ControlState::default();
            let st = states.get(field_id).unwrap_or(&default_state);
            let value = form.value(field_id);
            Some(RenderNode::Field(FieldView {
                field_id: field_id.clone(),
                label: (!field.renderer.inline_label()).then(|| field.label.clone()),
                required: field.is_required(),
                control: control_for(field, value, st),
                error: form
                    .error(field_id)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string),
            }))
        }
        LayoutNode::Stack { spacing, children: c } => Some(RenderNode::Stack {
            spacing: spacing.unwrap_or(0),
            children: children(c),
        }),
        LayoutNode::Grid {
            cols,
            spacing,
            children: c,
        } => Some(RenderNode::Grid {
            cols: cols.filter(|n| *n > 0).unwrap_or(DEFAULT_GRID_COLS),
            spacing: spacing.unwrap_or(0),
            children: children(c),
        }),
        LayoutNode::Section { title, children: c } => Some(RenderNode::Section {
            title: title.clone(),
            children: children(c),
        }),
        LayoutNode::Unknown => None,
    }
}

/// Visible field ids in render order; drives keyboard focus.
pub fn focus_order(schema: &FormSchema, values: &ValueMap) -> Vec<String> {
    fn walk(node: &LayoutNode, schema: &FormSchema, values: &ValueMap, out: &mut Vec<String>) {
        match node {
            LayoutNode::Field { field_id } => {
                if let Some(f) = schema.field(field_id) {
                    if is_visible(f, values) {
                        out.push(field_id.clone());
                    }
                }
            }
            LayoutNode::Stack { children, .. }
            | LayoutNode::Grid { children, .. }
            | LayoutNode::Section { children, .. } => {
                for c in children {
                    walk(c, schema, values, out);
                }
            }
            LayoutNode::Unknown => {}
        }
    }
    let mut out = Vec::new();
    for node in schema.layout() {
        walk(node, schema, values, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> FormController {
        let schema = FormSchema::from_yaml_str(
            r#"
id: profile
fields:
  - id: name
    label: Name
    rules: { required: true }
  - id: newsletter
    label: Newsletter
    renderer: switch
  - id: topics
    label: Topics
    renderer: multiselect
    props: { data: [rust, go] }
    visibleWhen: { field: newsletter, op: equals, value: true }
layout:
  - kind: section
    title: Profile
    children:
      - kind: grid
        children:
          - { kind: field, fieldId: name }
          - { kind: field, fieldId: newsletter }
      - { kind: field, fieldId: topics }
      - { kind: field, fieldId: ghost }
      - { kind: accordion }
"#,
        )
        .unwrap();
        FormController::new(schema, None)
    }

    #[test]
    fn renders_visible_fields_in_layout_order() {
        let form = form();
        let tree = render_layout(&form, &ControlStates::new());
        assert_eq!(tree.len(), 1);
        let RenderNode::Section { title, children } = &tree[0] else {
            panic!("expected section");
        };
        assert_eq!(title.as_deref(), Some("Profile"));
        // hidden topics, dangling ghost and the unknown node render nothing
        assert_eq!(children.len(), 1);
        let RenderNode::Grid { cols, children, .. } = &children[0] else {
            panic!("expected grid");
        };
        assert_eq!(*cols, DEFAULT_GRID_COLS);
        let ids: Vec<&str> = children
            .iter()
            .map(|c| match c {
                RenderNode::Field(v) => v.field_id.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(ids, vec!["name", "newsletter"]);
    }

    #[test]
    fn inline_label_renderers_suppress_the_label() {
        let form = form();
        let tree = render_layout(&form, &ControlStates::new());
        let RenderNode::Section { children, .. } = &tree[0] else {
            panic!()
        };
        let RenderNode::Grid { children, .. } = &children[0] else {
            panic!()
        };
        match (&children[0], &children[1]) {
            (RenderNode::Field(name), RenderNode::Field(news)) => {
                assert_eq!(name.label.as_deref(), Some("Name"));
                assert!(name.required);
                assert_eq!(news.label, None);
                assert!(matches!(news.control, Control::Switch { on: false, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn errors_and_visibility_follow_controller_state() {
        let mut form = form();
        form.change("newsletter", json!(true));
        let _ = form.submit();
        assert_eq!(
            focus_order(form.schema(), form.values()),
            vec!["name", "newsletter", "topics"]
        );
        let tree = render_layout(&form, &ControlStates::new());
        let RenderNode::Section { children, .. } = &tree[0] else {
            panic!()
        };
        assert_eq!(children.len(), 2);
        let RenderNode::Grid { children: grid, .. } = &children[0] else {
            panic!()
        };
        let RenderNode::Field(name) = &grid[0] else {
            panic!()
        };
        assert_eq!(name.error.as_deref(), Some("This field is required"));
    }
}
