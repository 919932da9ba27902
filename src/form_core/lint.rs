use super::validation::Validators;
use crate::model::{FormSchema, LayoutNode, Renderer, VisibilityOp};
use std::collections::HashSet;
use std::fmt;

/// Authoring defects that render silently but are worth reporting on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    DanglingFieldRef { field_id: String },
    UnknownLayoutKind,
    UnknownOperator { field_id: String },
    UnknownConditionField { field_id: String, refers_to: String },
    UnknownValidator { field_id: String, name: String },
    MissingOptions { field_id: String },
    NotInLayout { field_id: String },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::DanglingFieldRef { field_id } => {
                write!(f, "layout references unknown field '{field_id}'")
            }
            SchemaIssue::UnknownLayoutKind => write!(f, "layout contains a node of unknown kind"),
            SchemaIssue::UnknownOperator { field_id } => {
                write!(f, "field '{field_id}' uses an unknown visibility operator")
            }
            SchemaIssue::UnknownConditionField {
                field_id,
                refers_to,
            } => write!(
                f,
                "field '{field_id}' has a visibility condition on unknown field '{refers_to}'"
            ),
            SchemaIssue::UnknownValidator { field_id, name } => {
                write!(f, "field '{field_id}' uses unregistered validator '{name}'")
            }
            SchemaIssue::MissingOptions { field_id } => {
                write!(f, "choice field '{field_id}' has no options")
            }
            SchemaIssue::NotInLayout { field_id } => {
                write!(f, "field '{field_id}' is not placed in the layout")
            }
        }
    }
}

pub fn lint_schema(schema: &FormSchema, validators: &Validators) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    let mut placed: HashSet<&str> = HashSet::new();
    for node in schema.layout() {
        lint_node(schema, node, &mut placed, &mut issues);
    }
    for field in schema.fields() {
        let field_id = field.id.clone();
        if !placed.contains(field.id.as_str()) {
            issues.push(SchemaIssue::NotInLayout {
                field_id: field_id.clone(),
            });
        }
        if let Some(cond) = &field.visible_when {
            for rule in cond.rules() {
                if rule.op == VisibilityOp::Unknown {
                    issues.push(SchemaIssue::UnknownOperator {
                        field_id: field_id.clone(),
                    });
                }
                if schema.field(&rule.field).is_none() {
                    issues.push(SchemaIssue::UnknownConditionField {
                        field_id: field_id.clone(),
                        refers_to: rule.field.clone(),
                    });
                }
            }
        }
        if let Some(name) = field.rules.as_ref().and_then(|r| r.validate.as_ref()) {
            if !validators.contains(name) {
                issues.push(SchemaIssue::UnknownValidator {
                    field_id: field_id.clone(),
                    name: name.clone(),
                });
            }
        }
        let is_choice = matches!(
            field.renderer,
            Renderer::Select | Renderer::Multiselect | Renderer::Radio
        );
        if is_choice && field.props.choices().is_empty() {
            issues.push(SchemaIssue::MissingOptions { field_id });
        }
    }
    issues
}

fn lint_node<'a>(
    schema: &FormSchema,
    node: &'a LayoutNode,
    placed: &mut HashSet<&'a str>,
    issues: &mut Vec<SchemaIssue>,
) {
    match node {
        LayoutNode::Field { field_id } => {
            if schema.field(field_id).is_none() {
                issues.push(SchemaIssue::DanglingFieldRef {
                    field_id: field_id.clone(),
                });
            } else {
                placed.insert(field_id.as_str());
            }
        }
        LayoutNode::Stack { children, .. }
        | LayoutNode::Grid { children, .. }
        | LayoutNode::Section { children, .. } => {
            for child in children {
                lint_node(schema, child, placed, issues);
            }
        }
        LayoutNode::Unknown => issues.push(SchemaIssue::UnknownLayoutKind),
    }
}
