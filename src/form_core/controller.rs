use super::validation::{validate, Validators};
use super::values::{initial_value, ErrorMap, ValueMap};
use super::visibility::is_visible;
use crate::model::{FieldNode, FormSchema};
use log::{debug, warn};
use serde_json::Value as JsonValue;

pub type SubmitHandler = Box<dyn FnMut(&ValueMap)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Initialized,
    Editing,
    /// The last submit was rejected; errors are on display.
    Invalid,
    Submitted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(ValueMap),
    Rejected(ErrorMap),
}

/// Owns the value and error maps of one form instance.
pub struct FormController {
    schema: FormSchema,
    validators: Validators,
    initial: ValueMap,
    values: ValueMap,
    errors: ErrorMap,
    phase: FormPhase,
    on_submit: Option<SubmitHandler>,
}

impl FormController {
    pub fn new(schema: FormSchema, initial_data: Option<&ValueMap>) -> Self {
        let initial: ValueMap = schema
            .fields()
            .iter()
            .map(|f| {
                let explicit = initial_data.and_then(|d| d.get(&f.id));
                (f.id.clone(), initial_value(f, explicit))
            })
            .collect();
        Self {
            schema,
            validators: Validators::default(),
            values: initial.clone(),
            initial,
            errors: ErrorMap::new(),
            phase: FormPhase::Initialized,
            on_submit: None,
        }
    }

    pub fn with_validators(mut self, validators: Validators) -> Self {
        self.validators = validators;
        self
    }

    pub fn on_submit(mut self, handler: impl FnMut(&ValueMap) + 'static) -> Self {
        self.on_submit = Some(Box::new(handler));
        self
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn validators(&self) -> &Validators {
        &self.validators
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn value(&self, field_id: &str) -> Option<&JsonValue> {
        self.values.get(field_id)
    }

    pub fn error(&self, field_id: &str) -> Option<&str> {
        self.errors.get(field_id).map(String::as_str)
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }

    pub fn is_field_visible(&self, field_id: &str) -> bool {
        self.schema
            .field(field_id)
            .map(|f| is_visible(f, &self.values))
            .unwrap_or(false)
    }

    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldNode> {
        self.schema
            .fields()
            .iter()
            .filter(|f| is_visible(f, &self.values))
    }

    /// Apply one user edit. Fields hidden by the edit lose their values in the
    /// same update; only the edited field is re-validated.
    pub fn change(&mut self, field_id: &str, value: JsonValue) {
        let Some(field) = self.schema.field(field_id) else {
            warn!("change for unknown field '{field_id}' ignored");
            return;
        };
        let mut shadow = self.values.clone();
        shadow.insert(field_id.to_string(), value);
        // Clearing one field can hide another that depends on it.
        loop {
            let hidden: Vec<String> = self
                .schema
                .fields()
                .iter()
                .filter(|f| shadow.contains_key(&f.id) && !is_visible(f, &shadow))
                .map(|f| f.id.clone())
                .collect();
            if hidden.is_empty() {
                break;
            }
            for id in hidden {
                debug!("clearing hidden field '{id}'");
                shadow.remove(&id);
            }
        }
        self.values = shadow;
        match validate(field, self.values.get(field_id), &self.values, &self.validators) {
            Some(msg) => {
                self.errors.insert(field_id.to_string(), msg);
            }
            None => {
                self.errors.remove(field_id);
            }
        }
        // a rejected submit stays Invalid until its last error is fixed
        if self.phase != FormPhase::Invalid || self.errors.is_empty() {
            self.phase = FormPhase::Editing;
        }
    }

    /// Validate every visible field. The submit handler only runs when no
    /// errors remain; it receives the values of visible fields.
    pub fn submit(&mut self) -> SubmitOutcome {
        let mut errors = ErrorMap::new();
        for field in self.schema.fields() {
            if !is_visible(field, &self.values) {
                continue;
            }
            if let Some(msg) = validate(
                field,
                self.values.get(&field.id),
                &self.values,
                &self.validators,
            ) {
                errors.insert(field.id.clone(), msg);
            }
        }
        self.errors = errors;
        if !self.errors.is_empty() {
            debug!(
                "submit of '{}' rejected with {} error(s)",
                self.schema.id,
                self.errors.len()
            );
            self.phase = FormPhase::Invalid;
            return SubmitOutcome::Rejected(self.errors.clone());
        }
        let snapshot = self.submission();
        debug!("submit of '{}' accepted", self.schema.id);
        if let Some(handler) = self.on_submit.as_mut() {
            handler(&snapshot);
        }
        self.phase = FormPhase::Submitted;
        SubmitOutcome::Submitted(snapshot)
    }

    /// Values of currently visible fields; hidden fields are omitted.
    pub fn submission(&self) -> ValueMap {
        self.visible_fields()
            .filter_map(|f| self.values.get(&f.id).map(|v| (f.id.clone(), v.clone())))
            .collect()
    }

    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();
        self.phase = FormPhase::Initialized;
        debug!("form '{}' reset", self.schema.id);
    }
}

#[cfg(test)]
mod tests;
