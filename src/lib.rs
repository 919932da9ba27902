//! Schema-driven forms: a declarative field/layout model, visibility and
//! validation rules, a state controller, and a ratatui front end.

pub mod app;
pub mod config;
pub mod form_core;
pub mod logging;
pub mod model;
pub mod render;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use form_core::{FormController, FormPhase, SubmitOutcome, Validators, ValueMap};
pub use model::{FormSchema, SchemaError};
