pub mod controller;
pub mod lint;
pub mod validation;
pub mod values;
pub mod visibility;

pub use controller::{FormController, FormPhase, SubmitOutcome};
pub use lint::{lint_schema, SchemaIssue};
pub use validation::{validate, Validators};
pub use values::{ErrorMap, ValueMap};
pub use visibility::is_visible;
