pub mod fields;
pub mod layout;

pub use fields::{control_for, interact, Control, ControlState, ControlStates, Interaction};
pub use layout::{focus_order, render_layout, FieldView, RenderNode};
