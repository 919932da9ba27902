use crate::form_core::ValueMap;
use crate::widgets::form_widget::FormWidget;
use log::info;

#[allow(clippy::large_enum_variant)]
pub enum Effect {
    /// The form validated and produced its final values.
    Submitted(ValueMap),
    Cancelled,
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

/// ~200ms per tick.
pub const TICKS_PER_SECOND: u64 = 5;

pub struct AppState {
    pub form: FormWidget,
    pub tick: u64,
    pub toast: Option<Toast>,
    pub submitted: Option<ValueMap>,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(form: FormWidget) -> Self {
        Self {
            form,
            tick: 0,
            toast: None,
            submitted: None,
            should_quit: false,
        }
    }

    pub fn advance_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        if self
            .toast
            .as_ref()
            .is_some_and(|t| self.tick >= t.expires_at_tick)
        {
            self.toast = None;
        }
    }
}

pub fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::Submitted(values) => {
                info!("form submitted with {} field(s)", values.len());
                state.submitted = Some(values);
                state.should_quit = true;
            }
            Effect::Cancelled => {
                info!("form cancelled");
                state.submitted = None;
                state.should_quit = true;
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let exp = state
                    .tick
                    .saturating_add(seconds.saturating_mul(TICKS_PER_SECOND));
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: exp,
                });
            }
        }
    }
}
