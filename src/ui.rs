use crate::app::{run_effects, AppState};
use crate::config::{load_schema, load_values, LaunchConfig};
use crate::form_core::{lint_schema, FormController};
use crate::widgets::form_widget::FormWidget;
use crate::widgets::status_bar::draw_footer;
use crate::widgets::Widget;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::{info, warn};
use ratatui::prelude::*;
use std::time::{Duration, Instant};

pub fn run() -> Result<()> {
    let cfg = LaunchConfig::from_env()?;
    crate::logging::init(cfg.log_level);
    let mut state = AppState::new(FormWidget::new(build_form(&cfg)?));

    if cfg.headless {
        let summary = run_headless(&mut state, &cfg)?;
        println!("{summary}");
        return Ok(());
    }

    // Setup terminal (interactive)
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let res = event_loop(&mut terminal, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res?;

    if let Some(values) = &state.submitted {
        println!("{}", serde_json::to_string_pretty(values)?);
    }
    Ok(())
}

/// Load schema and optional initial data; lint issues are logged, not fatal.
pub fn build_form(cfg: &LaunchConfig) -> Result<FormController> {
    let schema = load_schema(&cfg.schema_path)?;
    let initial = cfg.data_path.as_deref().map(load_values).transpose()?;
    let form = FormController::new(schema, initial.as_ref());
    for issue in lint_schema(form.schema(), form.validators()) {
        warn!("{}: {issue}", cfg.schema_path.display());
    }
    info!(
        "loaded form '{}' ({} fields) from {}",
        form.schema().id,
        form.schema().fields().len(),
        cfg.schema_path.display()
    );
    Ok(form)
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, state: &mut AppState) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| draw(f, state))?;
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(state, key.code, key.modifiers);
                }
            }
        }
        if state.should_quit {
            return Ok(());
        }
        if last_tick.elapsed() >= tick_rate {
            state.advance_tick();
            last_tick = Instant::now();
        }
    }
}

/// Global shortcuts first; everything else goes to the form.
pub fn handle_key(state: &mut AppState, code: KeyCode, modifiers: KeyModifiers) {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
            state.should_quit = true;
        }
        KeyCode::Char('s') if ctrl => {
            if !state.form.commit_textarea() {
                let effects = state.form.submit();
                run_effects(state, effects);
            }
        }
        KeyCode::Char('q') if !state.form.editing => {
            state.should_quit = true;
        }
        _ => {
            let effects = state.form.on_key(code);
            run_effects(state, effects);
        }
    }
}

pub fn draw(f: &mut Frame, state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());
    state.form.render(f, chunks[0], true, state.tick);
    let last = crate::logging::tail(1).pop();
    draw_footer(f, chunks[1], state, last.as_deref());
}

/// Render `cfg.ticks` frames offscreen and describe the outcome as JSON.
pub fn run_headless(state: &mut AppState, cfg: &LaunchConfig) -> Result<serde_json::Value> {
    let backend = ratatui::backend::TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend)?;
    let mut submit_done = false;
    for _ in 0..cfg.ticks {
        terminal.draw(|f| draw(f, state))?;
        if cfg.headless_submit && !submit_done {
            let effects = state.form.submit();
            run_effects(state, effects);
            submit_done = true;
        }
        state.advance_tick();
    }
    let form = &state.form.form;
    Ok(serde_json::json!({
        "ok": form.errors().is_empty(),
        "form": form.schema().id,
        "title": form.schema().title(),
        "fields": form.schema().fields().len(),
        "visible": state.form.targets(),
        "phase": format!("{:?}", form.phase()),
        "errors": form.errors(),
        "submit_done": submit_done,
        "submitted": state.submitted,
    }))
}
