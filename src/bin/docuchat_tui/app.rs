use std::time::Instant;

use anyhow::Result;
use docuchat::api::Health;
use docuchat::constants::{DEFAULT_K, DEFAULT_TEMPERATURE, MAX_K, MIN_K, TEMPERATURE_STEP};
use docuchat::{Config, Dispatch, Hit, QueryController, QueryParams, QueryState, RequestToken};
use serde_json::Value;

/// App viewing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    #[default]
    Normal,
    Help,
}

/// Form field that receives keyboard input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Query,
    K,
    Temperature,
    Rerank,
}

impl Field {
    pub fn next(self) -> Self {
        match self {
            Self::Query => Self::K,
            Self::K => Self::Temperature,
            Self::Temperature => Self::Rerank,
            Self::Rerank => Self::Query,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Query => Self::Rerank,
            Self::K => Self::Query,
            Self::Temperature => Self::K,
            Self::Rerank => Self::Temperature,
        }
    }
}

/// Query text plus retrieval parameters, as typed
#[derive(Debug, Clone)]
pub struct QueryForm {
    pub query: String,
    pub params: QueryParams,
    pub focus: Field,
}

impl QueryForm {
    pub fn new(params: QueryParams) -> Self {
        Self {
            query: String::new(),
            params,
            focus: Field::Query,
        }
    }

    pub fn input_char(&mut self, c: char) {
        match self.focus {
            Field::Query => self.query.push(c),
            Field::K => {
                if c.is_ascii_digit() || c == '-' {
                    self.params.k.push(c);
                }
            }
            Field::Temperature => {
                if c.is_ascii_digit() || c == '.' || c == '-' {
                    self.params.temperature.push(c);
                }
            }
            Field::Rerank => {
                if c == ' ' {
                    self.toggle_rerank();
                }
            }
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            Field::Query => {
                self.query.pop();
            }
            Field::K => {
                self.params.k.pop();
            }
            Field::Temperature => {
                self.params.temperature.pop();
            }
            Field::Rerank => {}
        }
    }

    pub fn clear_focused(&mut self) {
        match self.focus {
            Field::Query => self.query.clear(),
            Field::K => self.params.k.clear(),
            Field::Temperature => self.params.temperature.clear(),
            Field::Rerank => {}
        }
    }

    pub fn toggle_rerank(&mut self) {
        self.params.rerank = !self.params.rerank;
    }

    /// Step the focused numeric field up (`true`) or down (`false`) within its UI range
    pub fn step(&mut self, up: bool) {
        match self.focus {
            Field::K => {
                let current = self.params.k.trim().parse::<i64>().unwrap_or(DEFAULT_K as i64);
                let next = if up {
                    current.saturating_add(1)
                } else {
                    current.saturating_sub(1)
                };
                self.params.k = next.clamp(MIN_K as i64, MAX_K as i64).to_string();
            }
            Field::Temperature => {
                let current = self
                    .params
                    .temperature
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|t| t.is_finite())
                    .unwrap_or(DEFAULT_TEMPERATURE);
                let next = if up {
                    current + TEMPERATURE_STEP
                } else {
                    current - TEMPERATURE_STEP
                };
                self.params.temperature = format!("{:.1}", next.clamp(0.0, 1.0));
            }
            Field::Rerank => self.toggle_rerank(),
            Field::Query => {}
        }
    }
}

/// Message enum for Elm-style update pattern
/// Centralizes all state mutations for testability
#[derive(Debug)]
pub enum Msg {
    // Lifecycle
    Quit,

    // Form
    InputChar(char),
    InputBackspace,
    ClearField,
    FocusNext,
    FocusPrev,
    StepUp,
    StepDown,

    // Query
    Submit,
    QuerySettled {
        token: RequestToken,
        result: Result<Value>,
    },

    // Citations
    SelectPrev,
    SelectNext,

    // Connection
    HealthChecked(Option<Health>),

    ToggleHelp,
}

pub struct App {
    // Connection
    pub connected: bool,
    pub api_base: String,
    pub service_label: Option<String>,

    // Config values (read-only display)
    pub config_summary: String,

    // Query
    pub form: QueryForm,
    pub controller: QueryController,
    pub pending_since: Option<Instant>,
    pub selected_hit: usize,

    // UI Mode
    pub mode: AppMode,

    // Control
    pub should_quit: bool,
}

impl App {
    pub fn new(config: &Config) -> Self {
        Self {
            connected: false,
            api_base: config.api_base.clone(),
            service_label: None,
            config_summary: config.summary(),
            form: QueryForm::new(QueryParams::from_config(config)),
            controller: QueryController::new(),
            pending_since: None,
            selected_hit: 0,
            mode: AppMode::Normal,
            should_quit: false,
        }
    }

    pub fn state(&self) -> &QueryState {
        self.controller.state()
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Start a query from the form; `None` when the controller refuses it
    pub fn submit(&mut self) -> Option<Dispatch> {
        let dispatch = self.controller.begin(&self.form.query, &self.form.params)?;
        self.pending_since = Some(Instant::now());
        self.selected_hit = 0;
        Some(dispatch)
    }

    pub fn complete_query(&mut self, token: RequestToken, result: Result<Value>) {
        if self.controller.settle(token, result) {
            self.pending_since = None;
            self.selected_hit = 0;
        }
    }

    pub fn quit(&mut self) {
        self.controller.abandon();
        self.pending_since = None;
        self.should_quit = true;
    }

    pub fn set_health(&mut self, health: Option<Health>) {
        match health {
            Some(health) => {
                self.connected = health.is_ok();
                self.service_label = health.service.map(|service| match health.version {
                    Some(version) => format!("{service} {version}"),
                    None => service,
                });
            }
            None => self.connected = false,
        }
    }

    pub fn pending_elapsed_secs(&self) -> Option<u64> {
        self.pending_since.map(|start| start.elapsed().as_secs())
    }

    pub fn select_prev(&mut self) {
        self.selected_hit = self.selected_hit.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        let count = self.state().hits().len();
        if count > 0 && self.selected_hit < count - 1 {
            self.selected_hit += 1;
        }
    }

    pub fn selected_hit_ref(&self) -> Option<&Hit> {
        self.state().hits().get(self.selected_hit)
    }

    pub fn toggle_help(&mut self) {
        self.mode = match self.mode {
            AppMode::Help => AppMode::Normal,
            AppMode::Normal => AppMode::Help,
        };
    }

    /// Elm-style update function - centralizes all state mutations
    /// Returns the request to send when a query was accepted
    pub fn update(&mut self, msg: Msg) -> Option<Dispatch> {
        match msg {
            Msg::Quit => self.quit(),

            Msg::InputChar(c) => self.form.input_char(c),
            Msg::InputBackspace => self.form.backspace(),
            Msg::ClearField => self.form.clear_focused(),
            Msg::FocusNext => self.form.focus = self.form.focus.next(),
            Msg::FocusPrev => self.form.focus = self.form.focus.prev(),
            Msg::StepUp => self.form.step(true),
            Msg::StepDown => self.form.step(false),

            Msg::Submit => return self.submit(),
            Msg::QuerySettled { token, result } => self.complete_query(token, result),

            Msg::SelectPrev => self.select_prev(),
            Msg::SelectNext => self.select_next(),

            Msg::HealthChecked(health) => self.set_health(health),

            Msg::ToggleHelp => self.toggle_help(),
        }
        None
    }
}
