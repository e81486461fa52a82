mod app;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing_subscriber::EnvFilter;

use docuchat::constants::EVENT_POLL_INTERVAL;
use docuchat::{ApiClient, ChatTransport, Config, RequestToken};

use app::{App, AppMode, Field, Msg};

/// RAII guard for terminal cleanup - ensures terminal is restored even on panic
struct TuiGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TuiGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TuiGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}

/// Settled chat call, tagged with the request it answers
type QueryOutcome = (RequestToken, Result<Value>);

fn setup_logging(config: &Config) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.console_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .compact()
            .init();
        tracing::info!("Development mode: logging to console");
    } else {
        std::fs::create_dir_all(&config.log_dir)?;
        let log_file = format!("{}/docuchat-tui.log", config.log_dir);
        let file_appender = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::sync::Mutex::new(file_appender))
            .json()
            .init();
    }

    tracing::info!("Logging initialized");
    tracing::info!("Log directory: {}", config.log_dir);
    tracing::info!("Log level: {}", config.log_level);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let config = Config::from_env();
    setup_logging(&config)?;

    let api = ApiClient::from_config(&config);
    tracing::info!("Backend: {}", api.base_url());

    // Setup terminal with RAII guard (cleanup happens automatically on drop)
    let mut tui = TuiGuard::new()?;

    let app = App::new(&config);

    // Run the app (any panic will still trigger TuiGuard::drop)
    let result = run_app(&mut tui.terminal, app, api, &config).await;

    if let Err(e) = &result {
        tracing::error!("TUI exited with error: {e:#}");
        eprintln!("Error: {e}");
    }

    result
}

/// Translate a key press into an update message
fn key_to_msg(app: &App, key: KeyEvent) -> Option<Msg> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if app.mode == AppMode::Help {
        return match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Msg::Quit),
            (KeyCode::Esc | KeyCode::F(1), _) => Some(Msg::ToggleHelp),
            _ => None,
        };
    }

    let stepping_focus = matches!(app.form.focus, Field::K | Field::Temperature | Field::Rerank);

    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Msg::Quit),
        (KeyCode::Char('u'), KeyModifiers::CONTROL) => Some(Msg::ClearField),
        (KeyCode::F(1), _) => Some(Msg::ToggleHelp),

        (KeyCode::Enter, _) => Some(Msg::Submit),
        (KeyCode::Tab, _) => Some(Msg::FocusNext),
        (KeyCode::BackTab, _) => Some(Msg::FocusPrev),

        (KeyCode::Up, _) => Some(Msg::SelectPrev),
        (KeyCode::Down, _) => Some(Msg::SelectNext),

        (KeyCode::Char(']'), _) if stepping_focus => Some(Msg::StepUp),
        (KeyCode::Char('['), _) if stepping_focus => Some(Msg::StepDown),

        (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => Some(Msg::InputChar(c)),
        (KeyCode::Backspace, _) => Some(Msg::InputBackspace),

        _ => None,
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    api: ApiClient,
    config: &Config,
) -> Result<()> {
    let mut health_timer = interval(Duration::from_secs(config.health_interval_secs));

    // Channel for async chat results (non-blocking query)
    let (query_tx, mut query_rx) = mpsc::unbounded_channel::<QueryOutcome>();

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        tokio::select! {
            // Terminal input events
            result = tokio::task::spawn_blocking(|| {
                if event::poll(EVENT_POLL_INTERVAL).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            }) => {
                if let Ok(Some(Event::Key(key))) = result {
                    if let Some(msg) = key_to_msg(&app, key) {
                        if let Some(dispatch) = app.update(msg) {
                            let api_clone = api.clone();
                            let tx = query_tx.clone();

                            tokio::spawn(async move {
                                let result = api_clone.chat(&dispatch.request).await;
                                // Receiver is gone once the app has quit; the result is moot then
                                let _ = tx.send((dispatch.token, result));
                            });
                        }
                    }
                }
            }

            // Receive chat results (non-blocking)
            Some((token, result)) = query_rx.recv() => {
                app.update(Msg::QuerySettled { token, result });
            }

            // Health check polling
            _ = health_timer.tick() => {
                let health = api.health_check().await;
                app.update(Msg::HealthChecked(health));
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn make_test_app() -> App {
        App::new(&Config::from_lookup(|_| None))
    }

    #[test]
    fn test_keymodifier_pattern_matching() {
        // Verify OR pattern works with bitflags KeyModifiers
        fn matches_none_or_shift(m: KeyModifiers) -> bool {
            matches!(m, KeyModifiers::NONE | KeyModifiers::SHIFT)
        }

        assert!(matches_none_or_shift(KeyModifiers::NONE));
        assert!(matches_none_or_shift(KeyModifiers::SHIFT));
        assert!(!matches_none_or_shift(KeyModifiers::CONTROL));
        assert!(!matches_none_or_shift(KeyModifiers::SHIFT | KeyModifiers::CONTROL));
    }

    #[test]
    fn test_typing_goes_to_input() {
        let app = make_test_app();
        assert!(matches!(
            key_to_msg(&app, press(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(Msg::InputChar('q'))
        ));
        assert!(matches!(
            key_to_msg(&app, press(KeyCode::Char('R'), KeyModifiers::SHIFT)),
            Some(Msg::InputChar('R'))
        ));
    }

    #[test]
    fn test_brackets_step_only_numeric_fields() {
        let mut app = make_test_app();
        assert!(matches!(
            key_to_msg(&app, press(KeyCode::Char(']'), KeyModifiers::NONE)),
            Some(Msg::InputChar(']'))
        ));

        app.form.focus = Field::K;
        assert!(matches!(
            key_to_msg(&app, press(KeyCode::Char(']'), KeyModifiers::NONE)),
            Some(Msg::StepUp)
        ));
        assert!(matches!(
            key_to_msg(&app, press(KeyCode::Char('['), KeyModifiers::NONE)),
            Some(Msg::StepDown)
        ));
    }

    #[test]
    fn test_control_keys() {
        let app = make_test_app();
        assert!(matches!(
            key_to_msg(&app, press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Msg::Quit)
        ));
        assert!(matches!(
            key_to_msg(&app, press(KeyCode::Char('u'), KeyModifiers::CONTROL)),
            Some(Msg::ClearField)
        ));
        assert!(matches!(
            key_to_msg(&app, press(KeyCode::Enter, KeyModifiers::NONE)),
            Some(Msg::Submit)
        ));
        assert!(key_to_msg(&app, press(KeyCode::Char('x'), KeyModifiers::ALT)).is_none());
    }

    #[test]
    fn test_help_mode_swallows_input() {
        let mut app = make_test_app();
        app.toggle_help();

        assert!(key_to_msg(&app, press(KeyCode::Char('a'), KeyModifiers::NONE)).is_none());
        assert!(key_to_msg(&app, press(KeyCode::Enter, KeyModifiers::NONE)).is_none());
        assert!(matches!(
            key_to_msg(&app, press(KeyCode::Esc, KeyModifiers::NONE)),
            Some(Msg::ToggleHelp)
        ));
    }

    #[test]
    fn test_key_release_ignored() {
        let app = make_test_app();
        let mut key = press(KeyCode::Enter, KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert!(key_to_msg(&app, key).is_none());
    }
}
