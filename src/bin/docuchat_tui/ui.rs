use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use docuchat::constants::{ERROR_TRUNCATE_CHARS, SOURCE_PATH_MAX_CHARS};
use docuchat::{Hit, QueryState};

use crate::app::{App, AppMode, Field};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Status bar
            Constraint::Length(3), // Query input
            Constraint::Length(3), // Parameters
            Constraint::Length(1), // Error line
            Constraint::Min(4),    // Answer
            Constraint::Min(4),    // Sources
            Constraint::Length(1), // Keybindings
        ])
        .split(frame.area());

    draw_status_bar(frame, app, chunks[0]);
    draw_query_input(frame, app, chunks[1]);
    draw_params(frame, app, chunks[2]);
    draw_error(frame, app, chunks[3]);
    draw_answer(frame, app, chunks[4]);
    draw_sources(frame, app, chunks[5]);
    draw_keybindings(frame, app, chunks[6]);

    if app.mode == AppMode::Help {
        draw_help_overlay(frame, app);
    }
}

fn focus_style(app: &App, field: Field) -> Style {
    if app.form.focus == field {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn state_label(state: &QueryState) -> (&'static str, Color) {
    match state {
        QueryState::Idle => ("idle", Color::DarkGray),
        QueryState::Pending { .. } => ("thinking...", Color::Yellow),
        QueryState::AnsweredOk { .. } => ("answered", Color::Green),
        QueryState::AnsweredNoContext { .. } => ("no context", Color::Yellow),
        QueryState::Blocked { .. } => ("blocked", Color::Red),
        QueryState::TransportError { .. } => ("error", Color::Red),
        QueryState::UnexpectedResponse => ("unexpected", Color::Red),
    }
}

/// Compact status bar: mode, connection indicator, backend, query state
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (mode_str, mode_color) = match app.mode {
        AppMode::Normal => ("NORMAL", Color::Blue),
        AppMode::Help => ("HELP", Color::Yellow),
    };

    let connection = if app.connected {
        Span::styled("● ", Style::default().fg(Color::Green))
    } else {
        Span::styled("○ ", Style::default().fg(Color::Red))
    };

    let backend = match &app.service_label {
        Some(label) => format!("{label} @ {}", app.api_base),
        None => app.api_base.clone(),
    };

    let (state_str, state_color) = state_label(app.state());

    let status_bar = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("[{mode_str}]"),
            Style::default().fg(mode_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        connection,
        Span::styled(backend, Style::default().fg(Color::Cyan)),
        Span::raw(" │ "),
        Span::styled(state_str, Style::default().fg(state_color)),
    ]));
    frame.render_widget(status_bar, area);
}

fn draw_query_input(frame: &mut Frame, app: &App, area: Rect) {
    let pending_status = match app.pending_elapsed_secs() {
        Some(elapsed) => {
            // Simple ASCII spinner
            let spinner = match elapsed % 4 {
                0 => "|",
                1 => "/",
                2 => "-",
                _ => "\\",
            };
            format!(" {spinner} {elapsed}s")
        }
        None => String::new(),
    };

    let input = Paragraph::new(Line::from(vec![
        Span::raw(&app.form.query),
        Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]))
    .wrap(Wrap { trim: false })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(app, Field::Query))
            .title(format!(" Ask your documents{pending_status} ")),
    );

    frame.render_widget(input, area);
}

fn draw_params(frame: &mut Frame, app: &App, area: Rect) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(area);

    let params = &app.form.params;
    let rerank = if params.rerank { "[x] rerank" } else { "[ ] rerank" };

    let fields = [
        (Field::K, " k ", params.k.as_str()),
        (Field::Temperature, " temperature ", params.temperature.as_str()),
        (Field::Rerank, " options ", rerank),
    ];

    for ((field, title, value), cell) in fields.into_iter().zip(cells.iter()) {
        let widget = Paragraph::new(value).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_style(app, field))
                .title(title),
        );
        frame.render_widget(widget, *cell);
    }
}

fn draw_error(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(message) = app.state().error_message() {
        let line = Paragraph::new(format!("⚠ {}", truncate_str(&message, ERROR_TRUNCATE_CHARS)))
            .style(Style::default().fg(Color::Red));
        frame.render_widget(line, area);
    }
}

fn draw_answer(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.state();
    let mut lines: Vec<Line> = match state.answer() {
        Some(answer) => answer.lines().map(|l| Line::from(l.to_string())).collect(),
        None if state.is_pending() => vec![Line::styled(
            "Thinking...",
            Style::default().fg(Color::DarkGray),
        )],
        None => Vec::new(),
    };

    if let QueryState::AnsweredNoContext {
        reason: Some(reason),
        ..
    } = state
    {
        lines.push(Line::styled(
            format!("(no supporting context: {reason})"),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let answer = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Answer "))
        .wrap(Wrap { trim: false });

    frame.render_widget(answer, area);
}

fn hit_detail(hit: &Hit) -> String {
    let mut detail = truncate_str(&hit.source_path, SOURCE_PATH_MAX_CHARS);
    if let Some(score) = hit.rerank_score {
        detail.push_str(&format!("  rerank {score:.2}"));
    } else if let Some(score) = hit.fused_score {
        detail.push_str(&format!("  fused {score:.3}"));
    }
    detail
}

fn draw_sources(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .state()
        .hits()
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let style = if i == app.selected_hit {
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(Line::from(vec![
                Span::raw(format!("{}. ", i + 1)),
                Span::styled(hit.label(), Style::default().fg(Color::Cyan)),
                Span::raw("  "),
                Span::styled(hit_detail(hit), Style::default().fg(Color::DarkGray)),
            ]))
            .style(style)
        })
        .collect();

    let title = match app.selected_hit_ref() {
        Some(hit) if !hit.source_path.is_empty() => format!(" Sources: {} ", hit.source_path),
        Some(_) => " Sources ".to_string(),
        None if app.state().is_terminal() => " Sources (none) ".to_string(),
        None => " Sources ".to_string(),
    };

    let sources = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(sources, area);
}

fn draw_keybindings(frame: &mut Frame, app: &App, area: Rect) {
    let ask = if app.is_busy() { "Enter=(waiting)" } else { "Enter=Ask" };
    let bindings = Paragraph::new(format!(
        "{ask}  Tab=Field  [/]=Step  Space=Rerank  ↑↓=Sources  C-U=Clear  F1=Help  C-c=Quit"
    ))
    .style(Style::default().fg(Color::DarkGray));

    frame.render_widget(bindings, area);
}

/// Centered help overlay showing all keybindings
fn draw_help_overlay(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let popup_width = (area.width * 60 / 100).min(64);
    let popup_height = (area.height * 70 / 100).min(20);
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(title, Style::default().fg(Color::Yellow)))
    };

    let help_text = vec![
        Line::from(Span::styled(
            "DocuChat Help",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        section("── Query ──"),
        Line::from("  Enter        Ask (ignored while a query is in flight)"),
        Line::from("  Tab/S-Tab    Move between query, k, temperature, rerank"),
        Line::from("  [ / ]        Step k (1-12) or temperature (0-1)"),
        Line::from("  Space        Toggle rerank (when focused)"),
        Line::from("  Ctrl+U       Clear focused field"),
        Line::from(""),
        section("── Sources ──"),
        Line::from("  ↑/↓          Select citation"),
        Line::from(""),
        section("── General ──"),
        Line::from("  F1 / Esc     Toggle / close this help"),
        Line::from("  Ctrl+C       Quit"),
        Line::from(""),
        Line::from(Span::styled(
            app.config_summary.as_str(),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help "),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(help, popup_area);
}

/// Truncate string for compact display (Unicode-safe)
fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
