//! The TUI event loop: key events in, display frames out. One logical flow;
//! the only asynchrony is the backend loader observed through its handle.

use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::backend::{BackendHandle, BackendState};
use crate::calculator::Calculator;
use crate::config::Config;
use crate::key_dispatcher::{CalcKey, KeyDispatcher};
use crate::logging::LogRingBuffer;
use crate::trace_key;
use crate::ui::display::{parse_color, DisplayScale};

struct Theme {
    display_fg: Color,
    pulse_fg: Color,
    keypad_fg: Color,
    status_bg: Color,
}

impl Theme {
    fn from_config(config: &Config) -> Self {
        Self {
            display_fg: parse_color(&config.theme.display_fg, Color::White),
            pulse_fg: parse_color(&config.theme.pulse_fg, Color::Yellow),
            keypad_fg: parse_color(&config.theme.keypad_fg, Color::Gray),
            status_bg: parse_color(&config.theme.status_bg, Color::DarkGray),
        }
    }
}

pub struct CalcApp {
    calculator: Calculator,
    dispatcher: KeyDispatcher,
    config: Config,
    theme: Theme,
    log_buffer: LogRingBuffer,
    show_help: bool,
    show_debug: bool,
    last_key: Option<CalcKey>,
    seen_updates: u64,
    pulse_at: Option<Instant>,
}

impl CalcApp {
    pub fn new(config: Config, backend: BackendHandle, log_buffer: LogRingBuffer) -> Self {
        let theme = Theme::from_config(&config);
        Self {
            calculator: Calculator::new(backend),
            dispatcher: KeyDispatcher::new(),
            config,
            theme,
            log_buffer,
            show_help: false,
            show_debug: false,
            last_key: None,
            seen_updates: 0,
            pulse_at: None,
        }
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        // Prime the pulse bookkeeping so the initial "0" does not flash.
        self.seen_updates = self.calculator.updates();

        loop {
            terminal.draw(|f| self.ui(f))?;

            // Poll with a tick so pulse decay and backend readiness flips
            // render without waiting for input.
            if event::poll(Duration::from_millis(self.config.display.tick_ms))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    trace_key!(key.code);
                    match self.dispatcher.dispatch(&key) {
                        Some(CalcKey::Quit) => break,
                        Some(k) => self.apply(k),
                        None => {}
                    }
                }
            }

            if self.calculator.updates() != self.seen_updates {
                self.seen_updates = self.calculator.updates();
                self.pulse_at = Some(Instant::now());
            }
        }
        Ok(())
    }

    fn apply(&mut self, key: CalcKey) {
        self.last_key = Some(key);
        match key {
            CalcKey::Digit(c) => self.calculator.press_digit(c),
            CalcKey::Op(op) => self.calculator.press_operator(op),
            CalcKey::Equals => self.calculator.press_equals(),
            CalcKey::Clear => self.calculator.clear(),
            CalcKey::ToggleHelp => self.show_help = !self.show_help,
            CalcKey::ToggleDebug => self.show_debug = !self.show_debug,
            CalcKey::Quit => {}
        }
    }

    fn pulsing(&self) -> bool {
        self.pulse_at
            .map(|t| t.elapsed() < Duration::from_millis(self.config.display.pulse_ms))
            .unwrap_or(false)
    }

    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // display surface
                Constraint::Min(7),    // keypad
                Constraint::Length(1), // status bar
            ])
            .split(f.area());

        self.render_display(f, chunks[0]);
        self.render_keypad(f, chunks[1]);
        self.render_status(f, chunks[2]);

        if self.show_help {
            self.render_help_popup(f);
        }
        if self.show_debug {
            self.render_debug_popup(f);
        }
    }

    fn render_display(&self, f: &mut Frame, area: Rect) {
        let text = self.calculator.display();
        let base = if self.pulsing() {
            Style::default()
                .fg(self.theme.pulse_fg)
                .add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(self.theme.display_fg)
        };
        let style = DisplayScale::for_text(text).style(base);

        let display = Paragraph::new(Span::styled(text, style))
            .alignment(Alignment::Right)
            .block(Block::default().borders(Borders::ALL).title("calc"));
        f.render_widget(display, area);
    }

    fn render_keypad(&self, f: &mut Frame, area: Rect) {
        let (mul, div) = if self.config.display.use_glyphs {
            ('×', '÷')
        } else {
            ('*', '/')
        };
        let rows = [
            format!("7  8  9  {div}"),
            format!("4  5  6  {mul}"),
            "1  2  3  -".to_string(),
            "C  0  .  +".to_string(),
            "   =".to_string(),
        ];

        let mut lines = vec![Line::from("")];
        for row in rows {
            lines.push(Line::from(Span::styled(
                row,
                Style::default().fg(self.theme.keypad_fg),
            )));
        }

        let keypad = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("keys"));
        f.render_widget(keypad, area);
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let (backend_text, backend_color) = match self.calculator.backend_state() {
            BackendState::Loading => ("backend: loading".to_string(), Color::Yellow),
            BackendState::Ready(_) => ("backend: ready".to_string(), Color::Green),
            BackendState::Failed(reason) => (format!("backend: failed ({reason})"), Color::Red),
        };

        let mut spans = vec![Span::styled(
            backend_text,
            Style::default().fg(backend_color).add_modifier(Modifier::BOLD),
        )];

        if self.config.display.show_key_indicator {
            if let Some(key) = self.last_key {
                spans.push(Span::raw(" | "));
                spans.push(Span::raw(describe_key(key)));
            }
        }
        spans.push(Span::raw(" | F1 Help  F2 Log  q Quit"));

        let status = Paragraph::new(Line::from(spans))
            .style(Style::default().bg(self.theme.status_bg).fg(Color::White));
        f.render_widget(status, area);
    }

    fn render_help_popup(&self, f: &mut Frame) {
        let area = centered_rect(60, 60, f.area());
        f.render_widget(Clear, area);

        let help_text = vec![
            Line::from(Span::styled(
                "calc-tui",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("  0-9 .        - Enter digits"),
            Line::from("  + - * /      - Choose operator"),
            Line::from("  Enter or =   - Evaluate"),
            Line::from("  Esc, Bksp, c - Clear"),
            Line::from("  q, Ctrl+C    - Quit"),
            Line::from(""),
            Line::from("  F1           - Toggle this help"),
            Line::from("  F2           - Toggle the log view"),
            Line::from(""),
            Line::from("Sentinels:"),
            Line::from("  ...  backend still loading, press again once ready"),
            Line::from("  MAX  input longer than 15 characters"),
            Line::from("  ∞    overflow or division by zero"),
            Line::from("  Err  invalid operand or backend error"),
            Line::from("  ERR  backend failed to load"),
        ];

        let help = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });
        f.render_widget(help, area);
    }

    fn render_debug_popup(&self, f: &mut Frame) {
        let area = centered_rect(80, 60, f.area());
        f.render_widget(Clear, area);

        let capacity = area.height.saturating_sub(2) as usize;
        let lines: Vec<Line> = self
            .log_buffer
            .get_recent(capacity)
            .into_iter()
            .map(|entry| Line::from(entry.format_for_display()))
            .collect();

        let title = format!("Log ({} entries)", self.log_buffer.len());
        let popup = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false });
        f.render_widget(popup, area);
    }
}

fn describe_key(key: CalcKey) -> String {
    match key {
        CalcKey::Digit(c) => format!("key: {c}"),
        CalcKey::Op(op) => format!("key: {}", op.symbol()),
        CalcKey::Equals => "key: =".to_string(),
        CalcKey::Clear => "key: clear".to_string(),
        CalcKey::Quit => "key: quit".to_string(),
        CalcKey::ToggleHelp => "key: help".to_string(),
        CalcKey::ToggleDebug => "key: log".to_string(),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Sets up the terminal, runs the app, and restores the terminal even when
/// the loop errors out.
pub fn run_app(config: Config, backend: BackendHandle, log_buffer: LogRingBuffer) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let ratatui_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(ratatui_backend)?;

    let mut app = CalcApp::new(config, backend, log_buffer);
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NativeBackend;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn app() -> CalcApp {
        CalcApp::new(
            Config::default(),
            BackendHandle::ready(NativeBackend),
            LogRingBuffer::new(),
        )
    }

    fn press(app: &mut CalcApp, code: KeyCode) {
        let event = KeyEvent::new(code, KeyModifiers::empty());
        if let Some(key) = app.dispatcher.dispatch(&event) {
            app.apply(key);
        }
    }

    #[test]
    fn key_events_drive_the_calculator() {
        let mut app = app();
        for code in ['3', '+', '4'].map(KeyCode::Char) {
            press(&mut app, code);
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.calculator.display(), "7");
    }

    #[test]
    fn escape_clears_the_calculator() {
        let mut app = app();
        press(&mut app, KeyCode::Char('9'));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.calculator.display(), "0");
    }

    #[test]
    fn toggles_flip_popup_state() {
        let mut app = app();
        press(&mut app, KeyCode::F(1));
        assert!(app.show_help);
        press(&mut app, KeyCode::F(2));
        assert!(app.show_debug);
        press(&mut app, KeyCode::F(1));
        assert!(!app.show_help);
    }

    #[test]
    fn unrecognized_keys_are_swallowed() {
        let mut app = app();
        press(&mut app, KeyCode::Char('5'));
        press(&mut app, KeyCode::Char('z'));
        assert_eq!(app.calculator.display(), "5");
    }
}
