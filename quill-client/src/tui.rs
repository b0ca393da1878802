use crate::ws::Inbound;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use std::io::Stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, PartialEq, Eq)]
pub enum ChatEntry {
    Agent(String),
    Human(String),
    System(String),
}

/// Raw mode plus the alternate screen, restored on drop so an early `?`
/// never leaves the shell unusable.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> anyhow::Result<Self> {
        let mut guard = Self {
            terminal: Terminal::new(CrosstermBackend::new(std::io::stdout()))?,
        };
        enable_raw_mode()?;
        crossterm::execute!(guard.terminal.backend_mut(), EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

struct App {
    input: String,
    messages: Vec<ChatEntry>,
    connected: bool,
    outbound_tx: mpsc::Sender<String>,
}

impl App {
    fn new(tx: mpsc::Sender<String>) -> Self {
        Self {
            input: String::new(),
            messages: vec![ChatEntry::System("Connecting...".into())],
            connected: false,
            outbound_tx: tx,
        }
    }

    fn system(&mut self, text: impl Into<String>) {
        self.messages.push(ChatEntry::System(text.into()));
    }

    /// Apply one key press. Returns true when the user asked to quit.
    fn on_key(&mut self, key: KeyEvent) -> bool {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => return true,
            (KeyCode::Enter, _) => self.submit(),
            (KeyCode::Esc, _) => self.input.clear(),
            (KeyCode::Backspace, _) => {
                self.input.pop();
            }
            (KeyCode::Char(c), _) => self.input.push(c),
            _ => {}
        }
        false
    }

    fn submit(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }
        self.input.clear();
        if !self.connected {
            self.system("Not connected, answer dropped");
            return;
        }
        match self.outbound_tx.try_send(text.clone()) {
            Ok(()) => self.messages.push(ChatEntry::Human(text)),
            Err(TrySendError::Full(_)) => self.system("Still sending, answer dropped"),
            Err(TrySendError::Closed(_)) => {
                self.connected = false;
                self.system("Connection lost, answer not sent");
            }
        }
    }

    fn on_inbound(&mut self, msg: Inbound) {
        match msg {
            Inbound::Connected => {
                self.connected = true;
                self.system("Connected");
            }
            Inbound::Question(question) => self.messages.push(ChatEntry::Agent(question)),
            Inbound::Disconnected(reason) => {
                self.connected = false;
                match reason {
                    Some(reason) => self.system(format!("Disconnected: {reason}")),
                    None => self.system("Disconnected"),
                }
            }
        }
    }
}

pub async fn run(
    mut inbound_rx: mpsc::Receiver<Inbound>,
    outbound_tx: mpsc::Sender<String>,
) -> anyhow::Result<()> {
    let mut guard = TerminalGuard::enter()?;
    let mut app = App::new(outbound_tx);

    loop {
        guard.terminal.draw(|f| draw(f, &app))?;
        while let Ok(msg) = inbound_rx.try_recv() {
            app.on_inbound(msg);
        }
        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.on_key(key) {
                break;
            }
        }
    }

    Ok(())
}

fn draw(f: &mut Frame, app: &App) {
    let [status_area, chat_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(5),
        Constraint::Length(3),
    ])
    .areas(f.area());

    let status = if app.connected { "CONNECTED" } else { "DISCONNECTED" };
    let status_line = Paragraph::new(format!(" Quill | {status} | Enter to answer, Ctrl+C to quit"))
        .style(Style::default().bg(Color::Blue).fg(Color::White));
    f.render_widget(status_line, status_area);

    // Keep the newest entries visible
    let visible = chat_area.height.saturating_sub(2) as usize;
    let skip = app.messages.len().saturating_sub(visible);
    let items: Vec<ListItem> = app
        .messages
        .iter()
        .skip(skip)
        .map(|entry| match entry {
            ChatEntry::Agent(s) => ListItem::new(format!("Agent: {s}"))
                .style(Style::default().fg(Color::Green)),
            ChatEntry::Human(s) => ListItem::new(format!("  You: {s}"))
                .style(Style::default().fg(Color::Cyan)),
            ChatEntry::System(s) => ListItem::new(format!("* {s}"))
                .style(Style::default().fg(Color::Yellow)),
        })
        .collect();
    let chat = List::new(items).block(Block::default().borders(Borders::ALL).title("Questions"));
    f.render_widget(chat, chat_area);

    let input = Paragraph::new(app.input.as_str())
        .block(Block::default().borders(Borders::ALL).title("Answer"))
        .wrap(Wrap { trim: false });
    f.render_widget(input, input_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.on_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_answers_only_sent_while_connected() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut app = App::new(tx);

        type_text(&mut app, "moon");
        app.on_key(press(KeyCode::Enter));
        assert!(rx.try_recv().is_err());

        app.on_inbound(Inbound::Connected);
        app.on_inbound(Inbound::Question("Word 1?".into()));
        type_text(&mut app, "  moon ");
        app.on_key(press(KeyCode::Enter));

        assert_eq!(rx.try_recv().unwrap(), "moon");
        assert!(app.input.is_empty());
        assert!(app.messages.contains(&ChatEntry::Agent("Word 1?".into())));
        assert_eq!(app.messages.last(), Some(&ChatEntry::Human("moon".into())));
    }

    #[test]
    fn test_editing_keys_and_quit() {
        let (tx, _rx) = mpsc::channel(1);
        let mut app = App::new(tx);

        type_text(&mut app, "tidr");
        app.on_key(press(KeyCode::Backspace));
        type_text(&mut app, "e");
        assert_eq!(app.input, "tide");

        app.on_key(press(KeyCode::Esc));
        assert!(app.input.is_empty());

        assert!(!app.on_key(press(KeyCode::Char('c'))));
        assert!(app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_closed_socket_marks_disconnected() {
        let (tx, rx) = mpsc::channel(1);
        let mut app = App::new(tx);
        app.on_inbound(Inbound::Connected);
        drop(rx);

        type_text(&mut app, "moon");
        app.on_key(press(KeyCode::Enter));
        assert!(!app.connected);
        assert_eq!(
            app.messages.last(),
            Some(&ChatEntry::System("Connection lost, answer not sent".into()))
        );
    }

    #[test]
    fn test_disconnect_reason_is_shown() {
        let (tx, _rx) = mpsc::channel(1);
        let mut app = App::new(tx);
        app.on_inbound(Inbound::Connected);
        app.on_inbound(Inbound::Disconnected(Some("reset".into())));
        assert!(!app.connected);
        assert_eq!(
            app.messages.last(),
            Some(&ChatEntry::System("Disconnected: reset".into()))
        );
    }
}
