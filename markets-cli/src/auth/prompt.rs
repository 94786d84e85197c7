//! Interactive credential prompts.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, IsTerminal, Write};

use crate::error::{CliError, CliResult};

/// Source of operator-typed credentials.
pub trait Prompter: Send + Sync {
    /// Ask for the admin email.
    fn email(&self) -> CliResult<String>;

    /// Ask for the admin password without echoing it.
    fn password(&self) -> CliResult<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn email(&self) -> CliResult<String> {
        print!("Admin email: ");
        io::stdout().flush()?;
        let line = read_line(&mut io::stdin().lock())?.trim().to_string();
        if line.is_empty() {
            return Err(CliError::auth("no email entered"));
        }
        Ok(line)
    }

    fn password(&self) -> CliResult<String> {
        print!("Admin password: ");
        io::stdout().flush()?;

        if !io::stdin().is_terminal() {
            return read_line(&mut io::stdin().lock());
        }

        let password = {
            let _guard = RawModeGuard::enable()?;
            read_masked()?
        };
        println!();
        Ok(password)
    }
}

/// Read one line with its terminator removed. Other whitespace is kept.
fn read_line(reader: &mut impl BufRead) -> CliResult<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(CliError::Cancelled);
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> CliResult<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn read_masked() -> CliResult<String> {
    let mut buffer = String::new();
    let mut stdout = io::stdout();

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match apply_key(&mut buffer, key) {
            KeyOutcome::Done => return Ok(buffer),
            KeyOutcome::Cancel => return Err(CliError::Cancelled),
            KeyOutcome::Pushed => write!(stdout, "*")?,
            KeyOutcome::Popped => write!(stdout, "\u{8} \u{8}")?,
            KeyOutcome::Ignored => {}
        }
        stdout.flush()?;
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Done,
    Cancel,
    Pushed,
    Popped,
    Ignored,
}

fn apply_key(buffer: &mut String, key: KeyEvent) -> KeyOutcome {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => KeyOutcome::Cancel,
        KeyCode::Char('d') if ctrl => KeyOutcome::Done,
        KeyCode::Enter => KeyOutcome::Done,
        KeyCode::Backspace => {
            if buffer.pop().is_some() {
                KeyOutcome::Popped
            } else {
                KeyOutcome::Ignored
            }
        }
        KeyCode::Char(c) if !ctrl => {
            buffer.push(c);
            KeyOutcome::Pushed
        }
        _ => KeyOutcome::Ignored,
    }
}
