use crate::events::{EventBus, SafeEvent};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A single debounced keypad event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    Star,
    Hash,
}

impl Key {
    /// Map a character from the keypad matrix to a key event
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => Some(Key::Digit(c as u8 - b'0')),
            '*' => Some(Key::Star),
            '#' => Some(Key::Hash),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Key::Digit(d) => (b'0' + d) as char,
            Key::Star => '*',
            Key::Hash => '#',
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Abstraction over the physical keypad: a debounced stream of key events,
/// sampled once per control cycle.
pub trait InputSource: Send + Sync {
    /// Return the next pending key event, if any. Never blocks.
    fn poll_key(&self) -> Option<Key>;
}

/// Keypad driven from the terminal for development and bench testing.
///
/// Maps `0`-`9`, `*` and `#` to keypad events; `q` or Esc publishes a
/// shutdown request. The real safe wires an I2C matrix keypad to the same
/// trait; register-level scanning lives behind that seam.
pub struct TerminalKeypad {
    rx: Mutex<mpsc::Receiver<Key>>,
    cancellation_token: CancellationToken,
}

impl TerminalKeypad {
    /// Create the keypad and start the raw-mode reader task
    pub fn start(event_bus: EventBus, i2c_address: u8) -> Self {
        info!(
            "Starting terminal keypad (stands in for I2C keypad at 0x{:02x})",
            i2c_address
        );

        let (tx, rx) = mpsc::channel();
        let cancellation_token = CancellationToken::new();
        let token = cancellation_token.clone();

        // Raw-mode polling has to live on a blocking task
        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keypad input: {}", e);
                return;
            }

            loop {
                if token.is_cancelled() {
                    debug!("Terminal keypad stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        if let Ok(Event::Key(key_event)) = event::read() {
                            if key_event.kind != KeyEventKind::Press {
                                continue;
                            }
                            match key_event.code {
                                KeyCode::Char(c) => {
                                    if let Some(key) = Key::from_char(c) {
                                        event_bus.publish_lossy(SafeEvent::KeyPressed {
                                            key: key.as_char(),
                                            timestamp: SystemTime::now(),
                                        });
                                        if tx.send(key).is_err() {
                                            break;
                                        }
                                    } else if c == 'q' {
                                        event_bus.publish_lossy(SafeEvent::ShutdownRequested {
                                            timestamp: SystemTime::now(),
                                            reason: "User requested via keypad".to_string(),
                                        });
                                        break;
                                    }
                                }
                                KeyCode::Esc => {
                                    event_bus.publish_lossy(SafeEvent::ShutdownRequested {
                                        timestamp: SystemTime::now(),
                                        reason: "User requested via keypad".to_string(),
                                    });
                                    break;
                                }
                                _ => {}
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(e) => warn!("Error polling for keypad events: {}", e),
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
        });

        Self {
            rx: Mutex::new(rx),
            cancellation_token,
        }
    }

    /// Stop the reader task and restore the terminal
    pub fn stop(&self) {
        self.cancellation_token.cancel();
        let _ = disable_raw_mode();
    }
}

impl InputSource for TerminalKeypad {
    fn poll_key(&self) -> Option<Key> {
        self.rx.lock().try_recv().ok()
    }
}

/// Scripted keypad for tests and dry runs
#[derive(Default)]
pub struct MockKeypad {
    queue: Mutex<VecDeque<Key>>,
}

impl MockKeypad {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a single key press
    pub fn press(&self, key: Key) {
        self.queue.lock().push_back(key);
    }

    /// Queue a sequence of keys given as keypad characters
    pub fn type_sequence(&self, sequence: &str) {
        let mut queue = self.queue.lock();
        for c in sequence.chars() {
            if let Some(key) = Key::from_char(c) {
                queue.push_back(key);
            }
        }
    }
}

impl InputSource for MockKeypad {
    fn poll_key(&self) -> Option<Key> {
        self.queue.lock().pop_front()
    }
}
