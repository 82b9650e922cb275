mod keypad;
mod lcd;
mod lock;
mod tilt;

pub use keypad::{InputSource, Key, MockKeypad, TerminalKeypad};
pub use lcd::{Display, LcdLine, MockLcd};
pub use lock::{LockActuator, MockLockActuator};
pub use tilt::{MockTiltSensor, TamperSensor};
