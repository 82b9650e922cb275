use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// The two fixed lines of the character LCD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcdLine {
    Top,
    Bottom,
}

/// Abstraction over the two-line character LCD. Lines are overwritten in
/// place; rendering and the I2C backpack live behind this seam.
pub trait Display: Send + Sync {
    fn write_line(&self, line: LcdLine, text: &str);
    fn clear(&self);
}

/// In-memory LCD used by tests and dry runs; also serves as the development
/// display, logging each write.
#[derive(Default)]
pub struct MockLcd {
    lines: Mutex<[String; 2]>,
}

impl MockLcd {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current contents of a line
    pub fn line(&self, line: LcdLine) -> String {
        let lines = self.lines.lock();
        match line {
            LcdLine::Top => lines[0].clone(),
            LcdLine::Bottom => lines[1].clone(),
        }
    }
}

impl Display for MockLcd {
    fn write_line(&self, line: LcdLine, text: &str) {
        debug!("LCD {:?}: {:?}", line, text);
        let mut lines = self.lines.lock();
        match line {
            LcdLine::Top => lines[0] = text.to_string(),
            LcdLine::Bottom => lines[1] = text.to_string(),
        }
    }

    fn clear(&self) {
        debug!("LCD cleared");
        let mut lines = self.lines.lock();
        lines[0].clear();
        lines[1].clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_overwritten_in_place() {
        let lcd = MockLcd::new();
        lcd.write_line(LcdLine::Top, "Enter Password:");
        lcd.write_line(LcdLine::Bottom, "123");
        lcd.write_line(LcdLine::Bottom, "1234");

        assert_eq!(lcd.line(LcdLine::Top), "Enter Password:");
        assert_eq!(lcd.line(LcdLine::Bottom), "1234");
    }

    #[test]
    fn test_clear() {
        let lcd = MockLcd::new();
        lcd.write_line(LcdLine::Top, "Authorized:");
        lcd.clear();

        assert_eq!(lcd.line(LcdLine::Top), "");
        assert_eq!(lcd.line(LcdLine::Bottom), "");
    }
}
