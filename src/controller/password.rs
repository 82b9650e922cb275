use crate::hardware::Key;

/// Result of submitting the entry buffer against the stored passcode.
/// Transient: it triggers the lock pulse and UI feedback but is not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    Accepted,
    Rejected,
}

/// Bounded buffer of entered passcode digits.
///
/// Mutated only by the controller's input-handling step; cleared on submit
/// (accepted or rejected) and by backspacing to empty.
#[derive(Debug)]
pub struct PasswordBuffer {
    digits: String,
    limit: usize,
}

impl PasswordBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            digits: String::with_capacity(limit),
            limit,
        }
    }

    /// Append a digit key. Non-digits and presses past the limit are ignored.
    /// Returns true if the buffer changed.
    pub fn push(&mut self, key: Key) -> bool {
        match key {
            Key::Digit(_) if self.digits.len() < self.limit => {
                self.digits.push(key.as_char());
                true
            }
            _ => false,
        }
    }

    /// Remove the last digit. No-op on an empty buffer.
    /// Returns true if the buffer changed.
    pub fn backspace(&mut self) -> bool {
        self.digits.pop().is_some()
    }

    /// Take the buffered digits, leaving the buffer empty
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.digits)
    }

    /// Submit the buffer against the stored passcode. Clears the buffer
    /// regardless of the outcome.
    pub fn submit(&mut self, passcode: &str) -> AuthEvent {
        if self.take() == passcode {
            AuthEvent::Accepted
        } else {
            AuthEvent::Rejected
        }
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_backspace() {
        let mut buffer = PasswordBuffer::new(16);
        assert!(buffer.push(Key::Digit(1)));
        assert!(buffer.push(Key::Digit(2)));
        assert_eq!(buffer.as_str(), "12");

        assert!(buffer.backspace());
        assert_eq!(buffer.as_str(), "1");

        assert!(buffer.backspace());
        assert!(buffer.is_empty());

        // Backspace on empty is a no-op
        assert!(!buffer.backspace());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_length_limit() {
        let mut buffer = PasswordBuffer::new(16);
        for _ in 0..20 {
            buffer.push(Key::Digit(7));
        }
        assert_eq!(buffer.len(), 16);
        assert!(!buffer.push(Key::Digit(7)));
    }

    #[test]
    fn test_non_digits_ignored() {
        let mut buffer = PasswordBuffer::new(16);
        assert!(!buffer.push(Key::Star));
        assert!(!buffer.push(Key::Hash));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_submit_exact_match_only() {
        let mut buffer = PasswordBuffer::new(16);
        for c in "12345678".chars() {
            buffer.push(Key::from_char(c).unwrap());
        }
        assert_eq!(buffer.submit("12345678"), AuthEvent::Accepted);
        assert!(buffer.is_empty());

        // Prefix is not a match
        for c in "1234567".chars() {
            buffer.push(Key::from_char(c).unwrap());
        }
        assert_eq!(buffer.submit("12345678"), AuthEvent::Rejected);
        assert!(buffer.is_empty());

        // Empty submit against a non-empty passcode is rejected
        assert_eq!(buffer.submit("12345678"), AuthEvent::Rejected);
    }
}
