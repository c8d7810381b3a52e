use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Submit,
    Cancel,
}

/// Single-line prompt for the "go to card" jump. Accepts digits only.
#[derive(Clone, Debug, Default)]
pub struct LineInput {
    text: String,
    /// Cursor position as a char index (0 = before first char).
    cursor: usize,
}

impl LineInput {
    pub fn new(text: &str) -> Self {
        let text: String = text.chars().filter(char::is_ascii_digit).collect();
        let cursor = text.len();
        Self { text, cursor }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    pub fn number(&self) -> Option<usize> {
        self.text.parse().ok()
    }

    /// Returns (before_cursor, after_cursor) for styled rendering.
    pub fn render_parts(&self) -> (&str, &str) {
        self.text.split_at(self.cursor)
    }

    pub fn handle(&mut self, key: KeyEvent) -> InputResult {
        match key.code {
            KeyCode::Esc => return InputResult::Cancel,
            KeyCode::Enter => return InputResult::Submit,
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.text.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.text.len(),
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.text.remove(self.cursor);
            }
            KeyCode::Delete if self.cursor < self.text.len() => {
                self.text.remove(self.cursor);
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.text.clear();
                self.cursor = 0;
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() && self.text.len() < 6 => {
                self.text.insert(self.cursor, ch);
                self.cursor += 1;
            }
            _ => {}
        }
        InputResult::Continue
    }
}
