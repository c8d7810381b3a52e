use crossterm::event::{KeyCode, KeyEvent};

use crate::review::model::Assessment;
use crate::session::flashcard::Stage;

/// Carousel position. Index 0 is the start card; items follow at 1..=N.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Navigator {
    index: usize,
    item_count: usize,
    pub content_scroll: u16,
}

impl Navigator {
    pub fn new(item_count: usize) -> Self {
        Self {
            index: 0,
            item_count,
            content_scroll: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.item_count + 1
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Position of the focused item in the queue, `None` on the start card.
    pub fn focused_item(&self) -> Option<usize> {
        self.index.checked_sub(1).filter(|&i| i < self.item_count)
    }

    /// Returns true when focus moved, which callers use to reset the card.
    pub fn scroll_to(&mut self, index: usize) -> bool {
        let index = index.min(self.len() - 1);
        if index == self.index {
            return false;
        }
        self.index = index;
        self.content_scroll = 0;
        true
    }

    pub fn scroll_prev(&mut self) -> bool {
        match self.index.checked_sub(1) {
            Some(prev) => self.scroll_to(prev),
            None => false,
        }
    }

    pub fn scroll_next(&mut self) -> bool {
        self.scroll_to(self.index + 1)
    }

    pub fn set_item_count(&mut self, item_count: usize) -> bool {
        self.item_count = item_count;
        if self.index >= self.len() {
            self.index = self.len() - 1;
            self.content_scroll = 0;
            return true;
        }
        false
    }

    pub fn scroll_content_up(&mut self) {
        self.content_scroll = self.content_scroll.saturating_sub(1);
    }

    pub fn scroll_content_down(&mut self, max: u16) {
        self.content_scroll = (self.content_scroll + 1).min(max);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavAction {
    Prev,
    Next,
    ScrollUp,
    ScrollDown,
    Reveal,
    Select(Assessment),
    Complete,
}

/// What the key map needs to know about the focused card.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyContext {
    pub on_item: bool,
    pub stage: Stage,
    pub has_assessment: bool,
    pub item_completed: bool,
    pub submitting: bool,
    pub text_input: bool,
}

pub fn map_key(key: &KeyEvent, ctx: &KeyContext) -> Option<NavAction> {
    if ctx.text_input {
        return None;
    }
    let assessable = ctx.on_item && ctx.stage == Stage::Revealed && !ctx.item_completed;
    match key.code {
        KeyCode::Left => Some(NavAction::Prev),
        KeyCode::Right => Some(NavAction::Next),
        KeyCode::Up => Some(NavAction::ScrollUp),
        KeyCode::Down => Some(NavAction::ScrollDown),
        KeyCode::Char(' ') | KeyCode::Enter if !ctx.on_item => Some(NavAction::Next),
        KeyCode::Char(' ') | KeyCode::Enter
            if ctx.stage == Stage::Recall && !ctx.item_completed =>
        {
            Some(NavAction::Reveal)
        }
        KeyCode::Enter if assessable && ctx.has_assessment && !ctx.submitting => {
            Some(NavAction::Complete)
        }
        KeyCode::Char(c) if assessable => match c.to_ascii_lowercase() {
            '1' | 'f' => Some(NavAction::Select(Assessment::Forgot)),
            '2' | 'h' => Some(NavAction::Select(Assessment::Hard)),
            '3' | 'e' => Some(NavAction::Select(Assessment::Easy)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn on_card(stage: Stage) -> KeyContext {
        KeyContext {
            on_item: true,
            stage,
            ..KeyContext::default()
        }
    }

    #[test]
    fn test_navigator_clamps_and_reports_moves() {
        let mut nav = Navigator::new(2);
        assert_eq!(nav.len(), 3);
        assert_eq!(nav.focused_item(), None);
        assert!(!nav.scroll_prev());
        assert!(nav.scroll_next());
        assert_eq!(nav.focused_item(), Some(0));
        assert!(nav.scroll_to(10));
        assert_eq!(nav.index(), 2);
        assert!(!nav.scroll_next());
        assert!(!nav.scroll_to(2));
    }

    #[test]
    fn test_focus_change_resets_content_scroll() {
        let mut nav = Navigator::new(3);
        nav.scroll_to(1);
        nav.scroll_content_down(5);
        nav.scroll_content_down(5);
        assert_eq!(nav.content_scroll, 2);
        nav.scroll_next();
        assert_eq!(nav.content_scroll, 0);
    }

    #[test]
    fn test_shrinking_list_pulls_focus_back() {
        let mut nav = Navigator::new(3);
        nav.scroll_to(3);
        assert!(nav.set_item_count(1));
        assert_eq!(nav.index(), 1);
        assert!(!nav.set_item_count(4));
    }

    #[test]
    fn test_arrows_always_active() {
        let ctx = on_card(Stage::Revealed);
        assert_eq!(map_key(&key(KeyCode::Left), &ctx), Some(NavAction::Prev));
        assert_eq!(map_key(&key(KeyCode::Right), &ctx), Some(NavAction::Next));
        assert_eq!(map_key(&key(KeyCode::Up), &ctx), Some(NavAction::ScrollUp));
        assert_eq!(map_key(&key(KeyCode::Down), &ctx), Some(NavAction::ScrollDown));
    }

    #[test]
    fn test_reveal_keys_only_in_recall() {
        let recall = on_card(Stage::Recall);
        assert_eq!(map_key(&key(KeyCode::Char(' ')), &recall), Some(NavAction::Reveal));
        assert_eq!(map_key(&key(KeyCode::Enter), &recall), Some(NavAction::Reveal));
        assert_eq!(map_key(&key(KeyCode::Char('1')), &recall), None);

        let revealed = on_card(Stage::Revealed);
        assert_eq!(map_key(&key(KeyCode::Char(' ')), &revealed), None);
        assert_eq!(map_key(&key(KeyCode::Enter), &revealed), None);
    }

    #[test]
    fn test_assessment_keys() {
        let ctx = on_card(Stage::Revealed);
        for (c, expected) in [
            ('1', Assessment::Forgot),
            ('f', Assessment::Forgot),
            ('F', Assessment::Forgot),
            ('2', Assessment::Hard),
            ('h', Assessment::Hard),
            ('3', Assessment::Easy),
            ('E', Assessment::Easy),
        ] {
            assert_eq!(
                map_key(&key(KeyCode::Char(c)), &ctx),
                Some(NavAction::Select(expected)),
                "key {c}"
            );
        }
        assert_eq!(map_key(&key(KeyCode::Char('4')), &ctx), None);
    }

    #[test]
    fn test_enter_completes_only_with_assessment_and_idle_guard() {
        let mut ctx = on_card(Stage::Revealed);
        ctx.has_assessment = true;
        assert_eq!(map_key(&key(KeyCode::Enter), &ctx), Some(NavAction::Complete));
        ctx.submitting = true;
        assert_eq!(map_key(&key(KeyCode::Enter), &ctx), None);
    }

    #[test]
    fn test_completed_item_inert_except_navigation() {
        let mut ctx = on_card(Stage::Revealed);
        ctx.has_assessment = true;
        ctx.item_completed = true;
        assert_eq!(map_key(&key(KeyCode::Enter), &ctx), None);
        assert_eq!(map_key(&key(KeyCode::Char('3')), &ctx), None);
        assert_eq!(map_key(&key(KeyCode::Right), &ctx), Some(NavAction::Next));

        let recall_done = KeyContext {
            item_completed: true,
            ..on_card(Stage::Recall)
        };
        assert_eq!(map_key(&key(KeyCode::Char(' ')), &recall_done), None);
    }

    #[test]
    fn test_text_input_makes_every_key_inert() {
        let ctx = KeyContext {
            text_input: true,
            ..on_card(Stage::Revealed)
        };
        assert_eq!(map_key(&key(KeyCode::Left), &ctx), None);
        assert_eq!(map_key(&key(KeyCode::Char('1')), &ctx), None);
    }

    #[test]
    fn test_start_card_advances() {
        let ctx = KeyContext::default();
        assert_eq!(map_key(&key(KeyCode::Enter), &ctx), Some(NavAction::Next));
        assert_eq!(map_key(&key(KeyCode::Char('1')), &ctx), None);
    }
}
