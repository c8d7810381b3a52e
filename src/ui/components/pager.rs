use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::review::history::PagedHistory;
use crate::ui::theme::Theme;

/// `‹ 3 4 [5] 6 7 ›` over a window of page numbers. Pages are shown 1-based.
pub struct Pager<'a> {
    pub history: &'a PagedHistory,
    pub window: u32,
    pub theme: &'a Theme,
}

impl Pager<'_> {
    pub fn spans(&self) -> Vec<Span<'static>> {
        let colors = &self.theme.colors;
        let dim = Style::default().fg(colors.text_muted());
        let arrow = |enabled: bool, glyph: &'static str| {
            Span::styled(
                glyph,
                if enabled {
                    Style::default().fg(colors.accent())
                } else {
                    dim
                },
            )
        };

        let mut spans = vec![arrow(self.history.has_prev(), "‹ ")];
        for page in self.history.page_window(self.window) {
            let span = if page == self.history.page {
                Span::styled(
                    format!("[{}]", page + 1),
                    Style::default()
                        .fg(colors.accent())
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::styled(format!(" {} ", page + 1), Style::default().fg(colors.fg()))
            };
            spans.push(span);
        }
        spans.push(arrow(self.history.has_next(), " ›"));
        spans
    }
}

impl Widget for Pager<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(Line::from(self.spans()))
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_marks_current_page() {
        let theme = Theme::default();
        let mut history = PagedHistory::new(10);
        history.total_pages = 9;
        history.page = 4;
        let pager = Pager {
            history: &history,
            window: 5,
            theme: &theme,
        };
        let text: String = pager.spans().iter().map(|s| s.content.to_string()).collect();
        assert_eq!(text, "‹  3  4 [5] 6  7  ›");
    }
}
