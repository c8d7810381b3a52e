use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::session::completion::Acknowledgement;
use crate::ui::labels;
use crate::ui::theme::Theme;

/// Transient acknowledgement pinned to the top-right corner.
pub struct Toast<'a> {
    pub ack: &'a Acknowledgement,
    pub theme: &'a Theme,
}

impl Toast<'_> {
    pub fn area(&self, frame: Rect) -> Rect {
        let text = labels::acknowledgement(self.ack);
        let width = (text.chars().count() as u16 + 6).min(frame.width);
        Rect::new(
            frame.x + frame.width.saturating_sub(width + 1),
            frame.y + 1,
            width,
            3.min(frame.height),
        )
    }
}

impl Widget for Toast<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let color = match self.ack {
            Acknowledgement::Failed(_) => colors.error(),
            Acknowledgement::Postponed => colors.warning(),
            Acknowledgement::ItemReviewed | Acknowledgement::SessionComplete => colors.success(),
        };
        Clear.render(area, buf);
        Paragraph::new(labels::acknowledgement(self.ack))
            .alignment(Alignment::Center)
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .block(
                Block::bordered()
                    .border_style(Style::default().fg(color))
                    .style(Style::default().bg(colors.header_bg())),
            )
            .render(area, buf);
    }
}
