use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};
use rust_i18n::t;

use crate::review::classify::{ItemStatus, UiReviewItem};
use crate::review::model::Timestamp;
use crate::review::queue::{LoadState, QueueSection};
use crate::ui::labels;
use crate::ui::theme::Theme;

pub struct QueueList<'a> {
    pub title: String,
    pub section: &'a QueueSection,
    pub selected: Option<usize>,
    pub now: Timestamp,
    pub focused: bool,
    pub theme: &'a Theme,
}

impl<'a> QueueList<'a> {
    fn row(&self, index: usize, item: &UiReviewItem, width: usize) -> Line<'static> {
        let colors = &self.theme.colors;
        let status = item.status(self.now);
        let marker = match status {
            ItemStatus::Overdue => ("!", colors.status_overdue()),
            ItemStatus::Pending => ("·", colors.status_pending()),
            ItemStatus::Completed => ("✓", colors.status_completed()),
        };
        let is_selected = self.selected == Some(index);
        let text_style = if is_selected {
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.fg())
        };

        let kind = labels::item_type(item.item_type);
        let label = item.title.as_deref().unwrap_or(&item.content);
        let budget = width.saturating_sub(kind.chars().count() + 6);
        let label: String = if label.chars().count() > budget {
            let mut cut: String = label.chars().take(budget.saturating_sub(1)).collect();
            cut.push('…');
            cut
        } else {
            label.to_string()
        };

        Line::from(vec![
            Span::styled(if is_selected { "> " } else { "  " }, text_style),
            Span::styled(format!("{} ", marker.0), Style::default().fg(marker.1)),
            Span::styled(format!("{kind} "), Style::default().fg(colors.text_muted())),
            Span::styled(label, text_style),
        ])
    }
}

impl Widget for QueueList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let border = if self.focused {
            colors.border_focused()
        } else {
            colors.border()
        };
        let block = Block::bordered()
            .title(format!(" {} ({}) ", self.title, self.section.items.len()))
            .border_style(Style::default().fg(border));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines: Vec<Line> = Vec::new();
        match &self.section.state {
            LoadState::Loading => lines.push(Line::from(Span::styled(
                t!("queue.loading").into_owned(),
                Style::default().fg(colors.text_muted()),
            ))),
            LoadState::Failed(error) => lines.push(Line::from(Span::styled(
                t!("queue.error", error = error).into_owned(),
                Style::default().fg(colors.error()),
            ))),
            LoadState::Idle | LoadState::Ready => {}
        }
        if self.section.items.is_empty() && self.section.state == LoadState::Ready {
            lines.push(Line::from(Span::styled(
                t!("queue.empty").into_owned(),
                Style::default().fg(colors.text_muted()),
            )));
        }

        // Keep the selection on screen.
        let capacity = (inner.height as usize).saturating_sub(lines.len()).max(1);
        let offset = self
            .selected
            .map(|s| s.saturating_sub(capacity - 1))
            .unwrap_or(0);
        lines.extend(
            self.section
                .items
                .iter()
                .enumerate()
                .skip(offset)
                .take(capacity)
                .map(|(i, item)| self.row(i, item, inner.width as usize)),
        );

        Paragraph::new(lines).render(inner, buf);
    }
}
