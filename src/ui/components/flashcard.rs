use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use rust_i18n::t;

use crate::review::classify::{ItemStatus, UiReviewItem};
use crate::review::clock::ReviewClock;
use crate::review::model::{Assessment, ItemType};
use crate::session::flashcard::{CardState, Stage};
use crate::ui::labels;
use crate::ui::theme::Theme;

/// The focused carousel slot: the start card when `item` is `None`.
pub struct Flashcard<'a> {
    pub item: Option<&'a UiReviewItem>,
    pub card: CardState,
    pub position: usize,
    pub item_count: usize,
    pub clock: ReviewClock,
    pub submitting: bool,
    pub scroll: u16,
    pub theme: &'a Theme,
}

impl<'a> Flashcard<'a> {
    pub fn start(item_count: usize, clock: ReviewClock, theme: &'a Theme) -> Self {
        Self {
            item: None,
            card: CardState::default(),
            position: 0,
            item_count,
            clock,
            submitting: false,
            scroll: 0,
            theme,
        }
    }

    fn render_start(&self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let body = if self.item_count == 0 {
            t!("card.start_empty")
        } else {
            t!("card.start_body", count = self.item_count)
        };
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                t!("card.start_title").into_owned(),
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(body.into_owned(), Style::default().fg(colors.fg()))),
        ];
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }

    fn render_item(&self, item: &UiReviewItem, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let status = item.status(self.clock.now);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(area);

        let type_color = match item.item_type {
            ItemType::Note => colors.note(),
            ItemType::Quote => colors.quote(),
        };
        let status_color = match status {
            ItemStatus::Overdue => colors.status_overdue(),
            ItemStatus::Pending => colors.status_pending(),
            ItemStatus::Completed => colors.status_completed(),
        };
        let title = item
            .title
            .clone()
            .unwrap_or_else(|| t!("item.untitled").into_owned());
        let mut meta = vec![
            Span::styled(
                format!("{} ", labels::item_type(item.item_type)),
                Style::default().fg(type_color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("[{}] ", labels::status(status)), Style::default().fg(status_color)),
            Span::styled(labels::last_review(&item.last_review(&self.clock)), Style::default().fg(colors.text_muted())),
        ];
        if let Some(count) = item.postpone_count.filter(|&c| c > 0) {
            meta.push(Span::styled(
                format!("  {}", t!("card.postponed", count = count)),
                Style::default().fg(colors.warning()),
            ));
        }
        let mut source = item.source.clone();
        if let Some(page) = item.page {
            source = format!("{source} {}", t!("item.page", page = page));
        }
        Paragraph::new(vec![
            Line::from(Span::styled(
                title,
                Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
            )),
            Line::from(meta),
        ])
        .render(layout[0], buf);

        let body = match (self.card.stage, status) {
            (Stage::Recall, s) if s != ItemStatus::Completed => Paragraph::new(Line::from(Span::styled(
                t!("card.recall").into_owned(),
                Style::default().fg(colors.text_muted()),
            )))
            .alignment(Alignment::Center),
            _ => {
                let mut lines: Vec<Line> = item
                    .content
                    .lines()
                    .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(colors.fg()))))
                    .collect();
                if !source.trim().is_empty() {
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled(
                        format!("- {}", source.trim()),
                        Style::default().fg(colors.text_muted()),
                    )));
                }
                if !item.tags.is_empty() {
                    lines.push(Line::from(Span::styled(
                        item.tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" "),
                        Style::default().fg(colors.accent()),
                    )));
                }
                Paragraph::new(lines).scroll((self.scroll, 0))
            }
        };
        body.block(Block::bordered().border_style(Style::default().fg(colors.border())))
            .wrap(Wrap { trim: false })
            .render(layout[1], buf);

        self.render_controls(status, layout[2], buf);
    }

    fn render_controls(&self, status: ItemStatus, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let line = if status == ItemStatus::Completed {
            Line::from(Span::styled(
                format!("✓ {}", t!("card.done")),
                Style::default().fg(colors.success()),
            ))
        } else if self.submitting {
            Line::from(Span::styled(
                t!("card.submitting").into_owned(),
                Style::default().fg(colors.warning()),
            ))
        } else if self.card.stage == Stage::Recall {
            Line::from("")
        } else {
            let mut spans = vec![Span::styled(
                format!("{}  ", t!("card.assess")),
                Style::default().fg(colors.fg()),
            )];
            for (i, assessment) in Assessment::ALL.iter().enumerate() {
                let chosen = self.card.assessment == Some(*assessment);
                let style = if chosen {
                    Style::default()
                        .fg(colors.bg())
                        .bg(colors.accent())
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(colors.accent())
                };
                spans.push(Span::styled(
                    format!(" {} {} ", i + 1, labels::assessment(*assessment)),
                    style,
                ));
                spans.push(Span::raw(" "));
            }
            Line::from(spans)
        };
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}

impl Widget for Flashcard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let position = t!(
            "card.position",
            index = self.position,
            total = self.item_count
        );
        let block = Block::bordered()
            .title(format!(" {position} "))
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        match self.item {
            Some(item) => self.render_item(item, inner, buf),
            None => self.render_start(inner, buf),
        }
    }
}
