use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};
use rust_i18n::t;

use crate::review::clock::ReviewClock;
use crate::review::history::{HistoryBrowser, HistoryBucket, HistoryMode, HistoryRow};
use crate::review::model::ItemType;
use crate::review::queue::LoadState;
use crate::ui::components::pager::Pager;
use crate::ui::labels;
use crate::ui::theme::Theme;

pub struct HistoryView<'a> {
    pub browser: &'a HistoryBrowser,
    pub clock: ReviewClock,
    pub page_window: u32,
    pub theme: &'a Theme,
}

impl HistoryView<'_> {
    fn row_line(&self, buckets: &[HistoryBucket], row: HistoryRow, selected: bool) -> Line<'static> {
        let colors = &self.theme.colors;
        let cursor = if selected { "> " } else { "  " };
        let emphasis = if selected {
            Modifier::BOLD
        } else {
            Modifier::empty()
        };
        match row {
            HistoryRow::Bucket(b) => {
                let bucket = &buckets[b];
                let arrow = if self.browser.expand.is_expanded(bucket.date) {
                    "▾"
                } else {
                    "▸"
                };
                Line::from(vec![
                    Span::raw(cursor),
                    Span::styled(
                        format!("{arrow} {} ", bucket.date.format("%Y-%m-%d (%a)")),
                        Style::default().fg(colors.accent()).add_modifier(emphasis),
                    ),
                    Span::styled(
                        t!("history.items", count = bucket.items.len()).into_owned(),
                        Style::default().fg(colors.text_muted()),
                    ),
                ])
            }
            HistoryRow::Item(b, i) => {
                let item = &buckets[b].items[i];
                let type_color = match item.item_type {
                    ItemType::Note => colors.note(),
                    ItemType::Quote => colors.quote(),
                };
                let label = item.title.clone().unwrap_or_else(|| item.content.clone());
                let time = item
                    .reviewed_at()
                    .map(|ts| ts.with_timezone(&self.clock.offset).format("%H:%M").to_string())
                    .unwrap_or_default();
                Line::from(vec![
                    Span::raw(cursor),
                    Span::raw("    "),
                    Span::styled(format!("{time} "), Style::default().fg(colors.text_muted())),
                    Span::styled(
                        format!("{} ", labels::item_type(item.item_type)),
                        Style::default().fg(type_color),
                    ),
                    Span::styled(label, Style::default().fg(colors.fg()).add_modifier(emphasis)),
                    Span::styled(
                        if item.source.is_empty() {
                            String::new()
                        } else {
                            format!("  · {}", item.source)
                        },
                        Style::default().fg(colors.text_muted()),
                    ),
                ])
            }
        }
    }

    fn footer(&self) -> Line<'static> {
        let colors = &self.theme.colors;
        let muted = Style::default().fg(colors.text_muted());
        match (self.browser.mode, self.browser.state()) {
            (_, LoadState::Loading) => Line::from(Span::styled(t!("history.loading").into_owned(), muted)),
            (_, LoadState::Failed(error)) => Line::from(Span::styled(
                t!("history.error", error = error).into_owned(),
                Style::default().fg(colors.error()),
            )),
            (HistoryMode::Paged, _) => {
                let pager = Pager {
                    history: &self.browser.paged,
                    window: self.page_window,
                    theme: self.theme,
                };
                let mut spans = pager.spans();
                spans.push(Span::styled(
                    format!(
                        "   {}",
                        t!(
                            "history.page",
                            page = self.browser.paged.page + 1,
                            total = self.browser.paged.total_pages.max(1)
                        )
                    ),
                    muted,
                ));
                Line::from(spans)
            }
            (HistoryMode::Infinite, _) if self.browser.infinite.exhausted => {
                Line::from(Span::styled(t!("history.end").into_owned(), muted))
            }
            (HistoryMode::Infinite, _) => {
                Line::from(Span::styled(t!("history.more").into_owned(), muted))
            }
        }
    }
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let title = format!(
            " {} · {} · {} ",
            t!("screen.history"),
            labels::history_mode(self.browser.mode),
            labels::history_filter(self.browser.filter)
        );
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let (buckets, rows) = self.browser.rows(&self.clock);
        let list_height = layout[0].height as usize;
        let lines: Vec<Line> = if rows.is_empty() && *self.browser.state() == LoadState::Ready {
            vec![Line::from(Span::styled(
                t!("history.empty").into_owned(),
                Style::default().fg(colors.text_muted()),
            ))]
        } else {
            let selected = self.browser.selected;
            let offset = selected.saturating_sub(list_height.saturating_sub(1));
            rows.iter()
                .enumerate()
                .skip(offset)
                .take(list_height)
                .map(|(i, row)| self.row_line(&buckets, *row, i == selected))
                .collect()
        };
        Paragraph::new(lines).render(layout[0], buf);
        Paragraph::new(self.footer()).render(layout[1], buf);
    }
}
