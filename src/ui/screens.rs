use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};
use rust_i18n::t;

use crate::app::{App, AppScreen};
use crate::review::history::HistoryMode;
use crate::review::progress::Progress;
use crate::review::queue::QueueKind;
use crate::ui::components::flashcard::Flashcard;
use crate::ui::components::history_view::HistoryView;
use crate::ui::components::progress_bar::ProgressBar;
use crate::ui::components::queue_list::QueueList;
use crate::ui::components::toast::Toast;
use crate::ui::labels;
use crate::ui::layout::{AppLayout, centered_rect, pack_hint_lines};

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;
    frame.render_widget(Block::default().style(Style::default().bg(colors.bg())), area);

    let hints = footer_hints(app);
    let hint_refs: Vec<&str> = hints.iter().map(String::as_str).collect();
    let mut footer = pack_hint_lines(&hint_refs, area.width as usize);
    if let Some(hint) = &app.hint {
        footer.insert(0, format!("  {hint}"));
    }
    let layout = AppLayout::new(area, footer.len() as u16);

    render_header(frame, app, layout.header);
    match app.screen {
        AppScreen::Overview => render_overview(frame, app, &layout),
        AppScreen::Session => render_session(frame, app, &layout),
        AppScreen::History => render_history(frame, app, &layout),
    }

    let footer_lines: Vec<Line> = footer
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let color = if i == 0 && app.hint.is_some() {
                colors.warning()
            } else {
                colors.text_muted()
            };
            Line::from(Span::styled(text, Style::default().fg(color)))
        })
        .collect();
    frame.render_widget(Paragraph::new(footer_lines), layout.footer);

    if let Some(toast) = &app.toast {
        let widget = Toast {
            ack: &toast.ack,
            theme: app.theme,
        };
        let toast_area = widget.area(area);
        frame.render_widget(widget, toast_area);
    }

    if let Some(input) = &app.goto_input {
        let popup = centered_rect(30, 10, area);
        let (before, after) = input.render_parts();
        let line = Line::from(vec![
            Span::styled(before.to_string(), Style::default().fg(colors.fg())),
            Span::styled("█", Style::default().fg(colors.accent())),
            Span::styled(after.to_string(), Style::default().fg(colors.fg())),
        ]);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(line).block(
                Block::bordered()
                    .title(format!(" {} (1-{}) ", t!("goto.prompt"), app.navigator.item_count()))
                    .border_style(Style::default().fg(colors.border_focused()))
                    .style(Style::default().bg(colors.header_bg())),
            ),
            popup,
        );
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let screen = match app.screen {
        AppScreen::Overview => t!("screen.overview"),
        AppScreen::Session => t!("screen.session"),
        AppScreen::History => t!("screen.history"),
    };
    let today = Progress::compute(&app.queues.today.items, &app.clock());
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", t!("app.title")),
            Style::default()
                .fg(colors.header_fg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("· {screen}"), Style::default().fg(colors.accent())),
        Span::styled(
            format!(
                "   {} {}/{}",
                labels::section(QueueKind::Today),
                today.completed_today,
                today.total
            ),
            Style::default().fg(colors.text_muted()),
        ),
        Span::styled(
            format!(
                "   {} {}",
                labels::section(QueueKind::Overdue),
                app.queues.overdue.items.len()
            ),
            Style::default().fg(colors.status_overdue()),
        ),
    ]))
    .block(
        Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.header_bg())),
    );
    frame.render_widget(header, area);
}

fn render_overview(frame: &mut Frame, app: &App, layout: &AppLayout) {
    let now = app.clock().now;
    let constraints = if layout.tier.show_progress_bar(layout.main.height) {
        vec![Constraint::Length(3), Constraint::Min(3)]
    } else {
        vec![Constraint::Length(0), Constraint::Min(3)]
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(layout.main);

    if rows[0].height > 0 {
        let progress = Progress::compute(&app.queues.today.items, &app.clock());
        ProgressBar::new(&t!("progress.label"), progress, app.theme).render(rows[0], frame.buffer_mut());
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(rows[1]);
    for (i, kind) in QueueKind::ALL.into_iter().enumerate() {
        let focused = kind == app.overview_section;
        let list = QueueList {
            title: labels::section(kind),
            section: app.queues.section(kind),
            selected: focused.then_some(app.overview_selected),
            now,
            focused,
            theme: app.theme,
        };
        frame.render_widget(list, columns[i]);
    }

    if let Some(sidebar) = layout.sidebar {
        render_detail(frame, app, sidebar);
    }
}

/// Selected row of the overview list, shown fully in the sidebar.
fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let block = Block::bordered().border_style(Style::default().fg(colors.border()));
    let Some(item) = app.overview_items().get(app.overview_selected) else {
        frame.render_widget(block, area);
        return;
    };
    let mut lines = vec![
        Line::from(Span::styled(
            item.title
                .clone()
                .unwrap_or_else(|| labels::item_type(item.item_type)),
            Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            labels::last_review(&item.last_review(&app.clock())),
            Style::default().fg(colors.text_muted()),
        )),
        Line::from(""),
    ];
    lines.extend(
        item.content
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(colors.fg())))),
    );
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(ratatui::widgets::Wrap { trim: false })
            .block(block),
        area,
    );
}

fn render_session(frame: &mut Frame, app: &App, layout: &AppLayout) {
    let clock = app.clock();
    let now = clock.now;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(6)])
        .split(layout.main);

    let progress = app.session_progress();
    ProgressBar::new(&labels::section(app.scope.kind()), progress, app.theme)
        .render(rows[0], frame.buffer_mut());

    let card = match app.focused_item() {
        Some(item) => Flashcard {
            item: Some(item),
            card: app.card,
            position: app.navigator.index(),
            item_count: app.navigator.item_count(),
            clock,
            submitting: app.protocol.submitting_item() == Some(item.id),
            scroll: app.navigator.content_scroll,
            theme: app.theme,
        },
        None => Flashcard::start(app.navigator.item_count(), clock, app.theme),
    };
    frame.render_widget(card, rows[1]);

    if let Some(sidebar) = layout.sidebar {
        let list = QueueList {
            title: labels::section(app.scope.kind()),
            section: app.queues.section(app.scope.kind()),
            selected: app.navigator.focused_item(),
            now,
            focused: false,
            theme: app.theme,
        };
        frame.render_widget(list, sidebar);
    }
}

fn render_history(frame: &mut Frame, app: &App, layout: &AppLayout) {
    let area = match layout.sidebar {
        Some(sidebar) => Rect {
            width: layout.main.width + sidebar.width,
            ..layout.main
        },
        None => layout.main,
    };
    let view = HistoryView {
        browser: &app.history,
        clock: app.clock(),
        page_window: app.config.page_window,
        theme: app.theme,
    };
    frame.render_widget(view, area);
}

fn footer_hints(app: &App) -> Vec<String> {
    let keys: Vec<&str> = match app.screen {
        AppScreen::Overview => {
            let mut keys = vec!["hint.tab", "hint.select", "hint.start"];
            match app.overview_section {
                QueueKind::Today => keys.push("hint.complete"),
                QueueKind::Overdue => keys.extend(["hint.complete", "hint.postpone"]),
                QueueKind::Completed => {}
            }
            keys.extend(["hint.refresh", "hint.history", "hint.quit"]);
            keys
        }
        AppScreen::Session if app.goto_input.is_some() => Vec::new(),
        AppScreen::Session => {
            let ctx = app.key_context();
            let mut keys = vec!["hint.navigate", "hint.scroll"];
            if ctx.on_item && !ctx.item_completed {
                match app.card.stage {
                    crate::session::flashcard::Stage::Recall => keys.push("hint.reveal"),
                    crate::session::flashcard::Stage::Revealed => {
                        keys.push("hint.assess");
                        if ctx.has_assessment {
                            keys.push("hint.submit");
                        }
                    }
                }
            }
            if app.scope.kind() == QueueKind::Overdue {
                keys.push("hint.postpone");
            }
            keys.extend(["hint.goto", "hint.back"]);
            keys
        }
        AppScreen::History => {
            let mut keys = vec!["hint.select", "hint.expand"];
            if app.history.mode == HistoryMode::Paged {
                keys.push("hint.page");
            }
            keys.extend(["hint.filter", "hint.mode", "hint.back"]);
            keys
        }
    };
    keys.into_iter().map(|key| t!(key).into_owned()).collect()
}
