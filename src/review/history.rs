use std::collections::{HashMap, HashSet};
use std::ops::Range;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::api::BackendError;
use crate::review::classify::{self, UiReviewItem};
use crate::review::clock::ReviewClock;
use crate::review::model::{HistoryPage, ItemType, Timestamp};
use crate::review::queue::LoadState;

/// Completed items sharing one local calendar date.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryBucket {
    pub date: NaiveDate,
    pub latest: Timestamp,
    pub items: Vec<UiReviewItem>,
}

/// Buckets by the local date of `lastReviewTime ?? completedTime`, newest
/// bucket first. Items keep arrival order inside a bucket; no intra-day
/// chronology is implied.
pub fn group_by_date(items: &[UiReviewItem], clock: &ReviewClock) -> Vec<HistoryBucket> {
    let mut buckets: Vec<HistoryBucket> = Vec::new();
    let mut by_date: HashMap<NaiveDate, usize> = HashMap::new();

    for item in items {
        let Some(ts) = item.reviewed_at() else {
            debug!("history item {} has no review timestamp, skipped", item.id);
            continue;
        };
        let date = clock.day_of(ts);
        match by_date.get(&date) {
            Some(&idx) => {
                let bucket = &mut buckets[idx];
                bucket.latest = bucket.latest.max(ts);
                bucket.items.push(item.clone());
            }
            None => {
                by_date.insert(date, buckets.len());
                buckets.push(HistoryBucket {
                    date,
                    latest: ts,
                    items: vec![item.clone()],
                });
            }
        }
    }

    buckets.sort_by(|a, b| b.latest.cmp(&a.latest).then_with(|| b.date.cmp(&a.date)));
    buckets
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryFilter {
    #[default]
    All,
    Notes,
    Quotes,
}

impl HistoryFilter {
    pub fn matches(self, item: &UiReviewItem) -> bool {
        match self {
            HistoryFilter::All => true,
            HistoryFilter::Notes => item.item_type == ItemType::Note,
            HistoryFilter::Quotes => item.item_type == ItemType::Quote,
        }
    }

    pub fn next(self) -> Self {
        match self {
            HistoryFilter::All => HistoryFilter::Notes,
            HistoryFilter::Notes => HistoryFilter::Quotes,
            HistoryFilter::Quotes => HistoryFilter::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HistoryFilter::All => "all",
            HistoryFilter::Notes => "notes",
            HistoryFilter::Quotes => "quotes",
        }
    }
}

/// Which buckets are open. Only the first non-empty computation opens a
/// bucket on its own; later recomputations leave user choices alone.
#[derive(Clone, Debug, Default)]
pub struct ExpandState {
    expanded: HashSet<NaiveDate>,
    initialized: bool,
}

impl ExpandState {
    pub fn sync(&mut self, buckets: &[HistoryBucket]) {
        if self.initialized {
            return;
        }
        if let Some(first) = buckets.first() {
            self.expanded.insert(first.date);
            self.initialized = true;
        }
    }

    pub fn reset(&mut self) {
        self.expanded.clear();
        self.initialized = false;
    }

    pub fn toggle(&mut self, date: NaiveDate) {
        if !self.expanded.remove(&date) {
            self.expanded.insert(date);
        }
    }

    pub fn is_expanded(&self, date: NaiveDate) -> bool {
        self.expanded.contains(&date)
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.len()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    #[default]
    Paged,
    Infinite,
}

impl HistoryMode {
    pub fn toggle(self) -> Self {
        match self {
            HistoryMode::Paged => HistoryMode::Infinite,
            HistoryMode::Infinite => HistoryMode::Paged,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HistoryMode::Paged => "paged",
            HistoryMode::Infinite => "infinite",
        }
    }
}

fn completed_ui_items(page: &HistoryPage) -> Vec<UiReviewItem> {
    page.completed_items()
        .map(|(session, item)| classify::classify(item, Some(session)))
        .collect()
}

/// Discrete pages: only the selected page's items are held.
#[derive(Clone, Debug)]
pub struct PagedHistory {
    pub page: u32,
    pub size: u32,
    pub total_pages: u32,
    pub items: Vec<UiReviewItem>,
    pub state: LoadState,
    requested: Option<u32>,
}

impl PagedHistory {
    pub fn new(size: u32) -> Self {
        Self {
            page: 0,
            size: size.max(1),
            total_pages: 0,
            items: Vec::new(),
            state: LoadState::Idle,
            requested: None,
        }
    }

    pub fn request(&mut self, page: u32) -> Option<u32> {
        let page = if self.total_pages > 0 {
            page.min(self.total_pages - 1)
        } else {
            page
        };
        self.requested = Some(page);
        self.state = LoadState::Loading;
        Some(page)
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn next_page(&mut self) -> Option<u32> {
        if self.has_next() {
            self.request(self.page + 1)
        } else {
            None
        }
    }

    pub fn prev_page(&mut self) -> Option<u32> {
        if self.has_prev() {
            self.request(self.page - 1)
        } else {
            None
        }
    }

    /// Applies a page response. Responses for a page other than the last
    /// one requested are dropped.
    pub fn apply(
        &mut self,
        page: u32,
        result: Result<HistoryPage, BackendError>,
    ) {
        if self.requested != Some(page) {
            debug!("dropping stale history page {page}");
            return;
        }
        self.requested = None;
        match result {
            Ok(data) => {
                self.page = page;
                self.total_pages = data.total_pages;
                self.items = completed_ui_items(&data);
                self.state = LoadState::Ready;
            }
            Err(err) => self.state = LoadState::Failed(err.to_string()),
        }
    }

    /// Page numbers for the pager, at most `width` wide and centred on the
    /// current page where possible.
    pub fn page_window(&self, width: u32) -> Range<u32> {
        let width = width.min(self.total_pages);
        if width == 0 {
            return 0..0;
        }
        let mut start = self.page.saturating_sub(width / 2);
        let mut end = start + width;
        if end > self.total_pages {
            end = self.total_pages;
            start = end - width;
        }
        start..end
    }
}

/// Cumulative pages: every loaded page stays in `items`.
#[derive(Clone, Debug)]
pub struct InfiniteHistory {
    pub size: u32,
    pub next_page: u32,
    pub items: Vec<UiReviewItem>,
    pub exhausted: bool,
    pub state: LoadState,
    in_flight: Option<u32>,
}

impl InfiniteHistory {
    pub fn new(size: u32) -> Self {
        Self {
            size: size.max(1),
            next_page: 0,
            items: Vec::new(),
            exhausted: false,
            state: LoadState::Idle,
            in_flight: None,
        }
    }

    /// Next page to fetch, or `None` when exhausted or a fetch is running.
    pub fn request_next(&mut self) -> Option<u32> {
        if self.exhausted || self.in_flight.is_some() {
            return None;
        }
        self.in_flight = Some(self.next_page);
        self.state = LoadState::Loading;
        Some(self.next_page)
    }

    /// True once the cursor comes within `threshold` rows of the loaded end.
    pub fn should_load_more(&self, selected_row: usize, total_rows: usize, threshold: usize) -> bool {
        !self.exhausted && self.in_flight.is_none() && selected_row + threshold >= total_rows
    }

    pub fn apply(
        &mut self,
        page: u32,
        result: Result<HistoryPage, BackendError>,
    ) {
        if self.in_flight != Some(page) {
            debug!("dropping unexpected history page {page}");
            return;
        }
        self.in_flight = None;
        match result {
            Ok(data) => {
                self.items.extend(completed_ui_items(&data));
                self.next_page = page + 1;
                self.exhausted = data.is_final();
                self.state = LoadState::Ready;
            }
            Err(err) => self.state = LoadState::Failed(err.to_string()),
        }
    }
}

/// A selectable line in the history list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryRow {
    Bucket(usize),
    Item(usize, usize),
}

pub fn visible_rows(buckets: &[HistoryBucket], expand: &ExpandState) -> Vec<HistoryRow> {
    let mut rows = Vec::new();
    for (b, bucket) in buckets.iter().enumerate() {
        rows.push(HistoryRow::Bucket(b));
        if expand.is_expanded(bucket.date) {
            rows.extend((0..bucket.items.len()).map(|i| HistoryRow::Item(b, i)));
        }
    }
    rows
}

/// History screen state: both pagination strategies share one grouping path.
#[derive(Clone, Debug)]
pub struct HistoryBrowser {
    pub mode: HistoryMode,
    pub paged: PagedHistory,
    pub infinite: InfiniteHistory,
    pub expand: ExpandState,
    pub filter: HistoryFilter,
    pub selected: usize,
}

impl HistoryBrowser {
    pub fn new(mode: HistoryMode, page_size: u32) -> Self {
        Self {
            mode,
            paged: PagedHistory::new(page_size),
            infinite: InfiniteHistory::new(page_size),
            expand: ExpandState::default(),
            filter: HistoryFilter::All,
            selected: 0,
        }
    }

    pub fn items(&self) -> &[UiReviewItem] {
        match self.mode {
            HistoryMode::Paged => &self.paged.items,
            HistoryMode::Infinite => &self.infinite.items,
        }
    }

    pub fn state(&self) -> &LoadState {
        match self.mode {
            HistoryMode::Paged => &self.paged.state,
            HistoryMode::Infinite => &self.infinite.state,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.paged.size
    }

    pub fn buckets(&self, clock: &ReviewClock) -> Vec<HistoryBucket> {
        let filtered: Vec<UiReviewItem> = self
            .items()
            .iter()
            .filter(|item| self.filter.matches(item))
            .cloned()
            .collect();
        group_by_date(&filtered, clock)
    }

    pub fn rows(&self, clock: &ReviewClock) -> (Vec<HistoryBucket>, Vec<HistoryRow>) {
        let buckets = self.buckets(clock);
        let rows = visible_rows(&buckets, &self.expand);
        (buckets, rows)
    }

    /// First request for the current mode.
    pub fn start(&mut self) -> Option<u32> {
        match self.mode {
            HistoryMode::Paged => self.paged.request(self.paged.page),
            HistoryMode::Infinite => self.infinite.request_next(),
        }
    }

    /// Switching strategy is a fresh load: both sides reset and the expand
    /// state starts over.
    pub fn set_mode(&mut self, mode: HistoryMode) -> Option<u32> {
        let size = self.page_size();
        self.mode = mode;
        self.paged = PagedHistory::new(size);
        self.infinite = InfiniteHistory::new(size);
        self.expand.reset();
        self.selected = 0;
        self.start()
    }

    pub fn apply(
        &mut self,
        mode: HistoryMode,
        page: u32,
        result: Result<HistoryPage, BackendError>,
        clock: &ReviewClock,
    ) {
        if mode != self.mode {
            debug!("dropping {} history page after mode switch", mode.as_str());
            return;
        }
        match mode {
            HistoryMode::Paged => {
                let page_changed = page != self.paged.page;
                self.paged.apply(page, result);
                if page_changed {
                    self.selected = 0;
                }
            }
            HistoryMode::Infinite => self.infinite.apply(page, result),
        }
        let buckets = self.buckets(clock);
        self.expand.sync(&buckets);
        self.clamp_selection(clock);
    }

    pub fn cycle_filter(&mut self, clock: &ReviewClock) {
        self.filter = self.filter.next();
        let buckets = self.buckets(clock);
        self.expand.sync(&buckets);
        self.clamp_selection(clock);
    }

    pub fn toggle_selected(&mut self, clock: &ReviewClock) {
        let (buckets, rows) = self.rows(clock);
        let target = match rows.get(self.selected) {
            Some(HistoryRow::Bucket(b)) | Some(HistoryRow::Item(b, _)) => buckets[*b].date,
            None => return,
        };
        self.expand.toggle(target);
        // Collapsing from an item row moves the cursor onto its header.
        let rows = visible_rows(&buckets, &self.expand);
        if let Some(pos) = rows.iter().position(
            |row| matches!(row, HistoryRow::Bucket(b) if buckets[*b].date == target),
        ) && self.selected > pos
            && !self.expand.is_expanded(target)
        {
            self.selected = pos;
        }
    }

    pub fn move_selection(&mut self, delta: isize, clock: &ReviewClock) {
        let (_, rows) = self.rows(clock);
        if rows.is_empty() {
            self.selected = 0;
            return;
        }
        let max = rows.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(max);
    }

    /// Infinite mode only: the next page to fetch if the cursor is close to
    /// the end of what is loaded.
    pub fn load_more(&mut self, threshold: usize, clock: &ReviewClock) -> Option<u32> {
        if self.mode != HistoryMode::Infinite {
            return None;
        }
        let (_, rows) = self.rows(clock);
        if self
            .infinite
            .should_load_more(self.selected, rows.len(), threshold)
        {
            self.infinite.request_next()
        } else {
            None
        }
    }

    fn clamp_selection(&mut self, clock: &ReviewClock) {
        let (_, rows) = self.rows(clock);
        self.selected = self.selected.min(rows.len().saturating_sub(1));
    }
}
