use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Timestamp = DateTime<Utc>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    Note,
    Quote,
}

impl ItemType {
    pub fn label(self) -> &'static str {
        match self {
            ItemType::Note => "Note",
            ItemType::Quote => "Quote",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRef {
    pub id: i64,
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRef {
    pub id: i64,
    #[serde(default, alias = "text")]
    pub content: String,
    pub page: Option<u32>,
    pub memo: Option<String>,
}

/// The content a review item points at. `Missing` covers records whose
/// payload is absent or disagrees with `itemType`.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemPayload {
    Note(NoteRef),
    Quote(QuoteRef),
    Missing,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "RawReviewItem")]
pub struct ReviewItem {
    pub id: i64,
    pub review_id: i64,
    pub item_type: ItemType,
    pub item_id: i64,
    pub completed: bool,
    pub completed_time: Option<Timestamp>,
    pub last_review_time: Option<Timestamp>,
    pub review_count: u32,
    pub book_id: Option<i64>,
    pub book_title: Option<String>,
    pub payload: ItemPayload,
}

/// Wire shape: two nullable payload slots next to an `itemType` tag.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReviewItem {
    id: i64,
    review_id: i64,
    item_type: ItemType,
    item_id: i64,
    #[serde(default)]
    completed: bool,
    completed_time: Option<Timestamp>,
    last_review_time: Option<Timestamp>,
    #[serde(default)]
    review_count: u32,
    book_id: Option<i64>,
    book_title: Option<String>,
    note: Option<NoteRef>,
    quote: Option<QuoteRef>,
}

impl From<RawReviewItem> for ReviewItem {
    fn from(raw: RawReviewItem) -> Self {
        let payload = match (raw.item_type, raw.note, raw.quote) {
            (ItemType::Note, Some(note), _) => ItemPayload::Note(note),
            (ItemType::Quote, _, Some(quote)) => ItemPayload::Quote(quote),
            _ => ItemPayload::Missing,
        };
        Self {
            id: raw.id,
            review_id: raw.review_id,
            item_type: raw.item_type,
            item_id: raw.item_id,
            completed: raw.completed,
            completed_time: raw.completed_time,
            last_review_time: raw.last_review_time,
            review_count: raw.review_count,
            book_id: raw.book_id,
            book_title: raw.book_title,
            payload,
        }
    }
}

impl ReviewItem {
    /// Bare item with no payload attached. Used to build fixtures.
    pub fn new(id: i64, review_id: i64, item_type: ItemType, item_id: i64) -> Self {
        Self {
            id,
            review_id,
            item_type,
            item_id,
            completed: false,
            completed_time: None,
            last_review_time: None,
            review_count: 0,
            book_id: None,
            book_title: None,
            payload: ItemPayload::Missing,
        }
    }

    pub fn note(id: i64, review_id: i64, note: NoteRef) -> Self {
        let mut item = Self::new(id, review_id, ItemType::Note, note.id);
        item.payload = ItemPayload::Note(note);
        item
    }

    pub fn quote(id: i64, review_id: i64, quote: QuoteRef) -> Self {
        let mut item = Self::new(id, review_id, ItemType::Quote, quote.id);
        item.payload = ItemPayload::Quote(quote);
        item
    }

    pub fn with_book(mut self, book_id: i64, title: &str) -> Self {
        self.book_id = Some(book_id);
        self.book_title = Some(title.to_string());
        self
    }

    pub fn completed_at(mut self, at: Timestamp) -> Self {
        self.completed = true;
        self.completed_time = Some(at);
        self.last_review_time = Some(at);
        self.review_count += 1;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSession {
    pub id: i64,
    pub planned_time: Timestamp,
    pub completed_time: Option<Timestamp>,
    #[serde(default)]
    pub items: Vec<ReviewItem>,
}

/// Overdue records arrive flat: item fields plus the session's planned time.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueEntry {
    pub planned_time: Timestamp,
    #[serde(default)]
    pub postpone_count: u32,
    #[serde(flatten)]
    pub item: ReviewItem,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    #[serde(default)]
    pub content: Vec<ReviewSession>,
    #[serde(default, alias = "page")]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub last: bool,
}

impl HistoryPage {
    /// Completed items of every session on the page, in arrival order.
    pub fn completed_items(&self) -> impl Iterator<Item = (&ReviewSession, &ReviewItem)> {
        self.content.iter().flat_map(|session| {
            session
                .items
                .iter()
                .filter(|item| item.completed)
                .map(move |item| (session, item))
        })
    }

    pub fn is_final(&self) -> bool {
        self.last || self.content.is_empty()
    }
}

/// Self-reported recall difficulty, chosen after the card is revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Assessment {
    Forgot,
    Hard,
    Easy,
}

impl Assessment {
    pub const ALL: [Assessment; 3] = [Assessment::Forgot, Assessment::Hard, Assessment::Easy];

    pub fn as_str(self) -> &'static str {
        match self {
            Assessment::Forgot => "forgot",
            Assessment::Hard => "hard",
            Assessment::Easy => "easy",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseCode {
    Forgot,
    Difficult,
    Normal,
    Easy,
}

impl ResponseCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseCode::Forgot => "FORGOT",
            ResponseCode::Difficult => "DIFFICULT",
            ResponseCode::Normal => "NORMAL",
            ResponseCode::Easy => "EASY",
        }
    }
}

impl From<Option<Assessment>> for ResponseCode {
    fn from(assessment: Option<Assessment>) -> Self {
        match assessment {
            Some(Assessment::Forgot) => ResponseCode::Forgot,
            Some(Assessment::Hard) => ResponseCode::Difficult,
            Some(Assessment::Easy) => ResponseCode::Easy,
            None => ResponseCode::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_payload_resolved_from_item_type() {
        let json = r#"{
            "id": 7, "reviewId": 3, "itemType": "NOTE", "itemId": 41,
            "completed": false, "reviewCount": 2, "bookTitle": "Dune",
            "note": { "id": 41, "title": "Spice", "content": "fear is the mind-killer", "tags": ["litany"] },
            "quote": null
        }"#;
        let item: ReviewItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.item_type, ItemType::Note);
        assert_eq!(item.review_count, 2);
        match item.payload {
            ItemPayload::Note(ref note) => {
                assert_eq!(note.content, "fear is the mind-killer");
                assert_eq!(note.tags, vec!["litany".to_string()]);
            }
            ref other => panic!("expected note payload, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_mismatching_type_is_missing() {
        let json = r#"{
            "id": 1, "reviewId": 1, "itemType": "QUOTE", "itemId": 9,
            "note": { "id": 9, "content": "wrong slot" }
        }"#;
        let item: ReviewItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.payload, ItemPayload::Missing);
        assert!(!item.completed);
        assert_eq!(item.review_count, 0);
    }

    #[test]
    fn test_quote_accepts_text_alias() {
        let json = r#"{ "id": 2, "text": "call me Ishmael", "page": 1 }"#;
        let quote: QuoteRef = serde_json::from_str(json).unwrap();
        assert_eq!(quote.content, "call me Ishmael");
        assert_eq!(quote.page, Some(1));
    }

    #[test]
    fn test_overdue_entry_flattens_item_fields() {
        let json = r#"{
            "id": 5, "reviewId": 2, "itemType": "QUOTE", "itemId": 8,
            "plannedTime": "2026-10-10T09:00:00Z", "postponeCount": 2,
            "quote": { "id": 8, "content": "so it goes" }
        }"#;
        let entry: OverdueEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.postpone_count, 2);
        assert_eq!(entry.item.id, 5);
        assert!(matches!(entry.item.payload, ItemPayload::Quote(_)));
    }

    #[test]
    fn test_history_page_final_when_last_or_empty() {
        let empty: HistoryPage = serde_json::from_str(r#"{ "content": [], "number": 3 }"#).unwrap();
        assert!(empty.is_final());

        let json = r#"{
            "content": [{ "id": 1, "plannedTime": "2026-10-01T00:00:00Z", "items": [] }],
            "number": 0, "size": 1, "totalPages": 2, "last": false
        }"#;
        let page: HistoryPage = serde_json::from_str(json).unwrap();
        assert!(!page.is_final());
    }

    #[test]
    fn test_response_code_mapping() {
        assert_eq!(ResponseCode::from(Some(Assessment::Forgot)), ResponseCode::Forgot);
        assert_eq!(ResponseCode::from(Some(Assessment::Hard)), ResponseCode::Difficult);
        assert_eq!(ResponseCode::from(Some(Assessment::Easy)), ResponseCode::Easy);
        assert_eq!(ResponseCode::from(None), ResponseCode::Normal);
        assert_eq!(
            serde_json::to_string(&ResponseCode::Difficult).unwrap(),
            "\"DIFFICULT\""
        );
    }
}
