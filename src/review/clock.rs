use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Utc};

/// "Now" plus the offset that decides where calendar days begin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReviewClock {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl ReviewClock {
    pub fn local() -> Self {
        let now = Local::now();
        Self {
            now: now.with_timezone(&Utc),
            offset: *now.offset(),
        }
    }

    pub fn fixed(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self {
            now,
            offset: Utc.fix(),
        }
    }

    pub fn day_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.day_of(self.now)
    }
}
