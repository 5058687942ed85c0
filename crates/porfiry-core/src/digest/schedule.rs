use crate::error::{PorfiryError, Result};
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Longest DST gap we step over when the configured time does not exist.
const MAX_GAP_MINUTES: i64 = 180;

/// A wall-clock time of day in a fixed IANA timezone, fired once a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    tz: Tz,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32, tz: Tz) -> Result<Self> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            PorfiryError::Schedule(format!("{hour:02}:{minute:02} is not a time of day"))
        })?;
        Ok(Self { at, tz })
    }

    pub fn hour(&self) -> u32 {
        chrono::Timelike::hour(&self.at)
    }

    pub fn minute(&self) -> u32 {
        chrono::Timelike::minute(&self.at)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// The first firing strictly after `now`.
    ///
    /// If the configured time falls into a DST gap on some day, that day fires
    /// at the first valid minute after it. On an ambiguous (repeated) hour the
    /// earlier instant wins.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.tz).date_naive();
        let mut day = today;
        loop {
            if let Some(fire) = self.fire_on(day) {
                if fire > now {
                    return fire;
                }
            }
            day = match day.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => return now + Duration::days(1),
            };
        }
    }

    fn fire_on(&self, day: NaiveDate) -> Option<DateTime<Utc>> {
        let wanted = day.and_time(self.at);
        (0..=MAX_GAP_MINUTES).find_map(|shift| {
            self.tz
                .from_local_datetime(&(wanted + Duration::minutes(shift)))
                .earliest()
                .map(|t| t.with_timezone(&Utc))
        })
    }
}
