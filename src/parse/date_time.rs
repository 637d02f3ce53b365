use chrono::{offset::Utc, DateTime, NaiveDate};
use std::fmt;
use winnow::{binary::le_u16, seq, PResult, Parser};

use crate::error::Warning;

/// A timestamp in MS-DOS format
///
/// Represents dates from year 1980 to 2107, with 2 second precision.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Default)]
pub struct MsdosTimestamp {
    /// Time in 2-second intervals
    pub time: u16,

    /// Date in MS-DOS format, cf. <https://docs.microsoft.com/en-us/windows/win32/api/winbase/nf-winbase-dosdatetimetofiletime>
    pub date: u16,
}

/// The unpacked components of an [MsdosTimestamp], each in its valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DosDateTime {
    /// 1980 to 2107
    pub year: u16,
    /// 1 to 12
    pub month: u8,
    /// 1 to 31
    pub day: u8,
    /// 0 to 23
    pub hour: u8,
    /// 0 to 59
    pub minute: u8,
    /// 0 to 58, always even
    pub second: u8,
}

impl fmt::Debug for MsdosTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.components() {
            Ok(c) => write!(
                f,
                "MsdosTimestamp({:04}-{:02}-{:02} {:02}:{:02}:{:02})",
                c.year, c.month, c.day, c.hour, c.minute, c.second
            ),
            Err(_) => write!(f, "MsdosTimestamp(?)"),
        }
    }
}

impl MsdosTimestamp {
    /// Parser for MS-DOS timestamps: time first, then date.
    pub fn parser(i: &mut &'_ [u8]) -> PResult<Self> {
        seq! {Self {
            time: le_u16,
            date: le_u16,
        }}
        .parse_next(i)
    }

    /// Unpacks the date and time fields, rejecting out-of-range components
    /// instead of wrapping them.
    pub fn components(&self) -> Result<DosDateTime, Warning> {
        // bits 0-4: day of the month (1-31)
        let day = (self.date & 0b1_1111) as u8;
        // bits 5-8: month (1 = january, 2 = february and so on)
        let month = ((self.date >> 5) & 0b1111) as u8;
        // bits 9-15: year offset from 1980
        let year = (self.date >> 9) + 1980;

        // bits 0-4: second divided by 2
        let second = (self.time & 0b1_1111) as u8 * 2;
        // bits 5-10: minute (0-59)
        let minute = ((self.time >> 5) & 0b11_1111) as u8;
        // bits 11-15: hour (0-23 on a 24-hour clock)
        let hour = (self.time >> 11) as u8;

        if !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 23
            || minute > 59
            || second > 58
        {
            return Err(Warning::InvalidTimestamp {
                time: self.time,
                date: self.date,
            });
        }

        Ok(DosDateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Packs date and time components. Returns `None` if any component is
    /// outside the range MS-DOS timestamps can represent. Odd seconds are
    /// rounded down.
    pub fn from_components(c: &DosDateTime) -> Option<Self> {
        if !(1980..=2107).contains(&c.year)
            || !(1..=12).contains(&c.month)
            || !(1..=31).contains(&c.day)
            || c.hour > 23
            || c.minute > 59
            || c.second > 59
        {
            return None;
        }

        let date = ((c.year - 1980) << 9) | ((c.month as u16) << 5) | c.day as u16;
        let time = ((c.hour as u16) << 11) | ((c.minute as u16) << 5) | (c.second as u16 / 2);
        Some(Self { time, date })
    }

    /// Attempts to convert to a chrono UTC date time. This fails for invalid
    /// components, but also for calendar-invalid dates like February 30th.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let c = self.components().ok()?;
        let naive = NaiveDate::from_ymd_opt(c.year as i32, c.month as u32, c.day as u32)?
            .and_hms_opt(c.hour as u32, c.minute as u32, c.second as u32)?;
        Some(naive.and_utc())
    }
}

pub(crate) fn zero_datetime() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}
