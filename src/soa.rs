//! SOA value codecs: the RFC 1035 mailbox encoding of `rname`, the
//! `YYYYMMDDnn` serial convention and the SOA record content line.
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};

use crate::error::{Error, Result};

/// Highest change counter a `YYYYMMDDnn` serial can carry for one day.
pub const MAX_DAILY_CHANGES: u8 = 99;

/// A plain mailbox address (`hostmaster@example.com`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    /// Accepts either a plain address or the SOA `rname` form
    /// (`host\.master.example.com.`).
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.contains('@') {
            return Ok(Self(raw.to_string()));
        }
        Self::from_soa_form(raw)
    }

    fn from_soa_form(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidEmail(raw.to_string());

        let mut local = String::new();
        let mut split = None;
        let mut chars = raw.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, '.')) => local.push('.'),
                    Some((_, other)) => {
                        local.push('\\');
                        local.push(other);
                    }
                    None => local.push('\\'),
                },
                '.' => {
                    split = Some(i);
                    break;
                }
                _ => local.push(c),
            }
        }

        let split = split.ok_or_else(invalid)?;
        let domain = raw[split + 1..].trim_end_matches('.');
        if local.is_empty() || domain.is_empty() {
            return Err(invalid());
        }
        Ok(Self(format!("{local}@{domain}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dots in the local part become `\.`, `@` becomes `.`, and the result
    /// is dot-terminated.
    pub fn to_soa_form(&self) -> String {
        match self.0.rsplit_once('@') {
            Some((local, domain)) => format!(
                "{}.{}.",
                local.replace('.', "\\."),
                domain.trim_end_matches('.')
            ),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SOA serial in the `YYYYMMDDnn` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Serial {
    date: NaiveDate,
    change_count: u8,
}

impl Serial {
    /// Fails with [`Error::InvalidSerial`] for a counter above 99 or a
    /// serial that does not fit the 32-bit SOA field.
    pub fn new(date: NaiveDate, change_count: u8) -> Result<Self> {
        let serial = Self { date, change_count };
        if change_count > MAX_DAILY_CHANGES || serial.checked_value().is_none() {
            return Err(Error::InvalidSerial(format!(
                "{}{:02}",
                date.format("%Y%m%d"),
                change_count
            )));
        }
        Ok(serial)
    }

    /// A fresh serial for today with the counter at zero.
    pub fn today() -> Self {
        Self {
            date: Local::now().date_naive(),
            change_count: 0,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidSerial(text.to_string());
        if text.len() != 10 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if text.parse::<u32>().is_err() {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(&text[..8], "%Y%m%d").map_err(|_| invalid())?;
        let change_count = text[8..].parse::<u8>().map_err(|_| invalid())?;
        Ok(Self { date, change_count })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn change_count(&self) -> u8 {
        self.change_count
    }

    /// Numeric value as carried in the SOA record.
    pub fn value(&self) -> Result<u32> {
        self.checked_value()
            .ok_or_else(|| Error::InvalidSerial(self.to_string()))
    }

    fn checked_value(&self) -> Option<u32> {
        let year = u32::try_from(self.date.year()).ok()?;
        year.checked_mul(10_000)?
            .checked_add(self.date.month() * 100 + self.date.day())?
            .checked_mul(100)?
            .checked_add(u32::from(self.change_count))
    }

    /// Successor of this serial as of `today`.
    ///
    /// On `today` the counter is incremented; any other date restarts at
    /// `today` with counter 1. A counter already at 99 fails with
    /// [`Error::SerialExhausted`].
    pub fn next_value(&self, today: NaiveDate) -> Result<Self> {
        if self.date == today {
            if self.change_count >= MAX_DAILY_CHANGES {
                return Err(Error::SerialExhausted(self.to_string()));
            }
            return Ok(Self {
                date: self.date,
                change_count: self.change_count + 1,
            });
        }
        Self::new(today, 1)
    }

    pub fn bump(&mut self) -> Result<()> {
        *self = self.next_value(Local::now().date_naive())?;
        Ok(())
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.date.format("%Y%m%d"), self.change_count)
    }
}

impl FromStr for Serial {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Content of an SOA record:
/// `mname rname serial refresh retry expire minimum`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoaRecord {
    pub mname: String,
    pub rname: Email,
    pub serial: Serial,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl SoaRecord {
    pub fn new(mname: impl Into<String>, rname: Email, serial: Serial) -> Self {
        Self {
            mname: mname.into(),
            rname,
            serial,
            refresh: 86400,
            retry: 7200,
            expire: 604800,
            minimum: 3600,
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let invalid = || Error::InvalidSoa(content.to_string());
        let parts: Vec<&str> = content.split_whitespace().collect();
        let [mname, rname, serial, refresh, retry, expire, minimum] = parts[..] else {
            return Err(invalid());
        };
        let seconds = |field: &str| field.parse::<u32>().map_err(|_| invalid());

        Ok(Self {
            mname: mname.to_string(),
            rname: Email::parse(rname)?,
            serial: Serial::parse(serial)?,
            refresh: seconds(refresh)?,
            retry: seconds(retry)?,
            expire: seconds(expire)?,
            minimum: seconds(minimum)?,
        })
    }

    pub fn to_content(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SoaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname,
            self.rname.to_soa_form(),
            self.serial,
            self.refresh,
            self.retry,
            self.expire,
            self.minimum
        )
    }
}
