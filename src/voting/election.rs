use std::fmt::{self, Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::id::Id;
use super::window::{ElectionWindow, EndComparison, WindowState};
use crate::error::{self, ValidationError};

const NAME_LIMITS: RangeInclusive<usize> = 1..=300;
const SLUG_LIMITS: RangeInclusive<usize> = 3..=64;

/// Who may look at an election before membership is established.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Publicity {
    /// Commissioners only.
    Private,
    /// Registered voters and commissioners.
    Voter,
    /// Anyone.
    Public,
}

impl Publicity {
    #[cfg(test)]
    pub const ALL: [Publicity; 3] = [Publicity::Private, Publicity::Voter, Publicity::Public];

    pub fn as_str(&self) -> &'static str {
        match self {
            Publicity::Private => "PRIVATE",
            Publicity::Voter => "VOTER",
            Publicity::Public => "PUBLIC",
        }
    }
}

impl Display for Publicity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Publicity {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRIVATE" => Ok(Publicity::Private),
            "VOTER" => Ok(Publicity::Voter),
            "PUBLIC" => Ok(Publicity::Public),
            other => Err(error::publicity_unknown(other)),
        }
    }
}

impl<'de> Deserialize<'de> for Publicity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Election {
    pub id: Id,
    pub slug: String,
    pub name: String,
    pub window: ElectionWindow,
    pub publicity: Publicity,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Election {
    pub fn new(settings: CreateElectionSettings, now: DateTime<Utc>) -> Election {
        let CreateElectionSettings { slug, name, window, publicity } = settings;
        Election {
            id: Id::new(),
            slug,
            name,
            window,
            publicity,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_ongoing<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.window.is_ongoing(now)
    }

    pub fn is_ended<Tz: TimeZone>(&self, now: &DateTime<Tz>, comparison: EndComparison) -> bool {
        self.window.is_ended(now, comparison)
    }

    pub fn state<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> WindowState {
        self.window.state(now)
    }

    /// Merges a partial update into this election, re-validating the result.
    pub fn apply(&self, update: UpdateElectionSettings, now: DateTime<Utc>) -> Result<Election, ValidationError> {
        let UpdateElectionSettings { name, start_date, end_date, publicity } = update;

        let name = match name {
            Some(name) => validate_name(name)?,
            None => self.name.clone(),
        };
        let window = ElectionWindow::new(
            start_date.unwrap_or(self.window.start()),
            end_date.unwrap_or(self.window.end()),
        )?;
        let publicity = match publicity {
            Some(publicity) => publicity.parse()?,
            None => self.publicity,
        };

        Ok(Election {
            name,
            window,
            publicity,
            updated_at: now,
            slug: self.slug.clone(),
            ..*self
        })
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateElectionSettings {
    pub slug: String,
    pub name: String,
    pub window: ElectionWindow,
    pub publicity: Publicity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnvalidatedCreateElectionSettings {
    pub slug: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub publicity: String,
}

impl TryFrom<UnvalidatedCreateElectionSettings> for CreateElectionSettings {
    type Error = ValidationError;
    fn try_from(value: UnvalidatedCreateElectionSettings) -> Result<Self, Self::Error> {
        let UnvalidatedCreateElectionSettings { slug, name, start_date, end_date, publicity } = value;

        Ok(CreateElectionSettings {
            slug: validate_slug(slug)?,
            name: validate_name(name)?,
            window: ElectionWindow::new(start_date, end_date)?,
            publicity: publicity.parse()?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateElectionSettings {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub publicity: Option<String>,
}

pub fn validate_slug(slug: String) -> Result<String, ValidationError> {
    let len = slug.chars().count();
    if !SLUG_LIMITS.contains(&len) {
        return Err(error::election_slug_invalid_size(SLUG_LIMITS, len));
    }

    let allowed = slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !allowed || slug.starts_with('-') || slug.ends_with('-') {
        return Err(error::election_slug_invalid_format(&slug));
    }

    Ok(slug)
}

fn validate_name(name: String) -> Result<String, ValidationError> {
    let name = name.trim().to_string();
    let len = name.chars().count();
    if !NAME_LIMITS.contains(&len) {
        return Err(error::election_name_invalid_size(NAME_LIMITS, len));
    }
    Ok(name)
}
