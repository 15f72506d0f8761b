use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A clock sample truncated to whole-second resolution.
///
/// Two ticks taken within the same second compare equal; the store relies
/// on that to reject the second one as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tick(DateTime<Utc>);

impl Tick {
    /// Current wall-clock time, sub-second part dropped.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(0))
    }

    /// `None` when `secs` is outside chrono's representable range.
    pub fn from_epoch_secs(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// RFC 3339 rendering in the given zone; a zero offset renders as `Z`.
    pub fn present(&self, zone: &PresentationZone) -> String {
        match zone {
            PresentationZone::Fixed(offset) => self
                .0
                .with_timezone(offset)
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            PresentationZone::Named(tz) => self
                .0
                .with_timezone(tz)
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

/// Zone ticks are rendered in on the read path.
///
/// A named IANA zone follows its daylight-saving rules, so the offset shown
/// depends on the instant being rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PresentationZone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl PresentationZone {
    pub fn utc() -> Self {
        Self::Named(Tz::UTC)
    }
}

impl Default for PresentationZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl FromStr for PresentationZone {
    type Err = String;

    /// Accepts `Z`, `±HH:MM` or an IANA name such as `Europe/Berlin`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
            return Ok(Self::utc());
        }
        if let Ok(offset) = s.parse::<FixedOffset>() {
            return Ok(Self::Fixed(offset));
        }
        s.parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| format!("unknown time zone \"{s}\": expected ±HH:MM or an IANA name"))
    }
}

impl fmt::Display for PresentationZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}
