use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Links created without a TTL expire this far in the future.
pub const FOREVER_YEARS: i64 = 100;

pub fn forever_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(365 * FOREVER_YEARS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    pub code: String,
    pub target: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub last_access_at: Option<DateTime<Utc>>,
}

impl ShortLink {
    pub fn new(
        code: impl Into<String>,
        target: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            code: code.into(),
            target: target.into(),
            created_at,
            expires_at,
            access_count: 0,
            last_access_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Created without a TTL (expiry at the forever horizon).
    pub fn never_expires(&self) -> bool {
        self.expires_at - self.created_at >= Duration::days(365 * (FOREVER_YEARS - 1))
    }
}

/// Batched access for one code, produced by the stat workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDelta {
    pub code: String,
    pub count: u64,
    pub last_access_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStats {
    pub code: String,
    pub total_access: u64,
    pub last_access_at: Option<DateTime<Utc>>,
    /// Oldest first, one entry per day, zero-filled
    pub daily: Vec<DailyStat>,
}

/// Codes and targets of every live link, used to warm the filters.
#[derive(Debug, Clone, Default)]
pub struct LiveKeys {
    pub codes: Vec<String>,
    pub targets: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let link = ShortLink::new("abc1234", "https://example.com", now, now);
        assert!(link.is_expired_at(now));
        assert!(!link.is_expired_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_forever_horizon() {
        let now = Utc::now();
        let forever = forever_from(now);
        assert!(forever - now >= Duration::days(365 * 99));

        let link = ShortLink::new("abc1234", "https://example.com", now, forever);
        assert!(link.never_expires());
        let link = ShortLink::new("abc1234", "https://example.com", now, now + Duration::days(30));
        assert!(!link.never_expires());
    }
}
