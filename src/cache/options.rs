//! Per-call options for cache operations.

use std::time::Duration;

/// Expiration applied by `PutOptions::default()` (5 minutes, absolute).
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(300);

/// Normalize a region argument: `None` and `""` both mean the default region.
pub(crate) fn region_name(region: Option<&str>) -> &str {
    region.unwrap_or("")
}

/// How long an item lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Fixed deadline at put time + duration.
    Absolute(Duration),
    /// Deadline is duration from the last successful read.
    Sliding(Duration),
}

impl Expiration {
    pub fn duration(&self) -> Duration {
        match self {
            Self::Absolute(d) | Self::Sliding(d) => *d,
        }
    }

    pub fn is_sliding(&self) -> bool {
        matches!(self, Self::Sliding(_))
    }
}

/// Options for `CacheClient::get`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub region: Option<String>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from the given region (builder pattern).
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn region(&self) -> &str {
        region_name(self.region.as_deref())
    }
}

/// Options for `CacheClient::put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub region: Option<String>,
    /// Lifetime of the item.
    pub expiration: Duration,
    /// When true the lifetime restarts on every successful read.
    pub sliding: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            region: None,
            expiration: DEFAULT_EXPIRATION,
            sliding: false,
        }
    }
}

impl PutOptions {
    /// Absolute expiration after `expiration`.
    pub fn new(expiration: Duration) -> Self {
        Self {
            expiration,
            ..Default::default()
        }
    }

    /// Sliding expiration, renewed on every read.
    pub fn sliding(expiration: Duration) -> Self {
        Self {
            expiration,
            sliding: true,
            ..Default::default()
        }
    }

    /// Write into the given region (builder pattern).
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn region(&self) -> &str {
        region_name(self.region.as_deref())
    }

    pub fn policy(&self) -> Expiration {
        if self.sliding {
            Expiration::Sliding(self.expiration)
        } else {
            Expiration::Absolute(self.expiration)
        }
    }
}

/// Options for `CacheClient::remove`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    pub region: Option<String>,
}

impl RemoveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove from the given region (builder pattern).
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn region(&self) -> &str {
        region_name(self.region.as_deref())
    }
}
