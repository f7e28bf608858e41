//! Client-side views derived from the record cache.

use std::fmt;
use std::str::FromStr;

use crate::resource::Resource;

/// Status filter for the visible list. Never sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter<S> {
    #[default]
    All,
    Only(S),
}

impl<S: PartialEq> StatusFilter<S> {
    pub fn matches(&self, status: &S) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

impl<S: FromStr> FromStr for StatusFilter<S> {
    type Err = S::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl<S: fmt::Display> fmt::Display for StatusFilter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(status) => status.fmt(f),
        }
    }
}

/// Records passing `filter`, in cache order.
pub fn visible<'a, R: Resource>(
    records: &'a [R::Record],
    filter: &StatusFilter<R::Status>,
) -> Vec<&'a R::Record> {
    records
        .iter()
        .filter(|record| filter.matches(&R::status(record)))
        .collect()
}

/// Per-status counts, always tallied from a record list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCounts<S> {
    total: usize,
    by_status: Vec<(S, usize)>,
}

impl<S: Copy + Eq + 'static> StatusCounts<S> {
    pub fn tally<R: Resource<Status = S>>(records: &[R::Record]) -> Self {
        let by_status = R::statuses()
            .iter()
            .map(|&status| {
                let n = records.iter().filter(|r| R::status(r) == status).count();
                (status, n)
            })
            .collect();

        Self {
            total: records.len(),
            by_status,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn get(&self, status: S) -> usize {
        self.by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (S, usize)> + '_ {
        self.by_status.iter().copied()
    }
}

impl<S: fmt::Display> fmt::Display for StatusCounts<S> {
    /// `3 total (1 pending, 2 approved, 0 rejected)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .by_status
            .iter()
            .map(|(status, n)| format!("{} {}", n, status))
            .collect();
        write!(f, "{} total ({})", self.total, parts.join(", "))
    }
}
