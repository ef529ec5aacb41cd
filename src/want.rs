//! Want-list resolution: path filters to uncompressed byte ranges.
//!
//! A filter names a member or a directory. It matches a file-index entry
//! when it is a prefix of the entry's name that ends at the end of the
//! name or right before a `/`, so `a/b` selects `a/b` and everything under
//! `a/b/`, but not `a/bc`.

use crate::error::{ExtractError, Result};
use crate::file_index::FileIndex;
use std::sync::Arc;
use tracing::debug;

/// A wanted span of the uncompressed stream, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WantedRange {
    pub name: String,
    pub start: u64,
    pub end: u64,
}

impl WantedRange {
    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Wanted ranges in file-index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WantList {
    ranges: Vec<WantedRange>,
    filtering: bool,
}

impl WantList {
    /// Want the whole stream with no trimming.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Resolve `specs` against the file index.
    ///
    /// With no specs every entry is listed but filtering stays off, so
    /// consumers pass whole blocks through. Fails with
    /// [`ExtractError::UnsupportedFilter`] when specs are given without an
    /// index, and with [`ExtractError::NotFound`] naming the first spec
    /// that matched nothing.
    pub fn resolve<S: AsRef<str>>(specs: &[S], index: Option<&FileIndex>) -> Result<Self> {
        let Some(index) = index else {
            if !specs.is_empty() {
                return Err(ExtractError::UnsupportedFilter);
            }
            return Ok(Self::everything());
        };

        let specs: Vec<&str> = specs
            .iter()
            .map(|spec| spec.as_ref().trim_end_matches('/'))
            .collect();
        let mut matched = vec![false; specs.len()];
        let mut ranges = Vec::new();

        for (entry, start, end) in index.iter_ranges() {
            let mut want = specs.is_empty();
            if let Some(i) = specs
                .iter()
                .position(|spec| spec_match(spec.as_bytes(), entry.name.as_bytes()))
            {
                matched[i] = true;
                want = true;
            }

            if want {
                debug!(name = %entry.name, start, end, "want");
                ranges.push(WantedRange {
                    name: entry.name.clone(),
                    start,
                    end,
                });
            }
        }

        if let Some(i) = matched.iter().position(|&m| !m) {
            return Err(ExtractError::NotFound(specs[i].to_string()));
        }

        Ok(Self {
            ranges,
            filtering: !specs.is_empty(),
        })
    }

    pub fn ranges(&self) -> &[WantedRange] {
        &self.ranges
    }

    /// Whether consumers trim to the wanted ranges.
    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    /// Total bytes covered by the wanted ranges.
    pub fn total_size(&self) -> u64 {
        self.ranges.iter().map(WantedRange::size).sum()
    }

    /// A fresh forward-only cursor over the ranges.
    pub fn cursor(self: &Arc<Self>) -> WantCursor {
        let mut cursor = WantCursor {
            list: Arc::clone(self),
            pos: 0,
        };
        cursor.skip_empty();
        cursor
    }
}

/// Does `spec` select `name`?
pub fn spec_match(spec: &[u8], name: &[u8]) -> bool {
    match name.strip_prefix(spec) {
        Some(rest) => rest.first().map_or(true, |&c| c == b'/'),
        None => false,
    }
}

/// Forward-only position in a [`WantList`].
///
/// Empty ranges carry no bytes and are stepped over, so `current` is
/// always a range with data or `None`.
#[derive(Debug, Clone)]
pub struct WantCursor {
    list: Arc<WantList>,
    pos: usize,
}

impl WantCursor {
    pub fn is_filtering(&self) -> bool {
        self.list.filtering
    }

    pub fn current(&self) -> Option<&WantedRange> {
        self.list.ranges.get(self.pos)
    }

    /// Mark the current range consumed.
    pub fn advance(&mut self) {
        if self.pos < self.list.ranges.len() {
            self.pos += 1;
        }
        self.skip_empty();
    }

    /// Move past every range that ends at or before `offset`.
    pub fn skip_ending_by(&mut self, offset: u64) {
        while self.current().is_some_and(|range| range.end <= offset) {
            self.advance();
        }
    }

    fn skip_empty(&mut self) {
        while self.current().is_some_and(WantedRange::is_empty) {
            self.pos += 1;
        }
    }
}
