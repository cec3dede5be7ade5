//! Row Renderer - Price Cells Bound to Lookup Keys
//!
//! Each displayed row is bound to its candidate list (the first candidate
//! is the row's primary key) and, optionally, to a broker scrip code.
//! The board mirrors the text currently shown in every price cell and only
//! emits a [`CellWrite`] when the text would actually change.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::cache::PriceCache;
use super::keys::{LookupKey, RowId};
use super::price::{format_price, PLACEHOLDER};

/// A single price cell update to apply to the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    pub row: RowId,
    pub text: String,
}

/// Association between one displayed row and its price sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBinding {
    /// Row identifier.
    pub id: RowId,
    /// Candidate keys, most preferred first.
    pub candidates: Vec<LookupKey>,
    /// Broker scrip code, once known.
    pub scrip_code: Option<String>,
    /// Text currently displayed; empty until the first write.
    displayed: String,
}

impl RowBinding {
    pub fn new(id: impl Into<RowId>, candidates: Vec<LookupKey>) -> Self {
        Self {
            id: id.into(),
            candidates,
            scrip_code: None,
            displayed: String::new(),
        }
    }

    #[must_use]
    pub fn with_scrip_code(mut self, scrip_code: Option<String>) -> Self {
        self.scrip_code = scrip_code;
        self
    }

    /// First candidate, used as the row's price key.
    pub fn primary(&self) -> Option<&LookupKey> {
        self.candidates.first()
    }

    pub fn displayed(&self) -> &str {
        &self.displayed
    }

    /// True until a real price has been shown.
    pub fn is_unpriced(&self) -> bool {
        self.displayed.is_empty() || self.displayed == PLACEHOLDER
    }

    fn references_any(&self, keys: &HashSet<LookupKey>) -> bool {
        self.candidates.iter().any(|key| keys.contains(key))
    }

    /// Set the displayed text, returning a write only if it changed.
    fn show(&mut self, text: String) -> Option<CellWrite> {
        if self.displayed == text {
            return None;
        }
        self.displayed.clone_from(&text);
        Some(CellWrite {
            row: self.id.clone(),
            text,
        })
    }

    /// Re-read the cache: primary key first, then the rest of the list.
    /// Without any hit, an already-written cell is left untouched.
    fn render(&mut self, cache: &PriceCache) -> Option<CellWrite> {
        let price = self
            .candidates
            .iter()
            .find_map(|key| cache.get(key.as_str()));

        match price {
            Some(price) => self.show(format_price(price)),
            None if self.displayed.is_empty() => self.show(PLACEHOLDER.to_string()),
            None => None,
        }
    }
}

/// All rows currently on screen.
#[derive(Debug, Default)]
pub struct PriceBoard {
    rows: BTreeMap<RowId, RowBinding>,
}

impl PriceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: &str) -> Option<&RowBinding> {
        self.rows.get(id)
    }

    /// Replace every row whose id starts with `scope` by `rows` and render
    /// them once from the cache.
    ///
    /// Returns the writes for new rows and the ids of rows that left.
    pub fn replace_scope(
        &mut self,
        scope: &str,
        rows: Vec<RowBinding>,
        cache: &PriceCache,
    ) -> (Vec<CellWrite>, Vec<RowId>) {
        let incoming: HashSet<&RowId> = rows.iter().map(|row| &row.id).collect();
        let removed: Vec<RowId> = self
            .rows
            .keys()
            .filter(|id| id.starts_with(scope) && !incoming.contains(id))
            .cloned()
            .collect();
        for id in &removed {
            self.rows.remove(id);
        }

        let writes = rows
            .into_iter()
            .filter_map(|row| self.bind(row, cache))
            .collect();
        (writes, removed)
    }

    /// Bind (or rebind) a row and render it once.
    ///
    /// A rebound row keeps the text it is showing, so an unchanged price
    /// produces no write.
    pub fn bind(&mut self, mut row: RowBinding, cache: &PriceCache) -> Option<CellWrite> {
        if let Some(previous) = self.rows.get(&row.id) {
            row.displayed.clone_from(&previous.displayed);
        }
        let write = row.render(cache);
        self.rows.insert(row.id.clone(), row);
        write
    }

    /// Re-render every row that references one of `changed`.
    pub fn refresh(&mut self, cache: &PriceCache, changed: &HashSet<LookupKey>) -> Vec<CellWrite> {
        if changed.is_empty() {
            return Vec::new();
        }
        self.rows
            .values_mut()
            .filter(|row| row.references_any(changed))
            .filter_map(|row| row.render(cache))
            .collect()
    }

    /// Patch every row annotated with `scrip_code`, bypassing the cache.
    pub fn apply_scrip_tick(&mut self, scrip_code: &str, price: Option<f64>) -> Vec<CellWrite> {
        let text = price.map_or_else(|| PLACEHOLDER.to_string(), format_price);
        self.rows
            .values_mut()
            .filter(|row| row.scrip_code.as_deref() == Some(scrip_code))
            .filter_map(|row| row.show(text.clone()))
            .collect()
    }

    /// Attach the result of a scrip-code resolution to a row: the scrip
    /// code (if any) becomes its secondary identifier and `key` is appended
    /// to its candidates. The row is re-rendered from the cache.
    pub fn attach_resolution(
        &mut self,
        id: &str,
        scrip_code: Option<String>,
        key: LookupKey,
        cache: &PriceCache,
    ) -> Option<CellWrite> {
        let row = self.rows.get_mut(id)?;
        if scrip_code.is_some() {
            row.scrip_code = scrip_code;
        }
        if !row.candidates.contains(&key) {
            row.candidates.push(key);
        }
        row.render(cache)
    }

    /// Every key referenced by a displayed row, deduplicated.
    pub fn tracked_keys(&self) -> BTreeSet<LookupKey> {
        self.rows
            .values()
            .flat_map(|row| row.candidates.iter().cloned())
            .collect()
    }

    /// Rows within `scope` that still show no price.
    pub fn unpriced(&self, scope: &str) -> Vec<RowId> {
        self.rows
            .values()
            .filter(|row| row.id.starts_with(scope) && row.is_unpriced())
            .map(|row| row.id.clone())
            .collect()
    }
}
