//! In-Memory Display - Price Cells Served Over HTTP
//!
//! Holds the text of every bound row's price cell. The health server
//! exposes a snapshot at `/rows`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::domain::keys::RowId;
use crate::ports::display::PriceDisplay;

#[derive(Debug, Default)]
pub struct MemoryDisplay {
    /// Row id → cell text.
    cells: RwLock<BTreeMap<RowId, String>>,
    /// Writes applied since start.
    writes: AtomicU64,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every cell, ordered by row id.
    pub fn snapshot(&self) -> BTreeMap<RowId, String> {
        self.cells
            .read()
            .map(|cells| cells.clone())
            .unwrap_or_default()
    }

    pub fn cell(&self, row: &str) -> Option<String> {
        self.cells.read().ok()?.get(row).cloned()
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl PriceDisplay for MemoryDisplay {
    fn write_price(&self, row: &RowId, text: &str) {
        if let Ok(mut cells) = self.cells.write() {
            cells.insert(row.clone(), text.to_string());
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn remove_row(&self, row: &RowId) {
        if let Ok(mut cells) = self.cells.write() {
            cells.remove(row);
        }
    }
}
