//! Price Display Port - Where Price Cells Are Written
//!
//! The renderer decides *whether* a cell changes; the display only applies
//! the write. Implementations must be cheap: they are called from the
//! supervisor's event loop.

use crate::domain::keys::RowId;

pub trait PriceDisplay: Send + Sync + 'static {
    /// Replace the text of `row`'s price cell.
    fn write_price(&self, row: &RowId, text: &str);

    /// Remove a row that is no longer displayed.
    fn remove_row(&self, row: &RowId);
}
