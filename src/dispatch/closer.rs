use rusqlite::Transaction;
use tracing::debug;

use crate::error::DispatchError;
use crate::store::offers;

/// Foreclose every still-PENDING sibling in the group.
///
/// Takes the open acceptance transaction: closing a group without a winner
/// would strand the job, so there is no standalone entry point.
pub(crate) fn close_remaining_offers(
    tx: &Transaction<'_>,
    offer_group: &str,
) -> Result<usize, DispatchError> {
    let closed = offers::close_pending(tx, offer_group)?;
    debug!(offer_group, closed, "sibling offers closed");
    Ok(closed)
}
