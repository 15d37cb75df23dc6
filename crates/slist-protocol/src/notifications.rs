//! Notification name constants.
//!
//! Notifications are server-to-client messages with no acknowledgement.
//! Clients listen for these to keep their copy of the list current.

/// All notification names.
pub struct Notifications;

impl Notifications {
    // ── Server lifecycle ────────────────────────────────────────────────
    pub const SERVER_CONNECTED: &str = "server/connected";

    // ── Shopping list items ─────────────────────────────────────────────
    pub const ITEM_DID_CREATE: &str = "shoppingListItem/didCreate";
    pub const ITEM_DID_UPDATE: &str = "shoppingListItem/didUpdate";
    pub const ITEM_DID_DELETE: &str = "shoppingListItem/didDelete";
}

/// Type alias for notification names.
pub type NotificationName = &'static str;
