use serde::{Deserialize, Serialize};

/// Output of the offer/reminder rule engine for one entity. `action` is the
/// offer label (a message-template identifier) or None when no offer fired.
/// Ephemeral: consumed by the messaging dispatcher, never persisted here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfferDecision {
    pub entity_id: i64,
    pub action: Option<String>,
    pub reason: String,
}

impl OfferDecision {
    pub fn is_no_offer(&self) -> bool {
        self.action.is_none()
    }
}
