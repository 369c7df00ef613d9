//! Core domain types for the ticket store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ticket identifier: a random 128-bit token rendered as a string.
///
/// The same value is encoded in the ticket's QR code, so scanners submit it
/// verbatim.
pub type TicketId = String;

/// Redemption state of a ticket.
///
/// Transitions only forward, `Unredeemed -> Redeemed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[default]
    Unredeemed,
    Redeemed,
}

/// A ticket granting one-time entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    /// Holder label, fixed at creation.
    pub name: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    /// Set on the first successful redemption and never changed afterwards.
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Create a new ticket in the `Unredeemed` state.
    pub fn new(id: TicketId, name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            status: TicketStatus::Unredeemed,
            created_at,
            redeemed_at: None,
        }
    }

    pub fn is_redeemed(&self) -> bool {
        self.status == TicketStatus::Redeemed
    }

    /// Move the ticket to `Redeemed`, stamping `at`.
    ///
    /// Returns `false` and leaves the ticket untouched if it was already
    /// redeemed.
    pub fn redeem(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_redeemed() {
            return false;
        }
        self.status = TicketStatus::Redeemed;
        self.redeemed_at = Some(at);
        true
    }
}
