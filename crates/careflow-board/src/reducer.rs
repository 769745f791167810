//! Board Reducer
//!
//! Applies validated [`ActionEvent`]s to a [`BoardStore`]. Every path checks
//! its preconditions before touching the store, so an event is either applied
//! whole or not at all.

use tracing::{debug, info, warn};

use crate::action::ActionEvent;
use crate::card::non_empty;
use crate::error::Rejection;
use crate::store::BoardStore;

/// What applying one event did to the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The card was created or updated
    Applied {
        /// Touched card
        card_id: String,
    },
    /// A create for an id that already exists; nothing changed
    Duplicate {
        /// Existing card
        card_id: String,
    },
    /// The event was refused; nothing changed
    Rejected(Rejection),
}

impl Outcome {
    /// Card id to highlight, if the board changed
    #[must_use]
    pub fn touched(&self) -> Option<&str> {
        match self {
            Self::Applied { card_id } => Some(card_id),
            Self::Duplicate { .. } | Self::Rejected(_) => None,
        }
    }

    /// Whether the board changed
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

impl BoardStore {
    /// Apply an event in place
    pub fn apply(&mut self, event: &ActionEvent) -> Outcome {
        let outcome = match event {
            ActionEvent::Create(card) => {
                if card.id.trim().is_empty() {
                    Outcome::Rejected(Rejection::MissingField("item.id"))
                } else if self.contains(&card.id) {
                    Outcome::Duplicate {
                        card_id: card.id.clone(),
                    }
                } else {
                    self.push(card.clone());
                    Outcome::Applied {
                        card_id: card.id.clone(),
                    }
                }
            }
            ActionEvent::Move {
                id,
                stage,
                slot,
                note,
            } => match self.card_mut(id) {
                Some(card) => {
                    card.stage = *stage;
                    if let Some(slot) = non_empty(slot.clone()) {
                        card.slot = Some(slot);
                    }
                    if let Some(note) = non_empty(note.clone()) {
                        card.note = Some(note);
                    }
                    Outcome::Applied { card_id: id.clone() }
                }
                None => Outcome::Rejected(Rejection::UnknownCard(id.clone())),
            },
            ActionEvent::Note { id, note } => match self.card_mut(id) {
                Some(card) => {
                    card.note = Some(note.clone());
                    Outcome::Applied { card_id: id.clone() }
                }
                None => Outcome::Rejected(Rejection::UnknownCard(id.clone())),
            },
        };

        match &outcome {
            Outcome::Applied { card_id } => {
                info!(action = event.kind(), card_id = %card_id, "Board updated");
            }
            Outcome::Duplicate { card_id } => {
                debug!(card_id = %card_id, "Ignoring create for existing card");
            }
            Outcome::Rejected(rejection) => {
                warn!(
                    action = event.kind(),
                    card_id = %event.card_id(),
                    code = rejection.code(),
                    "Board event rejected: {}",
                    rejection
                );
            }
        }
        outcome
    }
}

/// Pure form of [`BoardStore::apply`]: returns the next board and the outcome
#[must_use]
pub fn reduce(board: &BoardStore, event: &ActionEvent) -> (BoardStore, Outcome) {
    let mut next = board.clone();
    let outcome = next.apply(event);
    (next, outcome)
}
