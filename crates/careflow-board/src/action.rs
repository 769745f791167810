//! Board action events
//!
//! Tool results that mutate the board arrive as loosely typed JSON. They are
//! decoded here, at the boundary, into [`ActionEvent`]; anything that does not
//! validate becomes a [`Rejection`] value before it can reach the reducer.
//!
//! Wire shapes:
//!
//! ```json
//! {"action":"create","item":{"id":"appt-1","patient":"A","doctor":"D","service":"S","column":"new"}}
//! {"action":"move","id":"appt-1","column":"scheduled","slot":"2025-02-12 10:00"}
//! {"action":"note","id":"appt-1","note":"call back tomorrow"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::card::{non_empty, AppointmentCard};
use crate::error::Rejection;
use crate::stage::PipelineStage;

/// A validated board mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEvent {
    /// Insert a new card
    Create(AppointmentCard),

    /// Move a card to another stage, merging slot and note
    Move {
        /// Target card
        id: String,
        /// Target stage
        stage: PipelineStage,
        /// New slot, only applied when non-empty
        slot: Option<String>,
        /// New note, only applied when non-empty
        note: Option<String>,
    },

    /// Overwrite a card's note
    Note {
        /// Target card
        id: String,
        /// Note text, never empty
        note: String,
    },
}

impl ActionEvent {
    /// Id of the card the event targets
    #[must_use]
    pub fn card_id(&self) -> &str {
        match self {
            Self::Create(card) => &card.id,
            Self::Move { id, .. } | Self::Note { id, .. } => id,
        }
    }

    /// Wire name of the action
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Move { .. } => "move",
            Self::Note { .. } => "note",
        }
    }

    /// Encode the event in its wire form
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let wire = match self {
            Self::Create(card) => WireAction::Create {
                item: Some(WireItem {
                    id: Some(card.id.clone()),
                    name: Some(card.name.clone()),
                    patient: Some(card.patient.clone()),
                    doctor: Some(card.doctor.clone()),
                    service: Some(card.service.clone()),
                    column: Some(card.stage.as_str().to_string()),
                    contact: card.contact.clone(),
                    slot: card.slot.clone(),
                    note: card.note.clone(),
                }),
            },
            Self::Move {
                id,
                stage,
                slot,
                note,
            } => WireAction::Move {
                id: Some(id.clone()),
                column: Some(stage.as_str().to_string()),
                slot: slot.clone(),
                note: note.clone(),
            },
            Self::Note { id, note } => WireAction::Note {
                id: Some(id.clone()),
                note: Some(note.clone()),
            },
        };
        serde_json::to_value(wire).unwrap_or(Value::Null)
    }
}

/// Result of decoding one tool result payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A valid board action
    Action(ActionEvent),
    /// A board action that failed validation
    Rejected(Rejection),
    /// Not a board action at all (other tool kinds)
    Unrecognized,
}

const KNOWN_ACTIONS: [&str; 3] = ["create", "move", "note"];

/// Decode a tool result payload into a board action
#[must_use]
pub fn decode(payload: &Value) -> Decoded {
    let Some(action) = payload.get("action").and_then(Value::as_str) else {
        return Decoded::Unrecognized;
    };
    if !KNOWN_ACTIONS.contains(&action) {
        return Decoded::Unrecognized;
    }

    let wire: WireAction = match serde_json::from_value(payload.clone()) {
        Ok(wire) => wire,
        Err(e) => return Decoded::Rejected(Rejection::Malformed(e.to_string())),
    };

    match wire.validate() {
        Ok(event) => Decoded::Action(event),
        Err(rejection) => Decoded::Rejected(rejection),
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    patient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doctor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum WireAction {
    Create {
        #[serde(default)]
        item: Option<WireItem>,
    },
    Move {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        column: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Note {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        note: Option<String>,
    },
}

impl WireAction {
    fn validate(self) -> Result<ActionEvent, Rejection> {
        match self {
            Self::Create { item } => {
                let item = item.ok_or(Rejection::MissingField("item"))?;
                let id = required(item.id, "item.id")?;
                let stage = required(item.column, "item.column")?.parse::<PipelineStage>()?;
                let patient = item.patient.unwrap_or_default();
                let name = non_empty(item.name).unwrap_or_else(|| patient.clone());
                Ok(ActionEvent::Create(AppointmentCard {
                    id,
                    name,
                    patient,
                    doctor: item.doctor.unwrap_or_default(),
                    service: item.service.unwrap_or_default(),
                    stage,
                    contact: non_empty(item.contact),
                    slot: non_empty(item.slot),
                    note: non_empty(item.note),
                }))
            }
            Self::Move {
                id,
                column,
                slot,
                note,
            } => {
                let id = required(id, "id")?;
                let stage = required(column, "column")?.parse::<PipelineStage>()?;
                Ok(ActionEvent::Move {
                    id,
                    stage,
                    slot: non_empty(slot),
                    note: non_empty(note),
                })
            }
            Self::Note { id, note } => {
                let id = required(id, "id")?;
                match non_empty(note) {
                    Some(note) => Ok(ActionEvent::Note { id, note }),
                    None => Err(Rejection::EmptyNote(id)),
                }
            }
        }
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, Rejection> {
    non_empty(value).ok_or(Rejection::MissingField(field))
}
