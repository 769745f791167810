//! Board tools
//!
//! The producer side of the board wire contract: the tools an agent calls to
//! change the board. Each tool validates and trims its arguments and returns
//! the action payload that [`crate::action::decode`] consumes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::action::ActionEvent;
use crate::card::{non_empty, AppointmentCard};
use crate::error::{Error, Result};
use crate::stage::PipelineStage;

/// Tool that creates an appointment card
pub const CREATE_APPOINTMENT: &str = "create-appointment";
/// Tool that moves a card between stages
pub const UPDATE_APPOINTMENT_STAGE: &str = "update-appointment-stage";
/// Tool that overwrites a card's note
pub const UPSERT_APPOINTMENT_NOTE: &str = "upsert-appointment-note";

/// Tool metadata and parameter schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// JSON schema for parameters
    pub parameters: Value,
}

/// Definitions of all board tools
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    let stages: Vec<&str> = PipelineStage::ALL.iter().map(|s| s.as_str()).collect();
    vec![
        ToolDefinition {
            name: CREATE_APPOINTMENT.to_string(),
            description: "Creates a new patient request: give the full name, doctor or department, visit type, contact and stage (new → triage → scheduled → completed).".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "patientName": {"type": "string", "minLength": 2},
                    "doctor": {"type": "string", "minLength": 2},
                    "service": {"type": "string", "minLength": 2},
                    "status": {"type": "string", "enum": stages},
                    "contact": {"type": "string", "minLength": 5},
                    "scheduledFor": {"type": "string", "description": "Visit date and time, e.g. 2025-02-12 14:30"},
                    "note": {"type": "string", "description": "Patient wishes, preparation or instructions for the doctor"}
                },
                "required": ["patientName", "doctor", "service", "status"]
            }),
        },
        ToolDefinition {
            name: UPDATE_APPOINTMENT_STAGE.to_string(),
            description: "Moves a card between pipeline stages and updates the visit details.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "minLength": 4},
                    "status": {"type": "string", "enum": stages},
                    "scheduledFor": {"type": "string"},
                    "note": {"type": "string"}
                },
                "required": ["id", "status"]
            }),
        },
        ToolDefinition {
            name: UPSERT_APPOINTMENT_NOTE.to_string(),
            description: "Updates the note on a patient card: new information, preparation before the visit or the consultation outcome.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "minLength": 4},
                    "note": {"type": "string", "minLength": 3}
                },
                "required": ["id", "note"]
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateArgs {
    patient_name: String,
    doctor: String,
    service: String,
    status: String,
    #[serde(default)]
    contact: Option<String>,
    #[serde(default)]
    scheduled_for: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageArgs {
    id: String,
    status: String,
    #[serde(default)]
    scheduled_for: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NoteArgs {
    id: String,
    note: String,
}

/// Run a board tool and return its result payload
pub fn execute(name: &str, args: &Value) -> Result<Value> {
    let event = match name {
        CREATE_APPOINTMENT => {
            let args: CreateArgs = parse_args(args)?;
            let patient = min_len("patientName", &args.patient_name, 2)?;
            let stage = parse_stage(&args.status)?;
            let mut card = AppointmentCard::new(
                new_appointment_id(),
                patient,
                min_len("doctor", &args.doctor, 2)?,
                min_len("service", &args.service, 2)?,
                stage,
            );
            card.contact = trimmed(args.contact)
                .map(|c| min_len("contact", &c, 5))
                .transpose()?;
            card.slot = trimmed(args.scheduled_for);
            card.note = trimmed(args.note);
            ActionEvent::Create(card)
        }
        UPDATE_APPOINTMENT_STAGE => {
            let args: StageArgs = parse_args(args)?;
            ActionEvent::Move {
                id: min_len("id", &args.id, 4)?,
                stage: parse_stage(&args.status)?,
                slot: trimmed(args.scheduled_for),
                note: trimmed(args.note),
            }
        }
        UPSERT_APPOINTMENT_NOTE => {
            let args: NoteArgs = parse_args(args)?;
            ActionEvent::Note {
                id: min_len("id", &args.id, 4)?,
                note: min_len("note", &args.note, 3)?,
            }
        }
        other => return Err(Error::UnknownTool(other.to_string())),
    };
    Ok(event.to_wire())
}

/// Generate a fresh `appt-` card id
#[must_use]
pub fn new_appointment_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("appt-{}", &simple[..8])
}

fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T> {
    serde_json::from_value(args.clone())
        .map_err(|e| Error::invalid_argument("arguments", e.to_string()))
}

fn parse_stage(value: &str) -> Result<PipelineStage> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_argument("status", format!("unknown stage `{value}`")))
}

fn trimmed(value: Option<String>) -> Option<String> {
    non_empty(value).map(|v| v.trim().to_string())
}

fn min_len(field: &str, value: &str, min: usize) -> Result<String> {
    let value = value.trim();
    if value.chars().count() < min {
        return Err(Error::invalid_argument(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{decode, Decoded};

    #[test]
    fn test_definitions() {
        let defs = definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![CREATE_APPOINTMENT, UPDATE_APPOINTMENT_STAGE, UPSERT_APPOINTMENT_NOTE]
        );
        assert_eq!(
            defs[0].parameters["properties"]["status"]["enum"],
            json!(["new", "triage", "scheduled", "completed"])
        );
    }

    #[test]
    fn test_create_appointment() {
        let result = execute(
            CREATE_APPOINTMENT,
            &json!({
                "patientName": "  Anna Sidorova ",
                "doctor": "Pediatrician",
                "service": "Vaccination",
                "status": "new",
                "scheduledFor": "",
            }),
        )
        .unwrap();

        assert_eq!(result["action"], "create");
        let id = result["item"]["id"].as_str().unwrap();
        assert!(id.starts_with("appt-"));
        assert_eq!(id.len(), 13);

        let Decoded::Action(ActionEvent::Create(card)) = decode(&result) else {
            panic!("tool output must decode as a create");
        };
        assert_eq!(card.patient, "Anna Sidorova");
        assert_eq!(card.name, "Anna Sidorova");
        assert!(card.slot.is_none());
    }

    #[test]
    fn test_create_validates_lengths() {
        let err = execute(
            CREATE_APPOINTMENT,
            &json!({"patientName": "A", "doctor": "Dr", "service": "MRI", "status": "new"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { ref field, .. } if field == "patientName"));

        let err = execute(
            CREATE_APPOINTMENT,
            &json!({"patientName": "Anna", "doctor": "Dr", "service": "MRI", "status": "new", "contact": "123"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { ref field, .. } if field == "contact"));
    }

    #[test]
    fn test_update_stage() {
        let result = execute(
            UPDATE_APPOINTMENT_STAGE,
            &json!({"id": "appt-3201", "status": "scheduled", "scheduledFor": "2025-02-12 10:00"}),
        )
        .unwrap();
        assert_eq!(
            result,
            json!({"action": "move", "id": "appt-3201", "column": "scheduled", "slot": "2025-02-12 10:00"})
        );
    }

    #[test]
    fn test_update_stage_rejects_unknown_stage() {
        let err = execute(
            UPDATE_APPOINTMENT_STAGE,
            &json!({"id": "appt-3201", "status": "confirmed"}),
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
    }

    #[test]
    fn test_upsert_note() {
        let result = execute(
            UPSERT_APPOINTMENT_NOTE,
            &json!({"id": "appt-3201", "note": " call back tomorrow "}),
        )
        .unwrap();
        assert_eq!(result["note"], "call back tomorrow");

        assert!(execute(UPSERT_APPOINTMENT_NOTE, &json!({"id": "appt-3201", "note": "ok"})).is_err());
    }

    #[test]
    fn test_unknown_tool() {
        let err = execute("weather", &json!({})).unwrap_err();
        assert_eq!(err.code(), "unknown_tool");
    }
}
