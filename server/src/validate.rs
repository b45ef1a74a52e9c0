//! Decoding and bounds checking of inbound frames.
//!
//! Serde enforces the typed shape of every message. The checks here cover
//! what the types cannot express: lengths, character sets and coordinate
//! ranges. A frame that fails either step never reaches a room.

use crate::error::ProtocolError;
use shared::{
    ClientMessage, GameEventKind, MAX_RESOURCE_ADJUSTMENT, MAX_ROOM_CODE_LEN, MAX_UNITS_PER_ORDER,
    MAX_USERNAME_LEN, MIN_ROOM_CODE_LEN,
};

const MAX_TOKEN_LEN: usize = 128;

pub fn decode_client_message(text: &str, map_size: u32) -> Result<ClientMessage, ProtocolError> {
    let message: ClientMessage =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    validate(&message, map_size)?;
    Ok(message)
}

pub fn validate(message: &ClientMessage, map_size: u32) -> Result<(), ProtocolError> {
    validate_room_code(message.room_code())?;

    match message {
        ClientMessage::JoinRoom {
            username: Some(name),
            ..
        } if name.chars().count() > MAX_USERNAME_LEN => Err(ProtocolError::invalid(
            "username",
            format!("must be at most {} characters", MAX_USERNAME_LEN),
        )),
        ClientMessage::Reconnect {
            player_id,
            reconnect_token,
            ..
        } => {
            if player_id.is_empty() {
                return Err(ProtocolError::invalid("playerId", "must not be empty"));
            }
            if reconnect_token.is_empty() || reconnect_token.len() > MAX_TOKEN_LEN {
                return Err(ProtocolError::invalid(
                    "reconnectToken",
                    format!("must be 1-{} characters", MAX_TOKEN_LEN),
                ));
            }
            Ok(())
        }
        ClientMessage::GameEvent { event, .. } => validate_event(event, map_size),
        _ => Ok(()),
    }
}

fn validate_room_code(code: &str) -> Result<(), ProtocolError> {
    let length_ok = (MIN_ROOM_CODE_LEN..=MAX_ROOM_CODE_LEN).contains(&code.len());
    if !length_ok || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ProtocolError::invalid(
            "roomCode",
            format!(
                "must be {}-{} alphanumeric characters",
                MIN_ROOM_CODE_LEN, MAX_ROOM_CODE_LEN
            ),
        ));
    }
    Ok(())
}

fn validate_unit_ids(ids: &[u32]) -> Result<(), ProtocolError> {
    if ids.is_empty() || ids.len() > MAX_UNITS_PER_ORDER {
        return Err(ProtocolError::invalid(
            "unitIds",
            format!("must list 1-{} units", MAX_UNITS_PER_ORDER),
        ));
    }
    Ok(())
}

fn validate_coordinate(field: &'static str, value: i32, map_size: u32) -> Result<(), ProtocolError> {
    if value < 0 || value as u32 >= map_size {
        return Err(ProtocolError::invalid(
            field,
            format!("must be within 0..{}", map_size),
        ));
    }
    Ok(())
}

fn validate_event(event: &GameEventKind, map_size: u32) -> Result<(), ProtocolError> {
    match event {
        GameEventKind::UnitMove {
            unit_ids,
            target_x,
            target_y,
        } => {
            validate_unit_ids(unit_ids)?;
            validate_coordinate("targetX", *target_x, map_size)?;
            validate_coordinate("targetY", *target_y, map_size)
        }
        GameEventKind::UnitCreate { x, y, .. } => {
            if let Some(x) = x {
                validate_coordinate("x", *x, map_size)?;
            }
            if let Some(y) = y {
                validate_coordinate("y", *y, map_size)?;
            }
            Ok(())
        }
        GameEventKind::BuildingCreate { x, y, .. } => {
            validate_coordinate("x", *x, map_size)?;
            validate_coordinate("y", *y, map_size)
        }
        GameEventKind::ResourceUpdate { resources } => {
            if resources.max_magnitude() > MAX_RESOURCE_ADJUSTMENT {
                return Err(ProtocolError::invalid(
                    "resources",
                    format!("adjustments must be within ±{}", MAX_RESOURCE_ADJUSTMENT),
                ));
            }
            Ok(())
        }
        GameEventKind::Attack { unit_ids, .. } => validate_unit_ids(unit_ids),
        GameEventKind::ResearchTech { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::TechKind;

    fn decode(text: &str) -> Result<ClientMessage, ProtocolError> {
        decode_client_message(text, 64)
    }

    #[test]
    fn test_valid_messages_pass() {
        assert!(decode(r#"{"type":"joinRoom","roomCode":"AB12CD","username":"Ada"}"#).is_ok());
        let research = decode(
            r#"{"type":"gameEvent","roomCode":"AB12CD","eventType":"researchTech","tech":"fletching"}"#,
        )
        .unwrap();
        assert_eq!(
            research,
            ClientMessage::GameEvent {
                room_code: "AB12CD".to_string(),
                event: GameEventKind::ResearchTech {
                    tech: TechKind::Fletching
                },
            }
        );
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            decode("{not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode(r#"{"type":"danceParty","roomCode":"AB12CD"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode(r#"{"type":"gameEvent","roomCode":"AB12CD","eventType":"unitMove","unitIds":"3"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_room_code_rules() {
        for code in ["ab1", "ABCDEFGHIJKLM", "AB-12", "AB 12", ""] {
            let text = format!(r#"{{"type":"startGame","roomCode":"{}"}}"#, code);
            assert!(
                matches!(decode(&text), Err(ProtocolError::InvalidField { field: "roomCode", .. })),
                "{:?} should be rejected",
                code
            );
        }
        assert!(decode(r#"{"type":"startGame","roomCode":"abcd"}"#).is_ok());
    }

    #[test]
    fn test_username_length() {
        let long = "x".repeat(MAX_USERNAME_LEN + 1);
        let text = format!(r#"{{"type":"joinRoom","roomCode":"AB12CD","username":"{}"}}"#, long);
        assert!(matches!(
            decode(&text),
            Err(ProtocolError::InvalidField { field: "username", .. })
        ));
    }

    #[test]
    fn test_unit_id_list_bounds() {
        let empty = r#"{"type":"gameEvent","roomCode":"AB12CD","eventType":"attack","unitIds":[],"targetId":4}"#;
        assert!(matches!(
            decode(empty),
            Err(ProtocolError::InvalidField { field: "unitIds", .. })
        ));

        let ids: Vec<String> = (0..=MAX_UNITS_PER_ORDER).map(|i| i.to_string()).collect();
        let too_many = format!(
            r#"{{"type":"gameEvent","roomCode":"AB12CD","eventType":"unitMove","unitIds":[{}],"targetX":1,"targetY":1}}"#,
            ids.join(",")
        );
        assert!(decode(&too_many).is_err());
    }

    #[test]
    fn test_coordinates_inside_map() {
        let outside = r#"{"type":"gameEvent","roomCode":"AB12CD","eventType":"buildingCreate","buildingType":"barracks","x":64,"y":3}"#;
        assert!(matches!(
            decode(outside),
            Err(ProtocolError::InvalidField { field: "x", .. })
        ));
        let negative = r#"{"type":"gameEvent","roomCode":"AB12CD","eventType":"unitMove","unitIds":[1],"targetX":3,"targetY":-1}"#;
        assert!(matches!(
            decode(negative),
            Err(ProtocolError::InvalidField { field: "targetY", .. })
        ));
    }

    #[test]
    fn test_resource_adjustment_bound() {
        let ok = r#"{"type":"gameEvent","roomCode":"AB12CD","eventType":"resourceUpdate","resources":{"food":-10000}}"#;
        assert!(decode(ok).is_ok());
        let too_big = r#"{"type":"gameEvent","roomCode":"AB12CD","eventType":"resourceUpdate","resources":{"gold":10001}}"#;
        assert!(matches!(
            decode(too_big),
            Err(ProtocolError::InvalidField { field: "resources", .. })
        ));
    }

    #[test]
    fn test_reconnect_requires_token() {
        let text = r#"{"type":"reconnect","roomCode":"AB12CD","playerId":"player-1","reconnectToken":""}"#;
        assert!(matches!(
            decode(text),
            Err(ProtocolError::InvalidField { field: "reconnectToken", .. })
        ));
    }
}
