use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::state::{
    events::{MatchAction, TeamRegistration},
    match_state::{MatchSnapshot, SideSnapshot},
    roster::{Player, Team, UnknownSide},
};

const ACTION_REGISTER: &str = "register game";
const ACTION_UNREGISTER: &str = "unregister";
const ACTION_CONFIRM: &str = "confirm";
const ACTION_REGISTER_TEAM: &str = "register team";
const ACTION_GOAL: &str = "goal";
const ACTION_UNDO_GOAL: &str = "undo goal";

/// Path parameters of the client WebSocket endpoint.
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct RegisterParams {
    /// External id of the player attaching.
    #[validate(length(min = 1, max = 255))]
    pub sub: String,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
/// Action message accepted from client WebSocket connections.
///
/// Every field is optional on the wire; which ones matter depends on `action`.
#[serde(default)]
pub struct ActionMessage {
    /// One of `register game`, `unregister`, `confirm`, `register team`, `goal`, `undo goal`.
    pub action: String,
    /// Player the action applies to.
    pub sub: String,
    /// `black` or `yellow`.
    pub side: String,
    pub picture: String,
    pub player_1: String,
    pub player_2: String,
    pub city: String,
    pub name: String,
}

/// Reasons an inbound message cannot be turned into a [`MatchAction`].
#[derive(Debug, Error)]
pub enum ActionParseError {
    #[error("malformed action payload")]
    Json(#[from] serde_json::Error),
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error(transparent)]
    UnknownSide(#[from] UnknownSide),
}

impl ActionMessage {
    pub fn from_json_str(raw: &str) -> Result<Self, ActionParseError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl TryFrom<ActionMessage> for MatchAction {
    type Error = ActionParseError;

    fn try_from(message: ActionMessage) -> Result<Self, Self::Error> {
        let ActionMessage {
            action,
            sub,
            side,
            player_1,
            player_2,
            city,
            name,
            ..
        } = message;

        let action = match action.as_str() {
            ACTION_REGISTER => MatchAction::Register {
                side: side.parse()?,
                player_id: sub,
            },
            ACTION_UNREGISTER => MatchAction::Unregister {
                side: side.parse()?,
                player_id: sub,
            },
            ACTION_CONFIRM => MatchAction::Confirm {
                side: side.parse()?,
                player_id: sub,
            },
            ACTION_REGISTER_TEAM => MatchAction::RegisterTeam(TeamRegistration {
                side: side.parse().ok(),
                player_1,
                player_2,
                city,
                name,
            }),
            ACTION_GOAL => MatchAction::Goal { player_id: sub },
            ACTION_UNDO_GOAL => MatchAction::UndoGoal { player_id: sub },
            _ => return Err(ActionParseError::UnknownAction(action)),
        };
        Ok(action)
    }
}

/// Parse a raw text frame straight into an action.
pub fn parse_action(raw: &str) -> Result<MatchAction, ActionParseError> {
    ActionMessage::from_json_str(raw)?.try_into()
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
/// Occupant of a slot as seen by clients.
pub struct PlayerView {
    pub sub: String,
    pub picture: String,
    pub confirmed: bool,
    pub goals: u32,
}

impl From<Player> for PlayerView {
    fn from(player: Player) -> Self {
        Self {
            sub: player.id,
            picture: player.picture,
            confirmed: player.confirmed,
            goals: player.goals,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
/// Team bound to a side as seen by clients.
pub struct TeamView {
    pub id: Uuid,
    pub city: String,
    pub name: String,
}

impl From<Team> for TeamView {
    fn from(team: Team) -> Self {
        Self {
            id: team.id,
            city: team.city,
            name: team.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
/// Full match state pushed to every client after each processed action.
///
/// Empty slots and unresolved teams are `null`.
pub struct MatchStateMessage {
    pub black_player_1: Option<PlayerView>,
    pub black_player_2: Option<PlayerView>,
    pub yellow_player_1: Option<PlayerView>,
    pub yellow_player_2: Option<PlayerView>,
    pub black_team: Option<TeamView>,
    pub yellow_team: Option<TeamView>,
    pub black_score: u32,
    pub yellow_score: u32,
    pub game_started: bool,
    pub game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
}

type SideViews = (Option<PlayerView>, Option<PlayerView>, Option<TeamView>, u32);

fn side_views(side: SideSnapshot) -> SideViews {
    let [first, second] = side.players;
    (
        first.map(Into::into),
        second.map(Into::into),
        side.team.map(Into::into),
        side.score,
    )
}

impl From<MatchSnapshot> for MatchStateMessage {
    fn from(snapshot: MatchSnapshot) -> Self {
        let (black_player_1, black_player_2, black_team, black_score) =
            side_views(snapshot.black);
        let (yellow_player_1, yellow_player_2, yellow_team, yellow_score) =
            side_views(snapshot.yellow);

        Self {
            black_player_1,
            black_player_2,
            yellow_player_1,
            yellow_player_2,
            black_team,
            yellow_team,
            black_score,
            yellow_score,
            game_started: snapshot.started,
            game_over: snapshot.over,
            game_id: snapshot.game_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
/// Standalone notice explaining a forced reset or a refused connection.
pub struct NoticeMessage {
    pub error: String,
}

impl NoticeMessage {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::{match_state::MatchState, roster::Side};

    #[test]
    fn parses_roster_actions() {
        let action =
            parse_action(r#"{"action":"register game","sub":"p1","side":"black"}"#).unwrap();
        assert_eq!(
            action,
            MatchAction::Register {
                side: Side::Black,
                player_id: "p1".into()
            }
        );

        let action = parse_action(r#"{"action":"confirm","sub":"p2","side":"yellow"}"#).unwrap();
        assert_eq!(
            action,
            MatchAction::Confirm {
                side: Side::Yellow,
                player_id: "p2".into()
            }
        );

        let action = parse_action(r#"{"action":"undo goal","sub":"p2"}"#).unwrap();
        assert_eq!(
            action,
            MatchAction::UndoGoal {
                player_id: "p2".into()
            }
        );
    }

    #[test]
    fn register_team_keeps_unknown_side_for_the_controller() {
        let action = parse_action(concat!(
            r#"{"action":"register team","side":"red","player_1":"p1","player_2":"p2","#,
            r#""city":"Metro","name":"Falcons"}"#,
        ))
        .unwrap();
        match action {
            MatchAction::RegisterTeam(registration) => {
                assert_eq!(registration.side, None);
                assert_eq!(registration.city, "Metro");
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn malformed_messages_are_rejected() {
        assert!(matches!(
            parse_action("not json"),
            Err(ActionParseError::Json(_))
        ));
        assert!(matches!(
            parse_action(r#"{"action":"dance","sub":"p1"}"#),
            Err(ActionParseError::UnknownAction(_))
        ));
        assert!(matches!(
            parse_action(r#"{"action":"register game","sub":"p1","side":"red"}"#),
            Err(ActionParseError::UnknownSide(_))
        ));
    }

    #[tokio::test]
    async fn empty_state_serializes_with_null_slots() {
        let snapshot = MatchState::new().snapshot().await;
        let value = serde_json::to_value(MatchStateMessage::from(snapshot)).unwrap();
        assert_eq!(
            value,
            json!({
                "black_player_1": null,
                "black_player_2": null,
                "yellow_player_1": null,
                "yellow_player_2": null,
                "black_team": null,
                "yellow_team": null,
                "black_score": 0,
                "yellow_score": 0,
                "game_started": false,
                "game_over": false,
            })
        );
    }

    #[test]
    fn notice_carries_only_the_error_field() {
        let value = serde_json::to_value(NoticeMessage::new("Game Over")).unwrap();
        assert_eq!(value, json!({"error": "Game Over"}));
    }
}
