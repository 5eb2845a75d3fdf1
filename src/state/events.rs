use std::fmt;

use validator::Validate;

use crate::state::roster::Side;

/// Mutating requests processed, one at a time, by the match controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchAction {
    Register { side: Side, player_id: String },
    Unregister { side: Side, player_id: String },
    Confirm { side: Side, player_id: String },
    RegisterTeam(TeamRegistration),
    Goal { player_id: String },
    UndoGoal { player_id: String },
}

/// Request to create a team for a pair of players and bind it to a side.
///
/// The side is kept as sent: an unknown side only surfaces once the team exists.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct TeamRegistration {
    pub side: Option<Side>,
    #[validate(length(min = 1))]
    pub player_1: String,
    #[validate(length(min = 1))]
    pub player_2: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub name: String,
}

impl TeamRegistration {
    /// Field checks that need no storage round trip.
    pub fn is_well_formed(&self) -> bool {
        self.validate().is_ok() && self.player_1 != self.player_2
    }
}

/// Why the match was forced back to its empty form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    GameOver,
    PlayerLeft,
    InvalidTeam,
    TeamCreationFailed,
    TeamSetupFailed,
    StartFailed,
}

impl ResetReason {
    /// Human readable notice broadcast to every client.
    pub fn notice(self) -> &'static str {
        match self {
            ResetReason::GameOver => "Game Over",
            ResetReason::PlayerLeft => "Player left mid-game",
            ResetReason::InvalidTeam => "Error registering teams",
            ResetReason::TeamCreationFailed => "Error creating team",
            ResetReason::TeamSetupFailed => "Error setting up team",
            ResetReason::StartFailed => "Error starting game",
        }
    }
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.notice())
    }
}

/// Requests handed from the controller (or the registry) to the broadcast loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastSignal {
    /// Build and send the current match snapshot.
    Snapshot,
    /// Send a standalone notice.
    Notice(String),
}

impl From<ResetReason> for BroadcastSignal {
    fn from(reason: ResetReason) -> Self {
        BroadcastSignal::Notice(reason.notice().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(player_1: &str, player_2: &str, city: &str, name: &str) -> TeamRegistration {
        TeamRegistration {
            side: Some(Side::Black),
            player_1: player_1.into(),
            player_2: player_2.into(),
            city: city.into(),
            name: name.into(),
        }
    }

    #[test]
    fn team_registration_requires_all_fields_and_two_players() {
        assert!(registration("p1", "p2", "Metro", "Falcons").is_well_formed());
        assert!(!registration("", "p2", "Metro", "Falcons").is_well_formed());
        assert!(!registration("p1", "p2", "", "Falcons").is_well_formed());
        assert!(!registration("p1", "p2", "Metro", "").is_well_formed());
        assert!(!registration("p1", "p1", "Metro", "Falcons").is_well_formed());
    }

    #[test]
    fn reset_notices() {
        assert_eq!(ResetReason::GameOver.to_string(), "Game Over");
        assert_eq!(
            BroadcastSignal::from(ResetReason::PlayerLeft),
            BroadcastSignal::Notice("Player left mid-game".into())
        );
    }
}
