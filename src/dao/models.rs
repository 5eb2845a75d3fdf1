use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Player record provisioned by the identity flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// External identifier issued by the identity provider.
    pub id: String,
    /// Display picture URL.
    pub picture: String,
}

/// A persisted pairing of two players under a city and a name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// City the team represents.
    pub city: String,
    /// Team name, unique across all teams.
    pub name: String,
    /// First member of the pair.
    pub player1: String,
    /// Second member of the pair.
    pub player2: String,
}

impl TeamEntity {
    /// Whether this team pairs exactly `a` and `b`, in either order.
    pub fn pairs(&self, a: &str, b: &str) -> bool {
        (self.player1 == a && self.player2 == b) || (self.player1 == b && self.player2 == a)
    }

    /// Whether registering `candidate` would clash with this team.
    pub fn conflicts_with(&self, candidate: &NewTeamEntity) -> bool {
        self.pairs(&candidate.player1, &candidate.player2)
            || self.city == candidate.city
            || self.name == candidate.name
    }
}

/// Team creation request handed to the store, which allocates the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeamEntity {
    /// City the team represents.
    pub city: String,
    /// Team name.
    pub name: String,
    /// First member of the pair.
    pub player1: String,
    /// Second member of the pair.
    pub player2: String,
}

/// A single played (or in-progress) match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Team playing the black side.
    pub black_team: Uuid,
    /// Team playing the yellow side.
    pub yellow_team: Uuid,
    /// When the match started.
    pub started_at: SystemTime,
    /// When the match was finalized, if it has been.
    pub ended_at: Option<SystemTime>,
    /// Final black score.
    pub black_score: u32,
    /// Final yellow score.
    pub yellow_score: u32,
}

impl GameEntity {
    /// Fresh game record between two teams, started now.
    pub fn new(black_team: Uuid, yellow_team: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            black_team,
            yellow_team,
            started_at: SystemTime::now(),
            ended_at: None,
            black_score: 0,
            yellow_score: 0,
        }
    }
}
