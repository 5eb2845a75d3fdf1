use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::state::roster::{Player, Roster, SLOTS_PER_SIDE, Side, Team};

/// Score partition of the match aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub black: u32,
    pub yellow: u32,
}

impl Scoreboard {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Black => self.black,
            Side::Yellow => self.yellow,
        }
    }

    /// Move the score of `side` by `delta`, never below zero.
    pub fn add(&mut self, side: Side, delta: i32) {
        let score = match side {
            Side::Black => &mut self.black,
            Side::Yellow => &mut self.yellow,
        };
        *score = score.saturating_add_signed(delta);
    }
}

/// Consistent copy of one side at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideSnapshot {
    pub players: [Option<Player>; SLOTS_PER_SIDE],
    pub team: Option<Team>,
    pub score: u32,
}

/// Consistent copy of the whole match, as broadcast to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSnapshot {
    pub black: SideSnapshot,
    pub yellow: SideSnapshot,
    pub started: bool,
    pub over: bool,
    pub game_id: Option<Uuid>,
}

impl MatchSnapshot {
    /// Whether every slot, team, score and flag is back to its empty form.
    pub fn is_empty(&self) -> bool {
        [&self.black, &self.yellow].iter().all(|side| {
            side.players.iter().all(Option::is_none) && side.team.is_none() && side.score == 0
        }) && !self.started
            && !self.over
            && self.game_id.is_none()
    }
}

/// The single match aggregate, split in two independently locked partitions.
///
/// Lock order: whenever both partitions are needed, the roster is acquired before the
/// scores. Readers that only need the scores may take that lock alone.
#[derive(Debug, Default)]
pub struct MatchState {
    roster: RwLock<Roster>,
    scores: RwLock<Scoreboard>,
}

/// Write access to both partitions, acquired in lock order.
pub struct MatchGuard<'a> {
    pub roster: RwLockWriteGuard<'a, Roster>,
    pub scores: RwLockWriteGuard<'a, Scoreboard>,
}

impl MatchGuard<'_> {
    /// Return the whole aggregate to its empty form.
    pub fn reset(&mut self) {
        self.roster.clear();
        *self.scores = Scoreboard::default();
    }
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn roster(&self) -> RwLockReadGuard<'_, Roster> {
        self.roster.read().await
    }

    pub async fn roster_mut(&self) -> RwLockWriteGuard<'_, Roster> {
        self.roster.write().await
    }

    pub async fn scores(&self) -> Scoreboard {
        *self.scores.read().await
    }

    pub async fn lock_all(&self) -> MatchGuard<'_> {
        let roster = self.roster.write().await;
        let scores = self.scores.write().await;
        MatchGuard { roster, scores }
    }

    /// Read both partitions in lock order and copy them out.
    pub async fn snapshot(&self) -> MatchSnapshot {
        let roster = self.roster.read().await;
        let scores = self.scores.read().await;

        let side = |side: Side| {
            let current = roster.side(side);
            SideSnapshot {
                players: current.slots.clone(),
                team: current.team.clone(),
                score: scores.get(side),
            }
        };

        MatchSnapshot {
            black: side(Side::Black),
            yellow: side(Side::Yellow),
            started: roster.started,
            over: roster.over,
            game_id: roster.game_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoreboard_never_goes_negative() {
        let mut scores = Scoreboard::default();
        scores.add(Side::Black, 1);
        scores.add(Side::Black, -1);
        scores.add(Side::Black, -1);
        assert_eq!(scores.get(Side::Black), 0);
    }

    #[tokio::test]
    async fn fresh_state_snapshot_is_empty() {
        let state = MatchState::new();
        assert!(state.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn reset_clears_both_partitions() {
        let state = MatchState::new();
        {
            let mut guard = state.lock_all().await;
            guard.roster.started = true;
            guard.scores.add(Side::Yellow, 3);
        }
        assert_eq!(state.scores().await.yellow, 3);

        state.lock_all().await.reset();
        assert!(state.snapshot().await.is_empty());
    }
}
