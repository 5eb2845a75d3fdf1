use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    dao::{match_store::MatchStore, models::NewTeamEntity},
    error::ServiceError,
    state::{
        SharedState,
        events::{BroadcastSignal, MatchAction, ResetReason, TeamRegistration},
        match_state::{MatchGuard, MatchState, Scoreboard},
        roster::{Player, Side, Team},
    },
};

/// Score at which a side wins and the match ends.
pub const WINNING_SCORE: u32 = 5;

/// Effect of a processed action on the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The match changed.
    Applied,
    /// The action was valid input but had nothing to do.
    Ignored,
    /// The match was forced back to its empty form.
    Reset(ResetReason),
}

/// Single owner of every match mutation.
///
/// Actions are consumed one at a time from the mailbox and run to completion, store
/// calls included, before the next one is looked at. Each processed action wakes the
/// broadcast loop; abandoned actions do not.
pub struct MatchController {
    game: Arc<MatchState>,
    store: Arc<dyn MatchStore>,
    signals: mpsc::Sender<BroadcastSignal>,
}

impl MatchController {
    pub fn new(
        game: Arc<MatchState>,
        store: Arc<dyn MatchStore>,
        signals: mpsc::Sender<BroadcastSignal>,
    ) -> Self {
        Self {
            game,
            store,
            signals,
        }
    }

    pub fn from_state(state: &SharedState) -> Self {
        Self::new(state.game(), state.store(), state.signals())
    }

    /// Drain the mailbox for the lifetime of the process.
    pub async fn run(self, mut actions: mpsc::Receiver<MatchAction>) {
        while let Some(action) = actions.recv().await {
            let _ = self.handle(action).await;
        }
        info!("action mailbox closed; match controller stopping");
    }

    /// Apply one action, then signal the broadcast loop.
    pub async fn handle(&self, action: MatchAction) -> Result<Outcome, ServiceError> {
        debug!(?action, "processing action");
        let result = match action {
            MatchAction::Register { side, player_id } => self.register(side, player_id).await,
            MatchAction::Unregister { side, player_id } => {
                Ok(self.unregister(side, &player_id).await)
            }
            MatchAction::Confirm { side, player_id } => self.confirm(side, player_id).await,
            MatchAction::RegisterTeam(registration) => Ok(self.register_team(registration).await),
            MatchAction::Goal { player_id } => Ok(self.adjust_score(&player_id, 1).await),
            MatchAction::UndoGoal { player_id } => Ok(self.adjust_score(&player_id, -1).await),
        };

        match &result {
            Ok(Outcome::Reset(reason)) => {
                self.signal((*reason).into()).await;
                self.signal(BroadcastSignal::Snapshot).await;
            }
            Ok(_) => self.signal(BroadcastSignal::Snapshot).await,
            Err(err) => warn!(error = %err, "action abandoned"),
        }
        result
    }

    async fn signal(&self, signal: BroadcastSignal) {
        if self.signals.send(signal).await.is_err() {
            warn!("broadcast loop stopped; dropping signal");
        }
    }

    async fn register(&self, side: Side, player_id: String) -> Result<Outcome, ServiceError> {
        {
            let roster = self.game.roster().await;
            if let Some(seat) = roster.seat_on(side, &player_id) {
                let confirmed = roster.player(seat).is_some_and(|player| player.confirmed);
                drop(roster);
                if confirmed {
                    debug!(sub = %player_id, %side, "already registered and confirmed");
                    return Ok(Outcome::Ignored);
                }
                debug!(sub = %player_id, %side, "registering again toggles the player off");
                return Ok(self.unregister(side, &player_id).await);
            }
            if roster.side(side).is_full() {
                debug!(sub = %player_id, %side, "side full");
                return Ok(Outcome::Ignored);
            }
        }

        let picture = self
            .store
            .player_picture(player_id.clone())
            .await?
            .ok_or_else(|| ServiceError::UnknownPlayer(player_id.clone()))?;

        let mut roster = self.game.roster_mut().await;
        if roster.remove(side.other(), &player_id).is_some() {
            info!(sub = %player_id, from = %side.other(), "player switched sides");
        }
        match roster.place(side, Player::new(player_id.clone(), picture)) {
            Some(seat) => {
                info!(sub = %player_id, %side, slot = seat.slot, "player registered");
                Ok(Outcome::Applied)
            }
            None => Ok(Outcome::Ignored),
        }
    }

    async fn unregister(&self, side: Side, player_id: &str) -> Outcome {
        let mut guard = self.game.lock_all().await;
        if guard.roster.remove(side, player_id).is_none() {
            return Outcome::Ignored;
        }
        info!(sub = %player_id, %side, "player unregistered");
        if guard.roster.started {
            return reset_locked(&mut guard, ResetReason::PlayerLeft);
        }
        Outcome::Applied
    }

    async fn confirm(&self, side: Side, player_id: String) -> Result<Outcome, ServiceError> {
        let (seat, partner) = {
            let roster = self.game.roster().await;
            let Some(seat) = roster.seat_on(side, &player_id) else {
                debug!(sub = %player_id, %side, "cannot confirm a player not on this side");
                return Ok(Outcome::Ignored);
            };
            let partner = roster
                .partner(seat)
                .filter(|partner| partner.confirmed)
                .map(|partner| partner.id.clone());
            (seat, partner)
        };

        // Resolve the team before touching the roster so a failed lookup leaves no trace.
        let pair_confirmed = partner.is_some();
        let team = match partner {
            Some(partner) => self.store.find_team(player_id.clone(), partner).await?,
            None => None,
        };

        let mut roster = self.game.roster_mut().await;
        roster.confirm(seat);
        info!(sub = %player_id, %side, "player confirmed");
        match team {
            Some(team) => {
                info!(%side, team = %team.name, "team resolved");
                roster.bind_team(side, Team::from(team));
            }
            None if pair_confirmed => debug!(%side, "no team registered for this pair yet"),
            None => {}
        }
        let ready = roster.is_ready() && !roster.started;
        drop(roster);

        if ready {
            return Ok(self.start().await);
        }
        Ok(Outcome::Applied)
    }

    async fn register_team(&self, registration: TeamRegistration) -> Outcome {
        if self.game.roster().await.started {
            debug!("team registration ignored while a match is in progress");
            return Outcome::Ignored;
        }
        if !registration.is_well_formed() {
            debug!(?registration, "invalid team registration");
            return self.reset(ResetReason::InvalidTeam).await;
        }

        let TeamRegistration {
            side,
            player_1,
            player_2,
            city,
            name,
        } = registration;
        let team = NewTeamEntity {
            city,
            name,
            player1: player_1,
            player2: player_2,
        };

        match self.store.count_conflicting_teams(team.clone()).await {
            Ok(0) => {}
            Ok(conflicts) => {
                info!(conflicts, city = %team.city, name = %team.name, "team already taken");
                return self.reset(ResetReason::InvalidTeam).await;
            }
            Err(err) => {
                warn!(error = %err, "failed to check existing teams");
                return self.reset(ResetReason::InvalidTeam).await;
            }
        }

        let team_id = match self.store.create_team(team.clone()).await {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "failed to create team");
                return self.reset(ResetReason::TeamCreationFailed).await;
            }
        };
        info!(%team_id, city = %team.city, name = %team.name, "team created");

        let Some(side) = side else {
            return self.reset(ResetReason::TeamSetupFailed).await;
        };

        let mut roster = self.game.roster_mut().await;
        roster.bind_team(
            side,
            Team {
                id: team_id,
                city: team.city,
                name: team.name,
            },
        );
        let ready = roster.is_ready() && !roster.started;
        drop(roster);

        if ready {
            return self.start().await;
        }
        Outcome::Applied
    }

    /// Open the game record and flip the match to in-progress.
    async fn start(&self) -> Outcome {
        let Some((black, yellow)) = self.game.roster().await.team_ids() else {
            return Outcome::Applied;
        };

        match self.store.create_game(black, yellow).await {
            Ok(game_id) => {
                let mut guard = self.game.lock_all().await;
                guard.roster.game_id = Some(game_id);
                guard.roster.started = true;
                guard.roster.over = false;
                *guard.scores = Scoreboard::default();
                info!(%game_id, "match started");
                Outcome::Applied
            }
            Err(err) => {
                warn!(error = %err, "failed to create game");
                self.reset(ResetReason::StartFailed).await
            }
        }
    }

    /// Score (`delta = 1`) or cancel (`delta = -1`) a goal for the player's side.
    async fn adjust_score(&self, player_id: &str, delta: i32) -> Outcome {
        let mut guard = self.game.lock_all().await;
        if !guard.roster.started || guard.roster.over {
            return Outcome::Ignored;
        }
        let Some(seat) = guard.roster.seat_of(player_id) else {
            debug!(sub = %player_id, "goal for a player not in the match");
            return Outcome::Ignored;
        };
        if delta < 0 && guard.roster.player(seat).is_some_and(|player| player.goals == 0) {
            debug!(sub = %player_id, "no goal left to undo");
            return Outcome::Ignored;
        }

        guard.roster.add_goals(seat, delta);
        guard.scores.add(seat.side, delta);
        debug!(
            sub = %player_id,
            black = guard.scores.black,
            yellow = guard.scores.yellow,
            "score changed"
        );

        if guard.scores.get(seat.side) < WINNING_SCORE {
            return Outcome::Applied;
        }

        // Finalize and clear under the same guards: no reader sees the finished match.
        guard.roster.over = true;
        self.persist_result(&guard).await;
        reset_locked(&mut guard, ResetReason::GameOver)
    }

    /// Best-effort persistence of the final score and every player's tally.
    async fn persist_result(&self, guard: &MatchGuard<'_>) {
        let Some(game_id) = guard.roster.game_id else {
            warn!("finished match has no game record");
            return;
        };
        let scores = *guard.scores;

        if let Err(err) = self
            .store
            .finalize_game(game_id, scores.black, scores.yellow)
            .await
        {
            warn!(%game_id, error = %err, "failed to finalize game");
        }
        for player in guard.roster.players() {
            if let Err(err) = self
                .store
                .record_player_goals(game_id, player.id.clone(), player.goals)
                .await
            {
                warn!(%game_id, sub = %player.id, error = %err, "failed to record player goals");
            }
        }
        info!(%game_id, black = scores.black, yellow = scores.yellow, "game over");
    }

    async fn reset(&self, reason: ResetReason) -> Outcome {
        let mut guard = self.game.lock_all().await;
        reset_locked(&mut guard, reason)
    }
}

fn reset_locked(guard: &mut MatchGuard<'_>, reason: ResetReason) -> Outcome {
    guard.reset();
    info!(%reason, "match reset");
    Outcome::Reset(reason)
}
