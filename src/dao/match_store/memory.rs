use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::SystemTime,
};

use dashmap::{DashMap, DashSet};
use futures::future::BoxFuture;
use uuid::Uuid;

use super::MatchStore;
use crate::dao::{
    models::{GameEntity, NewTeamEntity, PlayerEntity, TeamEntity},
    storage::{StorageError, StorageResult},
};

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    PlayerPicture,
    FindTeam,
    CountConflictingTeams,
    CreateTeam,
    CreateGame,
    FinalizeGame,
    RecordPlayerGoals,
    /// Covers both the health check and reconnection.
    HealthCheck,
}

/// Process-local store backed by concurrent maps.
///
/// Used when no database is configured and by the test-suite, which relies on the
/// failure injection and inspection helpers.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    players: DashMap<String, PlayerEntity>,
    teams: DashMap<Uuid, TeamEntity>,
    games: DashMap<Uuid, GameEntity>,
    player_goals: DashMap<(Uuid, String), u32>,
    failures: DashSet<StoreOperation>,
    finalize_calls: AtomicUsize,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision (or refresh) a player record.
    pub fn insert_player(&self, id: impl Into<String>, picture: impl Into<String>) {
        let id = id.into();
        self.inner.players.insert(
            id.clone(),
            PlayerEntity {
                id,
                picture: picture.into(),
            },
        );
    }

    /// Make every future call to `operation` fail until [`Self::recover`] is called.
    pub fn fail(&self, operation: StoreOperation) {
        self.inner.failures.insert(operation);
    }

    pub fn recover(&self, operation: StoreOperation) {
        self.inner.failures.remove(&operation);
    }

    pub fn teams(&self) -> Vec<TeamEntity> {
        self.inner.teams.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn game(&self, id: Uuid) -> Option<GameEntity> {
        self.inner.games.get(&id).map(|entry| entry.value().clone())
    }

    pub fn player_goals(&self, game_id: Uuid, player_id: &str) -> Option<u32> {
        self.inner
            .player_goals
            .get(&(game_id, player_id.to_owned()))
            .map(|entry| *entry.value())
    }

    /// Number of finalize calls received so far, successful or not.
    pub fn finalize_calls(&self) -> usize {
        self.inner.finalize_calls.load(Ordering::SeqCst)
    }

    fn check(&self, operation: StoreOperation) -> StorageResult<()> {
        if self.inner.failures.contains(&operation) {
            return Err(StorageError::unavailable(
                format!("{operation:?} failed"),
                io::Error::other("injected failure"),
            ));
        }
        Ok(())
    }

    fn insert_team(&self, team: NewTeamEntity) -> StorageResult<Uuid> {
        self.check(StoreOperation::CreateTeam)?;
        if self
            .inner
            .teams
            .iter()
            .any(|existing| existing.conflicts_with(&team))
        {
            return Err(StorageError::Rejected(format!(
                "team `{} {}` already exists",
                team.city, team.name
            )));
        }

        let id = Uuid::new_v4();
        self.inner.teams.insert(
            id,
            TeamEntity {
                id,
                city: team.city,
                name: team.name,
                player1: team.player1,
                player2: team.player2,
            },
        );
        Ok(id)
    }

    fn close_game(&self, game_id: Uuid, black_score: u32, yellow_score: u32) -> StorageResult<()> {
        self.inner.finalize_calls.fetch_add(1, Ordering::SeqCst);
        self.check(StoreOperation::FinalizeGame)?;
        let mut game = self
            .inner
            .games
            .get_mut(&game_id)
            .ok_or_else(|| StorageError::Rejected(format!("game `{game_id}` not found")))?;
        game.black_score = black_score;
        game.yellow_score = yellow_score;
        game.ended_at = Some(SystemTime::now());
        Ok(())
    }
}

impl MatchStore for MemoryMatchStore {
    fn player_picture(
        &self,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move {
            store.check(StoreOperation::PlayerPicture)?;
            Ok(store
                .inner
                .players
                .get(&player_id)
                .map(|player| player.picture.clone()))
        })
    }

    fn find_team(
        &self,
        player_a: String,
        player_b: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.check(StoreOperation::FindTeam)?;
            Ok(store
                .inner
                .teams
                .iter()
                .find(|team| team.pairs(&player_a, &player_b))
                .map(|team| team.value().clone()))
        })
    }

    fn count_conflicting_teams(
        &self,
        team: NewTeamEntity,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store.check(StoreOperation::CountConflictingTeams)?;
            let count = store
                .inner
                .teams
                .iter()
                .filter(|existing| existing.conflicts_with(&team))
                .count();
            Ok(count as u64)
        })
    }

    fn create_team(&self, team: NewTeamEntity) -> BoxFuture<'static, StorageResult<Uuid>> {
        let store = self.clone();
        Box::pin(async move { store.insert_team(team) })
    }

    fn create_game(
        &self,
        black_team: Uuid,
        yellow_team: Uuid,
    ) -> BoxFuture<'static, StorageResult<Uuid>> {
        let store = self.clone();
        Box::pin(async move {
            store.check(StoreOperation::CreateGame)?;
            let game = GameEntity::new(black_team, yellow_team);
            let id = game.id;
            store.inner.games.insert(id, game);
            Ok(id)
        })
    }

    fn finalize_game(
        &self,
        game_id: Uuid,
        black_score: u32,
        yellow_score: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.close_game(game_id, black_score, yellow_score) })
    }

    fn record_player_goals(
        &self,
        game_id: Uuid,
        player_id: String,
        goals: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.check(StoreOperation::RecordPlayerGoals)?;
            store.inner.player_goals.insert((game_id, player_id), goals);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.check(StoreOperation::HealthCheck) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.check(StoreOperation::HealthCheck) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_team(city: &str, name: &str, p1: &str, p2: &str) -> NewTeamEntity {
        NewTeamEntity {
            city: city.into(),
            name: name.into(),
            player1: p1.into(),
            player2: p2.into(),
        }
    }

    #[tokio::test]
    async fn find_team_matches_pair_in_either_order() {
        let store = MemoryMatchStore::new();
        let id = store
            .create_team(new_team("Metro", "Falcons", "p1", "p2"))
            .await
            .unwrap();

        let found = store.find_team("p2".into(), "p1".into()).await.unwrap();
        assert_eq!(found.map(|team| team.id), Some(id));
        assert!(store.find_team("p1".into(), "p3".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conflicts_count_pair_city_and_name() {
        let store = MemoryMatchStore::new();
        store
            .create_team(new_team("Metro", "Falcons", "p1", "p2"))
            .await
            .unwrap();

        let count = |team| store.count_conflicting_teams(team);
        assert_eq!(count(new_team("Metro", "Owls", "p3", "p4")).await.unwrap(), 1);
        assert_eq!(count(new_team("Harbor", "Falcons", "p3", "p4")).await.unwrap(), 1);
        assert_eq!(count(new_team("Harbor", "Owls", "p2", "p1")).await.unwrap(), 1);
        assert_eq!(count(new_team("Harbor", "Owls", "p3", "p4")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_failures_until_recovered() {
        let store = MemoryMatchStore::new();
        store.insert_player("p1", "https://pics/p1.png");
        store.fail(StoreOperation::PlayerPicture);
        assert!(store.player_picture("p1".into()).await.is_err());

        store.recover(StoreOperation::PlayerPicture);
        assert_eq!(
            store.player_picture("p1".into()).await.unwrap().as_deref(),
            Some("https://pics/p1.png")
        );
    }

    #[tokio::test]
    async fn finalize_records_scores_and_end_time() {
        let store = MemoryMatchStore::new();
        let game_id = store.create_game(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
        store.finalize_game(game_id, 5, 3).await.unwrap();

        let game = store.game(game_id).unwrap();
        assert_eq!((game.black_score, game.yellow_score), (5, 3));
        assert!(game.ended_at.is_some());
        assert_eq!(store.finalize_calls(), 1);
    }
}
