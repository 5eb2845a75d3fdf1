use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::{
        GAME_COLLECTION, GOALS_COLLECTION, PLAYER_COLLECTION, TEAM_COLLECTION, open_archive,
    },
    error::{MongoDaoError, MongoResult},
    models::{
        MongoGameDocument, MongoPlayerDocument, MongoPlayerGoalsDocument, MongoTeamDocument,
        doc_id, pair_filter, pair_or,
    },
};
use crate::dao::{
    match_store::MatchStore,
    models::{GameEntity, NewTeamEntity, TeamEntity},
    storage::StorageResult,
};

#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = open_archive(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        info!("MongoDB connection re-established");
        Ok(())
    }
}

impl MongoMatchStore {
    /// Open the match archive described by `config`.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = open_archive(&config).await?;
        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });
        Ok(Self { inner })
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn players(&self) -> Collection<MongoPlayerDocument> {
        self.database().await.collection(PLAYER_COLLECTION)
    }

    async fn teams(&self) -> Collection<MongoTeamDocument> {
        self.database().await.collection(TEAM_COLLECTION)
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        self.database().await.collection(GAME_COLLECTION)
    }

    async fn goals(&self) -> Collection<MongoPlayerGoalsDocument> {
        self.database().await.collection(GOALS_COLLECTION)
    }

    async fn player_picture(&self, id: String) -> MongoResult<Option<String>> {
        let player = self
            .players()
            .await
            .find_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::LoadPlayer { id, source })?;
        Ok(player.map(|player| player.picture))
    }

    async fn find_team(
        &self,
        player_a: String,
        player_b: String,
    ) -> MongoResult<Option<TeamEntity>> {
        let document = self
            .teams()
            .await
            .find_one(pair_filter(&player_a, &player_b))
            .await
            .map_err(|source| MongoDaoError::FindTeam {
                player_a,
                player_b,
                source,
            })?;

        document
            .map(TeamEntity::try_from)
            .transpose()
            .map_err(|source| MongoDaoError::CorruptTeam { source })
    }

    async fn count_conflicting_teams(&self, team: NewTeamEntity) -> MongoResult<u64> {
        let filter = pair_or(
            &team.player1,
            &team.player2,
            [doc! { "city": team.city.as_str() }, doc! { "name": team.name.as_str() }],
        );

        self.teams()
            .await
            .count_documents(filter)
            .await
            .map_err(|source| MongoDaoError::CountTeams {
                city: team.city,
                name: team.name,
                source,
            })
    }

    async fn create_team(&self, team: NewTeamEntity) -> MongoResult<Uuid> {
        let id = Uuid::new_v4();
        let (city, name) = (team.city.clone(), team.name.clone());
        self.teams()
            .await
            .insert_one(MongoTeamDocument::new(id, team))
            .await
            .map_err(|source| MongoDaoError::InsertTeam { city, name, source })?;
        Ok(id)
    }

    async fn create_game(&self, black_team: Uuid, yellow_team: Uuid) -> MongoResult<Uuid> {
        let game = GameEntity::new(black_team, yellow_team);
        let id = game.id;
        self.games()
            .await
            .insert_one(MongoGameDocument::from(game))
            .await
            .map_err(|source| MongoDaoError::InsertGame { id, source })?;
        Ok(id)
    }

    async fn finalize_game(
        &self,
        id: Uuid,
        black_score: u32,
        yellow_score: u32,
    ) -> MongoResult<()> {
        let result = self
            .games()
            .await
            .update_one(
                doc_id(id),
                doc! {
                    "$set": {
                        "ended_at": DateTime::from_system_time(SystemTime::now()),
                        "black_score": black_score as i32,
                        "yellow_score": yellow_score as i32,
                    }
                },
            )
            .await
            .map_err(|source| MongoDaoError::FinalizeGame { id, source })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::MissingGame { id });
        }
        Ok(())
    }

    async fn record_player_goals(&self, game: Uuid, player: String, goals: u32) -> MongoResult<()> {
        let document = MongoPlayerGoalsDocument {
            game_id: game.to_string(),
            player_id: player.clone(),
            goals: goals as i32,
        };
        self.goals()
            .await
            .replace_one(
                doc! { "game_id": game.to_string(), "player_id": player.as_str() },
                &document,
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::RecordGoals {
                game,
                player,
                source,
            })?;
        Ok(())
    }
}

impl MatchStore for MongoMatchStore {
    fn player_picture(
        &self,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move { store.player_picture(player_id).await.map_err(Into::into) })
    }

    fn find_team(
        &self,
        player_a: String,
        player_b: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_team(player_a, player_b)
                .await
                .map_err(Into::into)
        })
    }

    fn count_conflicting_teams(
        &self,
        team: NewTeamEntity,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .count_conflicting_teams(team)
                .await
                .map_err(Into::into)
        })
    }

    fn create_team(&self, team: NewTeamEntity) -> BoxFuture<'static, StorageResult<Uuid>> {
        let store = self.clone();
        Box::pin(async move { store.create_team(team).await.map_err(Into::into) })
    }

    fn create_game(
        &self,
        black_team: Uuid,
        yellow_team: Uuid,
    ) -> BoxFuture<'static, StorageResult<Uuid>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .create_game(black_team, yellow_team)
                .await
                .map_err(Into::into)
        })
    }

    fn finalize_game(
        &self,
        game_id: Uuid,
        black_score: u32,
        yellow_score: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .finalize_game(game_id, black_score, yellow_score)
                .await
                .map_err(Into::into)
        })
    }

    fn record_player_goals(
        &self,
        game_id: Uuid,
        player_id: String,
        goals: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .record_player_goals(game_id, player_id, goals)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
