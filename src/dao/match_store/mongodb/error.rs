use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to load player `{id}`")]
    LoadPlayer {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to look up team for `{player_a}` and `{player_b}`")]
    FindTeam {
        player_a: String,
        player_b: String,
        #[source]
        source: MongoError,
    },
    #[error("team document is corrupt")]
    CorruptTeam {
        #[source]
        source: uuid::Error,
    },
    #[error("failed to count teams conflicting with `{city} {name}`")]
    CountTeams {
        city: String,
        name: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert team `{city} {name}`")]
    InsertTeam {
        city: String,
        name: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert game `{id}`")]
    InsertGame {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to finalize game `{id}`")]
    FinalizeGame {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("game `{id}` does not exist")]
    MissingGame { id: Uuid },
    #[error("failed to record goals of `{player}` in game `{game}`")]
    RecordGoals {
        game: Uuid,
        player: String,
        #[source]
        source: MongoError,
    },
}
