pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{NewTeamEntity, TeamEntity},
    storage::StorageResult,
};

pub use memory::MemoryMatchStore;

/// Abstraction over the persistence layer consulted by the match controller.
///
/// Every call is awaited inline by the controller, so a slow backend stalls the
/// whole match. Implementations should keep each operation to a single round trip.
pub trait MatchStore: Send + Sync {
    /// Picture URL of a provisioned player, `None` when the player is unknown.
    fn player_picture(
        &self,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Team pairing both players (in either order), if one was registered.
    fn find_team(
        &self,
        player_a: String,
        player_b: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Number of teams that already use this pair, this city or this name.
    fn count_conflicting_teams(
        &self,
        team: NewTeamEntity,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    /// Persist a new team and return its identifier.
    fn create_team(&self, team: NewTeamEntity) -> BoxFuture<'static, StorageResult<Uuid>>;
    /// Open a game record between two teams and return its identifier.
    fn create_game(
        &self,
        black_team: Uuid,
        yellow_team: Uuid,
    ) -> BoxFuture<'static, StorageResult<Uuid>>;
    /// Record the end timestamp and final scores of a game.
    fn finalize_game(
        &self,
        game_id: Uuid,
        black_score: u32,
        yellow_score: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Record how many goals a player scored in a game.
    fn record_player_goals(
        &self,
        game_id: Uuid,
        player_id: String,
        goals: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
