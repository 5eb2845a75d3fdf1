use std::time::Duration;

use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use tokio::time::sleep;
use tracing::{debug, info};

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

pub(super) const PLAYER_COLLECTION: &str = "players";
pub(super) const TEAM_COLLECTION: &str = "teams";
pub(super) const GAME_COLLECTION: &str = "games";
pub(super) const GOALS_COLLECTION: &str = "player_goals";

const PING_ATTEMPTS: u32 = 10;
const FIRST_RETRY: Duration = Duration::from_millis(250);
const MAX_RETRY: Duration = Duration::from_secs(5);

/// Connect to the archive, wait for the server and make sure the unique indexes
/// behind team registration and goal tallies exist.
pub(super) async fn open_archive(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = config.client()?;
    let database = client.database(config.database_name());
    wait_for_server(&database).await?;
    ensure_indexes(&database).await?;
    info!(database = config.database_name(), "match archive ready");
    Ok((client, database))
}

async fn wait_for_server(database: &Database) -> MongoResult<()> {
    let mut attempt = 0;
    let mut delay = FIRST_RETRY;
    loop {
        attempt += 1;
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok(()),
            Err(source) if attempt >= PING_ATTEMPTS => {
                return Err(MongoDaoError::InitialPing {
                    attempts: attempt,
                    source,
                });
            }
            Err(err) => {
                debug!(attempt, error = %err, "MongoDB not answering yet");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY);
            }
        }
    }
}

async fn ensure_indexes(database: &Database) -> MongoResult<()> {
    let teams = database.collection::<Document>(TEAM_COLLECTION);
    unique_index(&teams, TEAM_COLLECTION, "city", doc! { "city": 1 }).await?;
    unique_index(&teams, TEAM_COLLECTION, "name", doc! { "name": 1 }).await?;

    let goals = database.collection::<Document>(GOALS_COLLECTION);
    unique_index(
        &goals,
        GOALS_COLLECTION,
        "game_id,player_id",
        doc! { "game_id": 1, "player_id": 1 },
    )
    .await
}

async fn unique_index(
    collection: &Collection<Document>,
    collection_name: &'static str,
    index: &'static str,
    keys: Document,
) -> MongoResult<()> {
    let model = IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(Some(format!("{collection_name}_{}_unique", index.replace(',', "_"))))
                .unique(Some(true))
                .build(),
        )
        .build();
    collection
        .create_index(model)
        .await
        .map_err(|source| MongoDaoError::EnsureIndex {
            collection: collection_name,
            index,
            source,
        })?;
    Ok(())
}
