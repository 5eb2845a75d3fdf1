use std::env;

use mongodb::{Client, options::ClientOptions};

use super::error::{MongoDaoError, MongoResult};

const URI_ENV: &str = "MONGO_URI";
const DATABASE_ENV: &str = "MONGO_DB";
const DEFAULT_URI: &str = "mongodb://localhost:27017";
const DEFAULT_DATABASE: &str = "foosball";
const APP_NAME: &str = "foosball-back";

/// Location of the match archive.
#[derive(Clone)]
pub struct MongoConfig {
    options: ClientOptions,
    database_name: String,
}

impl MongoConfig {
    /// Read `MONGO_URI` and `MONGO_DB`, defaulting to a local server and the `foosball`
    /// database.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = env::var(URI_ENV).unwrap_or_else(|_| DEFAULT_URI.to_owned());
        let database = env::var(DATABASE_ENV).ok();
        Self::from_uri(&uri, database.as_deref()).await
    }

    pub async fn from_uri(uri: &str, database: Option<&str>) -> MongoResult<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;
        options.app_name.get_or_insert_with(|| APP_NAME.to_owned());

        let database_name = database
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_DATABASE)
            .to_owned();
        Ok(Self {
            options,
            database_name,
        })
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub(super) fn client(&self) -> MongoResult<Client> {
        Client::with_options(self.options.clone())
            .map_err(|source| MongoDaoError::ClientConstruction { source })
    }
}
