use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{GameEntity, NewTeamEntity, TeamEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub picture: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamDocument {
    #[serde(rename = "_id")]
    id: String,
    city: String,
    name: String,
    player1: String,
    player2: String,
}

impl MongoTeamDocument {
    pub fn new(id: Uuid, team: NewTeamEntity) -> Self {
        Self {
            id: id.to_string(),
            city: team.city,
            name: team.name,
            player1: team.player1,
            player2: team.player2,
        }
    }
}

impl TryFrom<MongoTeamDocument> for TeamEntity {
    type Error = uuid::Error;

    fn try_from(value: MongoTeamDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&value.id)?,
            city: value.city,
            name: value.name,
            player1: value.player1,
            player2: value.player2,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: String,
    black_team: String,
    yellow_team: String,
    started_at: DateTime,
    ended_at: Option<DateTime>,
    black_score: i32,
    yellow_score: i32,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id.to_string(),
            black_team: value.black_team.to_string(),
            yellow_team: value.yellow_team.to_string(),
            started_at: DateTime::from_system_time(value.started_at),
            ended_at: value.ended_at.map(DateTime::from_system_time),
            black_score: value.black_score as i32,
            yellow_score: value.yellow_score as i32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerGoalsDocument {
    pub game_id: String,
    pub player_id: String,
    pub goals: i32,
}

pub fn doc_id(id: impl ToString) -> Document {
    doc! {"_id": id.to_string()}
}

/// Filter matching a team made of both players, in either order.
pub fn pair_filter(player_a: &str, player_b: &str) -> Document {
    pair_or(player_a, player_b, std::iter::empty::<Document>())
}

/// Like [`pair_filter`], with `extra` clauses added to the same `$or`.
pub fn pair_or(
    player_a: &str,
    player_b: &str,
    extra: impl IntoIterator<Item = Document>,
) -> Document {
    let mut clauses = vec![
        doc! { "player1": player_a, "player2": player_b },
        doc! { "player1": player_b, "player2": player_a },
    ];
    clauses.extend(extra);
    doc! { "$or": clauses }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clauses(filter: &Document) -> Vec<Document> {
        filter
            .get_array("$or")
            .unwrap()
            .iter()
            .map(|clause| clause.as_document().unwrap().clone())
            .collect()
    }

    #[test]
    fn pair_filter_matches_both_orders() {
        let clauses = clauses(&pair_filter("a", "b"));
        assert_eq!(
            clauses,
            vec![
                doc! { "player1": "a", "player2": "b" },
                doc! { "player1": "b", "player2": "a" },
            ]
        );
    }

    #[test]
    fn conflict_filter_extends_the_pair_clauses() {
        let filter = pair_or("a", "b", [doc! { "city": "Lyon" }, doc! { "name": "Gones" }]);
        let conflict = clauses(&filter);
        assert_eq!(conflict.len(), 4);
        assert_eq!(conflict[..2], clauses(&pair_filter("a", "b"))[..]);
        assert_eq!(conflict[2], doc! { "city": "Lyon" });
        assert_eq!(conflict[3], doc! { "name": "Gones" });
    }
}
