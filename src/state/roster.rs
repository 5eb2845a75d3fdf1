use std::{collections::HashMap, fmt, str::FromStr};

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::TeamEntity;

/// Number of players per side.
pub const SLOTS_PER_SIDE: usize = 2;

/// One of the two sides of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Black,
    Yellow,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Black, Side::Yellow];

    pub fn other(self) -> Side {
        match self {
            Side::Black => Side::Yellow,
            Side::Yellow => Side::Black,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Black => 0,
            Side::Yellow => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Black => f.write_str("black"),
            Side::Yellow => f.write_str("yellow"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown side `{0}`")]
pub struct UnknownSide(pub String);

impl FromStr for Side {
    type Err = UnknownSide;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "black" => Ok(Side::Black),
            "yellow" => Ok(Side::Yellow),
            other => Err(UnknownSide(other.to_owned())),
        }
    }
}

/// Position of a player at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seat {
    pub side: Side,
    pub slot: usize,
}

/// Player occupying a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// External identifier (`sub`) of the player.
    pub id: String,
    pub picture: String,
    pub confirmed: bool,
    /// Goals scored by this player in the current match.
    pub goals: u32,
}

impl Player {
    pub fn new(id: String, picture: String) -> Self {
        Self {
            id,
            picture,
            confirmed: false,
            goals: 0,
        }
    }
}

/// Team bound to a side for the current match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: Uuid,
    pub city: String,
    pub name: String,
}

impl From<TeamEntity> for Team {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            city: value.city,
            name: value.name,
        }
    }
}

/// Slots and team binding of one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideRoster {
    pub slots: [Option<Player>; SLOTS_PER_SIDE],
    pub team: Option<Team>,
}

impl SideRoster {
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn is_confirmed(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| slot.as_ref().is_some_and(|player| player.confirmed))
    }

    fn first_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }
}

/// Roster partition of the match aggregate: who sits where, the team bindings, and
/// the lifecycle flags.
///
/// Slots are the source of truth; `seats` indexes them by player id so membership
/// checks do not scan both sides. Every mutation goes through methods that keep the
/// two in agreement.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    sides: [SideRoster; 2],
    seats: HashMap<String, Seat>,
    pub started: bool,
    pub over: bool,
    pub game_id: Option<Uuid>,
}

impl Roster {
    pub fn side(&self, side: Side) -> &SideRoster {
        &self.sides[side.index()]
    }

    pub fn seat_of(&self, player_id: &str) -> Option<Seat> {
        self.seats.get(player_id).copied()
    }

    /// Seat of `player_id` if it sits on `side`.
    pub fn seat_on(&self, side: Side, player_id: &str) -> Option<Seat> {
        self.seat_of(player_id).filter(|seat| seat.side == side)
    }

    pub fn player(&self, seat: Seat) -> Option<&Player> {
        self.side(seat.side).slots[seat.slot].as_ref()
    }

    /// Occupant of the other slot on the same side.
    pub fn partner(&self, seat: Seat) -> Option<&Player> {
        self.side(seat.side)
            .slots
            .iter()
            .enumerate()
            .find(|(slot, _)| *slot != seat.slot)
            .and_then(|(_, player)| player.as_ref())
    }

    fn player_mut(&mut self, seat: Seat) -> Option<&mut Player> {
        self.sides[seat.side.index()].slots[seat.slot].as_mut()
    }

    /// Seat a player in the first free slot of `side`.
    ///
    /// Returns `None` when the side is full or the player already sits somewhere.
    pub fn place(&mut self, side: Side, player: Player) -> Option<Seat> {
        if self.seats.contains_key(&player.id) {
            return None;
        }
        let slot = self.side(side).first_free_slot()?;
        let seat = Seat { side, slot };
        self.seats.insert(player.id.clone(), seat);
        self.sides[side.index()].slots[slot] = Some(player);
        Some(seat)
    }

    /// Clear the slot `player_id` holds on `side`.
    ///
    /// The side loses its team binding too, since the binding belongs to the pair.
    pub fn remove(&mut self, side: Side, player_id: &str) -> Option<Player> {
        let seat = self.seat_on(side, player_id)?;
        self.seats.remove(player_id);
        let roster = &mut self.sides[side.index()];
        roster.team = None;
        roster.slots[seat.slot].take()
    }

    pub fn confirm(&mut self, seat: Seat) {
        if let Some(player) = self.player_mut(seat) {
            player.confirmed = true;
        }
    }

    pub fn bind_team(&mut self, side: Side, team: Team) {
        self.sides[side.index()].team = Some(team);
    }

    /// Adjust the personal tally of the player at `seat`.
    pub fn add_goals(&mut self, seat: Seat, delta: i32) {
        if let Some(player) = self.player_mut(seat) {
            player.goals = player.goals.saturating_add_signed(delta);
        }
    }

    /// All four slots confirmed and both teams resolved.
    pub fn is_ready(&self) -> bool {
        self.sides
            .iter()
            .all(|side| side.is_confirmed() && side.team.is_some())
    }

    /// Team ids of (black, yellow) when both are resolved.
    pub fn team_ids(&self) -> Option<(Uuid, Uuid)> {
        let black = self.side(Side::Black).team.as_ref()?;
        let yellow = self.side(Side::Yellow).team.as_ref()?;
        Some((black.id, yellow.id))
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.sides
            .iter()
            .flat_map(|side| side.slots.iter().flatten())
    }

    /// Return to the empty roster.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
