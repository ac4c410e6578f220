//! An explicit owner for live games, keyed by id. Callers hold the store and
//! pass it where it is needed; nothing here is global.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::Game;
use crate::error::{CantStopError, CsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct GameStore {
    games: BTreeMap<GameId, Game>,
    next_id: u64,
}

impl GameStore {
    pub fn new() -> Self {
        GameStore::default()
    }

    fn insert(&mut self, game: Game) -> GameId {
        self.next_id += 1;
        let id = GameId(self.next_id);
        self.games.insert(id, game);
        id
    }

    pub fn create_solo(&mut self) -> GameId {
        self.insert(Game::new_solo())
    }

    pub fn create_duel(&mut self) -> GameId {
        self.insert(Game::new_duel())
    }

    pub fn get(&self, id: GameId) -> CsResult<&Game> {
        self.games.get(&id).ok_or(CantStopError::GameNotFound(id.0))
    }

    pub fn get_mut(&mut self, id: GameId) -> CsResult<&mut Game> {
        self.games.get_mut(&id).ok_or(CantStopError::GameNotFound(id.0))
    }

    pub fn remove(&mut self, id: GameId) -> CsResult<Game> {
        self.games.remove(&id).ok_or(CantStopError::GameNotFound(id.0))
    }

    pub fn snapshot(&self, id: GameId) -> CsResult<String> {
        self.get(id)?.snapshot()
    }

    /// Replace the game under `id` with a snapshot, or adopt it under a new id.
    pub fn restore(&mut self, id: Option<GameId>, snapshot: &str) -> CsResult<GameId> {
        let game = Game::restore(snapshot)?;
        match id {
            Some(id) => {
                *self.get_mut(id)? = game;
                Ok(id)
            }
            None => Ok(self.insert(game)),
        }
    }

    pub fn ids(&self) -> Vec<GameId> {
        self.games.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
