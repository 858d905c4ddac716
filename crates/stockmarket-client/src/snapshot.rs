//! Cache of the last `update` pushed by the server.

use stockmarket_core::{GameSnapshot, Money, PlayerData, Share};

#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    latest: Option<GameSnapshot>,
}

impl SnapshotCache {
    /// Replace the cached snapshot, returning the previous current player.
    pub fn store(&mut self, snapshot: GameSnapshot) -> Option<String> {
        let previous = self.current_player().map(str::to_string);
        self.latest = Some(snapshot);
        previous
    }

    pub fn clear(&mut self) {
        self.latest = None;
    }

    pub fn get(&self) -> Option<&GameSnapshot> {
        self.latest.as_ref()
    }

    pub fn current_player(&self) -> Option<&str> {
        self.latest.as_ref()?.current_player.as_deref()
    }

    pub fn is_turn_of(&self, name: &str) -> bool {
        self.current_player() == Some(name)
    }

    pub fn player(&self, name: &str) -> Option<&PlayerData> {
        self.latest.as_ref()?.players.get(name)
    }

    pub fn price(&self, share: Share) -> Option<Money> {
        self.latest.as_ref()?.share_prices.get(&share).copied()
    }

    /// Net worth of `name` at cached prices.
    pub fn net_worth(&self, name: &str) -> Option<Money> {
        let snapshot = self.latest.as_ref()?;
        let player = snapshot.players.get(name)?;
        Some(player.net_worth(&snapshot.share_prices))
    }
}
