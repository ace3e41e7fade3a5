use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::asset::AssetClass;

/// Net holding of one symbol at a cutoff. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub net_quantity: Decimal,
}

impl Position {
    /// Only strictly positive quantities count as a holding.
    pub fn is_held(&self) -> bool {
        self.net_quantity > Decimal::ZERO
    }
}

/// Symbol → position, ordered by symbol so iteration is deterministic.
///
/// Missing symbols read as zero through [`PositionTable::quantity_or_zero`];
/// nothing is inserted on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionTable {
    positions: BTreeMap<String, Position>,
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quantity_or_zero(&self, symbol: &str) -> Decimal {
        self.positions
            .get(symbol)
            .map(|p| p.net_quantity)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Add `delta` to the symbol's quantity. The last asset class seen wins.
    pub fn adjust(&mut self, symbol: &str, asset_class: AssetClass, delta: Decimal) {
        let entry = self
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position {
                symbol: symbol.to_string(),
                asset_class,
                net_quantity: Decimal::ZERO,
            });
        entry.asset_class = asset_class;
        entry.net_quantity += delta;
    }

    /// Like [`adjust`](Self::adjust) but never lets the quantity drop below zero.
    pub fn adjust_floored(&mut self, symbol: &str, asset_class: AssetClass, delta: Decimal) {
        self.adjust(symbol, asset_class, delta);
        if let Some(p) = self.positions.get_mut(symbol) {
            if p.net_quantity < Decimal::ZERO {
                p.net_quantity = Decimal::ZERO;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Positions with a strictly positive quantity.
    pub fn held(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|p| p.is_held())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl FromIterator<Position> for PositionTable {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        let mut table = PositionTable::new();
        for p in iter {
            table.adjust(&p.symbol, p.asset_class, p.net_quantity);
        }
        table
    }
}
