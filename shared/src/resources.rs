use crate::kinds::ResourceKind;
use serde::{Deserialize, Serialize};

/// Non-negative quantity of every resource kind held by one player.
///
/// Also used for costs: a cost is just the balance that must be deducted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBalance {
    #[serde(default)]
    pub food: u32,
    #[serde(default)]
    pub wood: u32,
    #[serde(default)]
    pub stone: u32,
    #[serde(default)]
    pub gold: u32,
}

impl ResourceBalance {
    pub const fn new(food: u32, wood: u32, stone: u32, gold: u32) -> Self {
        Self {
            food,
            wood,
            stone,
            gold,
        }
    }

    pub fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Gold => self.gold,
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut u32 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Stone => &mut self.stone,
            ResourceKind::Gold => &mut self.gold,
        }
    }

    /// Credits `amount` of `kind`, saturating at `u32::MAX`.
    pub fn credit(&mut self, kind: ResourceKind, amount: u32) {
        let slot = self.slot_mut(kind);
        *slot = slot.saturating_add(amount);
    }

    /// True when every component of `cost` is affordable.
    pub fn covers(&self, cost: &ResourceBalance) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|kind| self.get(*kind) >= cost.get(*kind))
    }

    /// Returns the balance after paying `cost`, or `None` if unaffordable.
    pub fn checked_sub(&self, cost: &ResourceBalance) -> Option<ResourceBalance> {
        Some(ResourceBalance {
            food: self.food.checked_sub(cost.food)?,
            wood: self.wood.checked_sub(cost.wood)?,
            stone: self.stone.checked_sub(cost.stone)?,
            gold: self.gold.checked_sub(cost.gold)?,
        })
    }

    /// Applies a signed adjustment; `None` if any component would go negative.
    pub fn adjusted(&self, adjustment: &ResourceAdjustment) -> Option<ResourceBalance> {
        fn apply(current: u32, delta: i32) -> Option<u32> {
            let next = i64::from(current) + i64::from(delta);
            u32::try_from(next).ok()
        }

        Some(ResourceBalance {
            food: apply(self.food, adjustment.food)?,
            wood: apply(self.wood, adjustment.wood)?,
            stone: apply(self.stone, adjustment.stone)?,
            gold: apply(self.gold, adjustment.gold)?,
        })
    }
}

/// Signed per-kind change requested by a `resourceUpdate` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAdjustment {
    #[serde(default)]
    pub food: i32,
    #[serde(default)]
    pub wood: i32,
    #[serde(default)]
    pub stone: i32,
    #[serde(default)]
    pub gold: i32,
}

impl ResourceAdjustment {
    /// Largest absolute component, used for bounds validation.
    pub fn max_magnitude(&self) -> u32 {
        [self.food, self.wood, self.stone, self.gold]
            .iter()
            .map(|v| v.unsigned_abs())
            .max()
            .unwrap_or(0)
    }
}
