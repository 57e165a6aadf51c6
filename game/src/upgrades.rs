use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeId {
    SpeedUp,
    ExtraReroll,
    SecondChance,
    ScoreMult,
    ClearRow,
    ClearColumn,
    ClearArea,
    ExpandedPreview,
    ExpandedHold,
    ExpandBoard,
    PieceRemoval,
    ObstacleMode,
    GravityCostDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeScope {
    Temporary,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Consumable {
    Row,
    Column,
    Area,
    Gravity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UpgradeEffect {
    SpeedUp { base: f32, jitter: f32 },
    RerollCharges { amount: u32 },
    SecondChance,
    ScoreMultiplier { factor: u64, lines: i32 },
    ConsumableCharges { consumable: Consumable, amount: u32 },
    PreviewDepth { amount: u32 },
    /// One more hold cell; extra cells are timed.
    ExtraHoldCell,
    BoardColumns { amount: u32 },
    PieceRemoval,
    ObstacleFocus,
    GravityCostDown { amount: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDef {
    pub id: UpgradeId,
    pub name: String,
    pub scope: UpgradeScope,
    pub weight: u32,
    pub effect: UpgradeEffect,
    /// How many times the upgrade may be taken per run.
    #[serde(default)]
    pub cap: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeCatalog {
    pub version: u32,
    pub upgrades: Vec<UpgradeDef>,
}

impl Default for UpgradeCatalog {
    fn default() -> Self {
        // Minimal catalog if the embedded asset fails to parse.
        serde_json::from_str(include_str!("../assets/upgrades.json")).unwrap_or_else(|e| {
            log::warn!("upgrade catalog asset unreadable ({e}); using the minimal catalog");
            UpgradeCatalog {
                version: 1,
                upgrades: vec![UpgradeDef {
                    id: UpgradeId::SpeedUp,
                    name: "Speed Up".to_string(),
                    scope: UpgradeScope::Temporary,
                    weight: 1,
                    effect: UpgradeEffect::SpeedUp {
                        base: 1.0,
                        jitter: 0.0,
                    },
                    cap: None,
                }],
            }
        })
    }
}

impl UpgradeCatalog {
    pub fn get(&self, id: UpgradeId) -> Option<&UpgradeDef> {
        self.upgrades.iter().find(|def| def.id == id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumableCharges {
    pub row: u32,
    pub column: u32,
    pub area: u32,
    pub gravity: u32,
}

impl ConsumableCharges {
    pub fn get(&self, consumable: Consumable) -> u32 {
        match consumable {
            Consumable::Row => self.row,
            Consumable::Column => self.column,
            Consumable::Area => self.area,
            Consumable::Gravity => self.gravity,
        }
    }

    fn slot(&mut self, consumable: Consumable) -> &mut u32 {
        match consumable {
            Consumable::Row => &mut self.row,
            Consumable::Column => &mut self.column,
            Consumable::Area => &mut self.area,
            Consumable::Gravity => &mut self.gravity,
        }
    }

    pub fn add(&mut self, consumable: Consumable, amount: u32) {
        let slot = self.slot(consumable);
        *slot = slot.saturating_add(amount);
    }

    /// Takes `cost` charges if available.
    pub fn spend(&mut self, consumable: Consumable, cost: u32) -> bool {
        let slot = self.slot(consumable);
        if *slot < cost || cost == 0 {
            return false;
        }
        *slot -= cost;
        true
    }
}

/// Modifiers that last for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempUpgrades {
    pub speed_up: f32,
    pub reroll_charges: u32,
    pub second_chance: bool,
    pub score_multiplier: u64,
    pub score_multiplier_lines: i32,
    pub charges: ConsumableCharges,
}

impl Default for TempUpgrades {
    fn default() -> Self {
        Self {
            speed_up: 0.0,
            reroll_charges: 0,
            second_chance: false,
            score_multiplier: 1,
            score_multiplier_lines: 0,
            charges: ConsumableCharges::default(),
        }
    }
}

/// Structural modifiers. They also reset with the run; only unlocked pieces outlive it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermUpgrades {
    pub preview_bonus: u32,
    pub extra_hold_cells: u32,
    pub extra_columns: u32,
    pub obstacle_focus: u32,
    pub gravity_cost_down: u32,
}

/// What the caller still has to do after an upgrade was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Applied,
    BoardWidened { extra: u32 },
    ObstaclesRaised,
    PieceRemovalOpened,
    AtCap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradeState {
    pub temp: TempUpgrades,
    pub perm: PermUpgrades,
    taken: BTreeMap<UpgradeId, u32>,
}

impl UpgradeState {
    pub fn times_taken(&self, id: UpgradeId) -> u32 {
        self.taken.get(&id).copied().unwrap_or(0)
    }

    pub fn is_capped(&self, def: &UpgradeDef, max_extra_columns: u32) -> bool {
        match def.effect {
            // A held second chance blocks another; a spent one may be offered again.
            UpgradeEffect::SecondChance => return self.temp.second_chance,
            UpgradeEffect::BoardColumns { .. } if self.perm.extra_columns >= max_extra_columns => {
                return true;
            }
            _ => {}
        }
        def.cap.is_some_and(|cap| self.times_taken(def.id) >= cap)
    }

    /// Table-driven dispatch over the effect descriptor.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        def: &UpgradeDef,
        max_extra_columns: u32,
        rng: &mut R,
    ) -> UpgradeOutcome {
        if self.is_capped(def, max_extra_columns) {
            return UpgradeOutcome::AtCap;
        }
        *self.taken.entry(def.id).or_insert(0) += 1;

        let temp = &mut self.temp;
        let perm = &mut self.perm;
        match def.effect {
            UpgradeEffect::SpeedUp { base, jitter } => {
                let jitter = if jitter > 0.0 {
                    rng.random_range(-jitter..=jitter)
                } else {
                    0.0
                };
                temp.speed_up += (base + jitter).max(0.0);
                UpgradeOutcome::Applied
            }
            UpgradeEffect::RerollCharges { amount } => {
                temp.reroll_charges += amount;
                UpgradeOutcome::Applied
            }
            UpgradeEffect::SecondChance => {
                temp.second_chance = true;
                UpgradeOutcome::Applied
            }
            UpgradeEffect::ScoreMultiplier { factor, lines } => {
                temp.score_multiplier = factor.max(1);
                temp.score_multiplier_lines += lines;
                UpgradeOutcome::Applied
            }
            UpgradeEffect::ConsumableCharges { consumable, amount } => {
                temp.charges.add(consumable, amount);
                UpgradeOutcome::Applied
            }
            UpgradeEffect::PreviewDepth { amount } => {
                perm.preview_bonus += amount;
                UpgradeOutcome::Applied
            }
            UpgradeEffect::ExtraHoldCell => {
                perm.extra_hold_cells += 1;
                UpgradeOutcome::Applied
            }
            UpgradeEffect::BoardColumns { amount } => {
                let extra = amount.min(max_extra_columns.saturating_sub(perm.extra_columns));
                perm.extra_columns += extra;
                UpgradeOutcome::BoardWidened { extra }
            }
            UpgradeEffect::PieceRemoval => UpgradeOutcome::PieceRemovalOpened,
            UpgradeEffect::ObstacleFocus => {
                perm.obstacle_focus += 1;
                UpgradeOutcome::ObstaclesRaised
            }
            UpgradeEffect::GravityCostDown { amount } => {
                perm.gravity_cost_down += amount;
                UpgradeOutcome::Applied
            }
        }
    }

    /// Score factor for the next clear.
    pub fn score_factor(&self) -> u64 {
        if self.temp.score_multiplier > 1 && self.temp.score_multiplier_lines > 0 {
            self.temp.score_multiplier
        } else {
            1
        }
    }

    /// Burns the multiplier's line budget; back to 1x once it runs out.
    pub fn consume_score_lines(&mut self, lines: usize) {
        if self.score_factor() == 1 {
            return;
        }
        self.temp.score_multiplier_lines -= lines as i32;
        if self.temp.score_multiplier_lines <= 0 {
            self.temp.score_multiplier_lines = 0;
            self.temp.score_multiplier = 1;
        }
    }

    pub fn gravity_cost(&self, base_cost: u32) -> u32 {
        base_cost.saturating_sub(self.perm.gravity_cost_down).max(1)
    }

    pub fn take_second_chance(&mut self) -> bool {
        std::mem::take(&mut self.temp.second_chance)
    }
}
