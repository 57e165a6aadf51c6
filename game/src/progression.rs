//! Run economy: piece pools, level-up offers, rerolls and the end-of-run keep choice.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::EconomySettings;
use crate::randomizer::{draw_unlock_options, pick_weighted};
use crate::shapes::PieceKind;
use crate::upgrades::{Consumable, UpgradeCatalog, UpgradeEffect, UpgradeId, UpgradeOutcome, UpgradeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferOption {
    Piece(PieceKind),
    Upgrade(UpgradeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockOffer {
    pub options: Vec<OfferOption>,
    pub piece_taken: bool,
    pub upgrade_taken: bool,
    pub free_reroll_used: bool,
}

impl UnlockOffer {
    fn new(options: Vec<OfferOption>) -> Self {
        Self {
            options,
            piece_taken: false,
            upgrade_taken: false,
            free_reroll_used: false,
        }
    }

    /// Nothing left that the player may still pick.
    pub fn is_resolved(&self) -> bool {
        let pieces_left = self
            .options
            .iter()
            .any(|o| matches!(o, OfferOption::Piece(_)));
        let upgrades_left = self
            .options
            .iter()
            .any(|o| matches!(o, OfferOption::Upgrade(_)));
        (self.piece_taken || !pieces_left) && (self.upgrade_taken || !upgrades_left)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progression {
    #[serde(skip, default)]
    catalog: UpgradeCatalog,
    economy: EconomySettings,
    max_extra_columns: u32,
    permanent_pool: Vec<PieceKind>,
    current_pool: Vec<PieceKind>,
    run_unlocks: Vec<PieceKind>,
    pub upgrades: UpgradeState,
    offer: Option<UnlockOffer>,
    pool_dirty: bool,
}

impl Progression {
    pub fn new(permanent_pool: Vec<PieceKind>, economy: EconomySettings, max_extra_columns: u32) -> Self {
        let current_pool = permanent_pool.clone();
        Self {
            catalog: UpgradeCatalog::default(),
            economy,
            max_extra_columns,
            permanent_pool,
            current_pool,
            run_unlocks: Vec::new(),
            upgrades: UpgradeState::default(),
            offer: None,
            pool_dirty: false,
        }
    }

    pub fn catalog(&self) -> &UpgradeCatalog {
        &self.catalog
    }

    pub fn permanent_pool(&self) -> &[PieceKind] {
        &self.permanent_pool
    }

    pub fn current_pool(&self) -> &[PieceKind] {
        &self.current_pool
    }

    pub fn run_unlocks(&self) -> &[PieceKind] {
        &self.run_unlocks
    }

    pub fn offer(&self) -> Option<&UnlockOffer> {
        self.offer.as_ref()
    }

    pub fn start_run(&mut self) {
        self.current_pool = self.permanent_pool.clone();
        self.run_unlocks.clear();
        self.upgrades = UpgradeState::default();
        self.offer = None;
    }

    fn eligible_upgrades(&self) -> Vec<(UpgradeId, u32)> {
        self.catalog
            .upgrades
            .iter()
            .filter(|def| !self.upgrades.is_capped(def, self.max_extra_columns))
            .filter(|def| {
                !matches!(def.effect, UpgradeEffect::PieceRemoval) || self.current_pool.len() > 1
            })
            .map(|def| (def.id, def.weight))
            .collect()
    }

    fn build_options<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<OfferOption> {
        let size = self.economy.offer_size;
        let locked: Vec<PieceKind> = PieceKind::all()
            .filter(|k| !self.current_pool.contains(k))
            .collect();
        let mut options: Vec<OfferOption> = draw_unlock_options(&locked, size, rng)
            .into_iter()
            .map(OfferOption::Piece)
            .collect();
        options.extend(
            pick_weighted(&self.eligible_upgrades(), size, rng)
                .into_iter()
                .map(OfferOption::Upgrade),
        );
        options.shuffle(rng);
        options.truncate(size);
        options
    }

    /// Opens a level-up offer. Returns false when there is nothing to offer.
    pub fn generate_offer<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let options = self.build_options(rng);
        if options.is_empty() {
            self.offer = None;
            return false;
        }
        log::debug!("offer: {options:?}");
        self.offer = Some(UnlockOffer::new(options));
        true
    }

    /// Free reroll first, then a reroll charge.
    pub fn reroll<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let Some(offer) = self.offer.as_ref() else {
            return false;
        };
        let free = !offer.free_reroll_used;
        if !free {
            if self.upgrades.temp.reroll_charges == 0 {
                return false;
            }
            self.upgrades.temp.reroll_charges -= 1;
        }
        let options = self.build_options(rng);
        if let Some(offer) = self.offer.as_mut() {
            offer.free_reroll_used = true;
            offer.options = options;
        }
        true
    }

    pub fn select_piece(&mut self, kind: PieceKind) -> bool {
        let Some(offer) = self.offer.as_mut() else {
            return false;
        };
        let option = OfferOption::Piece(kind);
        if offer.piece_taken || !offer.options.contains(&option) {
            return false;
        }
        offer.piece_taken = true;
        offer.options.retain(|o| *o != option);
        if !self.current_pool.contains(&kind) {
            self.current_pool.push(kind);
        }
        if !self.run_unlocks.contains(&kind) {
            self.run_unlocks.push(kind);
        }
        log::info!("unlocked {kind} for this run");
        true
    }

    pub fn select_upgrade<R: Rng + ?Sized>(&mut self, id: UpgradeId, rng: &mut R) -> Option<UpgradeOutcome> {
        let offer = self.offer.as_mut()?;
        let option = OfferOption::Upgrade(id);
        if offer.upgrade_taken || !offer.options.contains(&option) {
            return None;
        }
        let def = self.catalog.get(id)?.clone();
        offer.upgrade_taken = true;
        offer.options.retain(|o| *o != option);
        let outcome = self.upgrades.apply(&def, self.max_extra_columns, rng);
        log::info!("upgrade {:?} -> {outcome:?}", def.id);
        Some(outcome)
    }

    pub fn offer_resolved(&self) -> bool {
        self.offer.as_ref().is_none_or(UnlockOffer::is_resolved)
    }

    pub fn close_offer(&mut self) {
        self.offer = None;
    }

    pub fn removal_candidates(&self) -> Vec<PieceKind> {
        if self.current_pool.len() > 1 {
            self.current_pool.clone()
        } else {
            Vec::new()
        }
    }

    pub fn remove_from_run(&mut self, kind: PieceKind) -> bool {
        if self.current_pool.len() <= 1 || !self.current_pool.contains(&kind) {
            return false;
        }
        self.current_pool.retain(|k| *k != kind);
        log::info!("removed {kind} from this run");
        true
    }

    /// Unlocked this run and not yet permanent.
    pub fn keep_candidates(&self) -> Vec<PieceKind> {
        self.run_unlocks
            .iter()
            .copied()
            .filter(|k| !self.permanent_pool.contains(k))
            .collect()
    }

    pub fn keep_permanently(&mut self, kind: PieceKind) -> bool {
        if !self.keep_candidates().contains(&kind) {
            return false;
        }
        self.permanent_pool.push(kind);
        self.pool_dirty = true;
        log::info!("{kind} added to the permanent pool");
        true
    }

    pub fn reset_permanent_pool<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut all: Vec<PieceKind> = PieceKind::all().collect();
        all.shuffle(rng);
        all.truncate(self.economy.reset_pool_size);
        self.permanent_pool = all;
        self.pool_dirty = true;
    }

    pub fn remove_permanent_piece(&mut self, kind: PieceKind) -> bool {
        if self.permanent_pool.len() <= self.economy.min_permanent_pool
            || !self.permanent_pool.contains(&kind)
        {
            return false;
        }
        self.permanent_pool.retain(|k| *k != kind);
        self.pool_dirty = true;
        true
    }

    /// True once after each permanent-pool mutation.
    pub fn take_pool_dirty(&mut self) -> bool {
        std::mem::take(&mut self.pool_dirty)
    }

    pub fn consumable_cost(&self, consumable: Consumable) -> u32 {
        match consumable {
            Consumable::Gravity => self.upgrades.gravity_cost(self.economy.gravity_base_cost),
            _ => 1,
        }
    }

    pub fn can_use(&self, consumable: Consumable) -> bool {
        self.upgrades.temp.charges.get(consumable) >= self.consumable_cost(consumable)
    }

    pub fn spend(&mut self, consumable: Consumable) -> bool {
        let cost = self.consumable_cost(consumable);
        self.upgrades.temp.charges.spend(consumable, cost)
    }

    pub fn earn_gravity_charges(&mut self, lines: usize) {
        self.upgrades
            .temp
            .charges
            .add(Consumable::Gravity, lines as u32);
    }
}
