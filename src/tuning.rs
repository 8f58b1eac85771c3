//! Game balance and timing
//!
//! Every number the simulation consults lives here so a JSON file can
//! rebalance the game without a rebuild.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::CoinKind;

/// Payout and shop price of one coin kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinKindTuning {
    /// Score awarded by a winning spin
    pub value: u64,
    /// Shop price multiplier (price = base * owned, zero owned counts as half)
    pub base_price: u64,
}

/// Timed level mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelTuning {
    pub enabled: bool,
    /// Time allowed per level (ms)
    pub level_time_ms: u64,
    /// Score target of level 1
    pub first_level_target: u64,
    /// Each level's target is the previous one times this
    pub target_multiplier: u64,
    pub max_level: u32,
}

impl Default for LevelTuning {
    fn default() -> Self {
        Self {
            enabled: true,
            level_time_ms: 60_000,
            first_level_target: 25,
            target_multiplier: 2,
            max_level: 999,
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Board ===
    pub board_width: f32,
    pub board_height: f32,
    pub safe_margin: f32,

    // === Movement & combat ===
    pub engage_radius: f32,
    pub helper_speed: f32,
    pub slime_speed: f32,
    /// Helper cooldown after attacking (ms)
    pub helper_fatigue_ms: u64,
    /// How far into the cooldown the helper slumps into its defeated cue (ms)
    pub fatigue_slump_ms: u64,
    /// Attack start to hit landing (ms)
    pub strike_delay_ms: u64,
    /// Slime attack start to coin destroyed (ms)
    pub slime_attack_ms: u64,
    /// Length of the slime hit reaction (ms)
    pub slime_hit_ms: u64,
    /// Length of the slime death sequence (ms)
    pub slime_death_ms: u64,

    // === Coins ===
    /// Each of the two spin phases (ms)
    pub spin_phase_ms: u64,
    /// Reward flash before the coin rests again (ms)
    pub flash_ms: u64,
    pub reward_probability: f64,
    /// Max settle offset of a spin on each axis
    pub spin_offset_x: f32,
    pub spin_offset_y: f32,
    pub copper: CoinKindTuning,
    pub silver: CoinKindTuning,
    pub gold: CoinKindTuning,

    // === Shop ===
    pub helper_base_price: u64,

    // === Progression ===
    pub level: LevelTuning,

    // === Spawning & persistence ===
    /// Slime spawner period (ms, 0 disables the built-in spawner)
    pub slime_spawn_interval_ms: u64,
    pub save_interval_ms: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            board_width: BOARD_WIDTH,
            board_height: BOARD_HEIGHT,
            safe_margin: SAFE_MARGIN,

            engage_radius: ENGAGE_RADIUS,
            helper_speed: HELPER_SPEED,
            slime_speed: SLIME_SPEED,
            helper_fatigue_ms: HELPER_FATIGUE_MS,
            fatigue_slump_ms: 500,
            strike_delay_ms: STRIKE_DELAY_MS,
            slime_attack_ms: 400,
            slime_hit_ms: 300,
            slime_death_ms: 500,

            spin_phase_ms: SPIN_PHASE_MS,
            flash_ms: FLASH_MS,
            reward_probability: REWARD_PROBABILITY,
            spin_offset_x: 40.0,
            spin_offset_y: 80.0,
            copper: CoinKindTuning {
                value: 1,
                base_price: 5,
            },
            silver: CoinKindTuning {
                value: 10,
                base_price: 50,
            },
            gold: CoinKindTuning {
                value: 100,
                base_price: 500,
            },

            helper_base_price: 50,

            level: LevelTuning::default(),

            slime_spawn_interval_ms: 15_000,
            save_interval_ms: SAVE_INTERVAL_MS,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON, falling back to defaults on malformed input
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Tuning>(json) {
            Ok(tuning) => tuning.sanitized(),
            Err(e) => {
                log::warn!("Invalid tuning JSON ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Clamp values that would break the simulation
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.board_width > 0.0) {
            self.board_width = defaults.board_width;
        }
        if !(self.board_height > 0.0) {
            self.board_height = defaults.board_height;
        }
        self.safe_margin = self
            .safe_margin
            .clamp(0.0, self.board_width.min(self.board_height) / 2.0);
        self.engage_radius = self.engage_radius.max(0.0);
        self.helper_speed = self.helper_speed.max(0.0);
        self.slime_speed = self.slime_speed.max(0.0);
        self.fatigue_slump_ms = self.fatigue_slump_ms.min(self.helper_fatigue_ms);
        self.reward_probability = if self.reward_probability.is_nan() {
            defaults.reward_probability
        } else {
            self.reward_probability.clamp(0.0, 1.0)
        };
        if !self.spin_offset_x.is_finite() {
            self.spin_offset_x = defaults.spin_offset_x;
        }
        if !self.spin_offset_y.is_finite() {
            self.spin_offset_y = defaults.spin_offset_y;
        }
        self.spin_offset_x = self.spin_offset_x.abs();
        self.spin_offset_y = self.spin_offset_y.abs();
        if self.level.level_time_ms == 0 {
            self.level.level_time_ms = defaults.level.level_time_ms;
        }
        self.level.target_multiplier = self.level.target_multiplier.max(1);
        self.level.max_level = self.level.max_level.max(1);
        self
    }

    /// Balance entry for a coin kind
    pub fn coin(&self, kind: CoinKind) -> CoinKindTuning {
        match kind {
            CoinKind::Copper => self.copper,
            CoinKind::Silver => self.silver,
            CoinKind::Gold => self.gold,
        }
    }

    /// Board centre (default coin spot)
    pub fn board_center(&self) -> glam::Vec2 {
        glam::Vec2::new(self.board_width / 2.0, self.board_height / 2.0)
    }
}
