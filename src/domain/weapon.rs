use std::sync::Arc;
use crate::domain::multiplier::{update_multiplier, MultiplierState};
use crate::utils::weapondb::WeaponDefinition;

/// Absorbs float error when comparing shot timestamps against the fire interval
const FIRE_GATE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMode {
    /// Wait the full reload time, then refill at once
    Mag,
    /// One round per step until full or cancelled
    PerRound,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ReloadProgress {
    mode: ReloadMode,
    deadline: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireBlock {
    PullingOut,
    Reloading,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Fired { ammo: u32 },
    /// Gate open but the magazine is empty
    DryFire,
    /// Too soon after the previous shot, dropped silently
    RateLimited,
    Blocked(FireBlock),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireResult {
    pub outcome: FireOutcome,
    /// A per-round reload was interrupted by this attempt
    pub reload_cancelled: bool,
}

impl FireResult {
    pub fn fired(&self) -> bool {
        matches!(self.outcome, FireOutcome::Fired { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadRejected {
    Dead,
    PullingOut,
    AlreadyReloading,
    MagazineFull,
    NoMagazine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponEvent {
    /// Per-round step finished; ammo must be re-synced
    RoundLoaded { ammo: u32 },
    ReloadCompleted { ammo: u32 },
}

/// Runtime state of one equipped weapon
#[derive(Debug, Clone)]
pub struct WeaponState {
    def: Arc<WeaponDefinition>,
    ammo: u32,
    reload: Option<ReloadProgress>,
    last_fire_time: Option<f64>,
    multiplier: MultiplierState,
}

impl WeaponState {
    pub fn new(def: Arc<WeaponDefinition>) -> Self {
        let ammo = def.mag_size;
        Self {
            def,
            ammo,
            reload: None,
            last_fire_time: None,
            multiplier: MultiplierState::baseline(),
        }
    }

    pub fn definition(&self) -> &Arc<WeaponDefinition> {
        &self.def
    }

    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn mag_size(&self) -> u32 {
        self.def.mag_size
    }

    pub fn is_reloading(&self) -> bool {
        self.reload.is_some()
    }

    pub fn reload_mode(&self) -> Option<ReloadMode> {
        self.reload.map(|r| r.mode)
    }

    pub fn last_fire_time(&self) -> Option<f64> {
        self.last_fire_time
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier.current
    }

    pub fn multiplier_state(&self) -> MultiplierState {
        self.multiplier
    }

    /// Overwrite ammo with an authoritative value
    pub fn set_ammo(&mut self, ammo: u32) {
        self.ammo = ammo.min(self.def.mag_size);
    }

    /// True when a full fire interval passed since the last accepted shot
    pub fn rate_gate_open(&self, now: f64) -> bool {
        match self.last_fire_time {
            None => true,
            Some(last) => now - last >= self.def.fire_interval() - FIRE_GATE_EPSILON,
        }
    }

    pub fn try_fire(&mut self, now: f64) -> FireResult {
        let mut reload_cancelled = false;
        if let Some(reload) = self.reload {
            if reload.mode == ReloadMode::Mag {
                return FireResult {
                    outcome: FireOutcome::Blocked(FireBlock::Reloading),
                    reload_cancelled: false,
                };
            }
            self.reload = None;
            reload_cancelled = true;
        }

        let outcome = if !self.rate_gate_open(now) {
            FireOutcome::RateLimited
        } else if self.ammo == 0 {
            FireOutcome::DryFire
        } else {
            self.ammo -= 1;
            self.last_fire_time = Some(now);
            FireOutcome::Fired { ammo: self.ammo }
        };

        FireResult { outcome, reload_cancelled }
    }

    pub fn start_reload(&mut self, now: f64) -> Result<ReloadMode, ReloadRejected> {
        if self.def.mag_size == 0 {
            return Err(ReloadRejected::NoMagazine);
        }
        if self.reload.is_some() {
            return Err(ReloadRejected::AlreadyReloading);
        }
        if self.ammo >= self.def.mag_size {
            return Err(ReloadRejected::MagazineFull);
        }

        let (mode, wait) = if self.def.reload.use_mag_reload {
            (ReloadMode::Mag, self.def.reload.reload_time)
        } else {
            (ReloadMode::PerRound, self.def.reload.per_round_reload_time)
        };
        self.reload = Some(ReloadProgress {
            mode,
            deadline: now + f64::from(wait.max(0.0)),
        });
        Ok(mode)
    }

    /// Returns whether a reload was in flight
    pub fn cancel_reload(&mut self) -> bool {
        self.reload.take().is_some()
    }

    /// Advance reload timers. At most one reload step completes per tick.
    pub fn tick(&mut self, now: f64) -> Option<WeaponEvent> {
        let reload = self.reload?;
        if now < reload.deadline {
            return None;
        }

        match reload.mode {
            ReloadMode::Mag => {
                self.ammo = self.def.mag_size;
                self.reload = None;
                Some(WeaponEvent::ReloadCompleted { ammo: self.ammo })
            }
            ReloadMode::PerRound => {
                self.ammo = (self.ammo + 1).min(self.def.mag_size);
                if self.ammo >= self.def.mag_size {
                    self.reload = None;
                    Some(WeaponEvent::ReloadCompleted { ammo: self.ammo })
                } else {
                    self.reload = Some(ReloadProgress {
                        mode: ReloadMode::PerRound,
                        deadline: now + f64::from(self.def.reload.per_round_reload_time.max(0.0)),
                    });
                    Some(WeaponEvent::RoundLoaded { ammo: self.ammo })
                }
            }
        }
    }

    pub fn update_multiplier(&mut self, player_speed: f32, is_dead: bool, dt: f32) -> f32 {
        self.multiplier = update_multiplier(
            self.multiplier,
            &self.def.multiplier,
            player_speed,
            is_dead,
            dt,
        );
        self.multiplier.current
    }

    /// Full ammo, baseline multiplier, no timers
    pub fn reset(&mut self) {
        self.ammo = self.def.mag_size;
        self.reload = None;
        self.last_fire_time = None;
        self.multiplier = MultiplierState::baseline();
    }
}
