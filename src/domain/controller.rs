//! Client-side weapon controller.
//!
//! Applies every local effect of fire / reload / switch immediately (ammo,
//! HUD, tracers, sounds) and forwards damage and FX to the injected relays.
//! The server's copy stays authoritative for damage.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use crate::domain::inventory::{
    InventoryEvent, InventoryEvents, PullOutToken, SwitchRejected, SwitchResult, WeaponInventory,
};
use crate::domain::relay::{
    ActionRelay, DamageRelay, FireAction, FxRelay, Hud, MatchSettings, SfxRelay, SoundKey, TeamRoster,
};
use crate::domain::shot::{resolve_shot, AimBasis, ShotContext, ShotResolution};
use crate::domain::simulator::CollisionWorld;
use crate::domain::trail_pool::TrailPool;
use crate::domain::weapon::{FireBlock, FireOutcome, FireResult, ReloadMode, ReloadRejected, WeaponEvent};
use crate::domain::PlayerId;

/// What one trigger pull did
#[derive(Debug, Clone)]
pub struct FireReport {
    pub result: FireResult,
    pub resolution: Option<ShotResolution>,
}

pub struct WeaponController<R, H> {
    player: PlayerId,
    inventory: WeaponInventory,
    trails: TrailPool,
    trail_capacity: usize,
    relay: R,
    hud: H,
    rng: ChaCha8Rng,
    is_dead: bool,
}

impl<R, H> WeaponController<R, H>
where
    R: DamageRelay + FxRelay + SfxRelay + ActionRelay,
    H: Hud,
{
    pub fn new(
        player: PlayerId,
        inventory: WeaponInventory,
        relay: R,
        mut hud: H,
        trail_capacity: usize,
        seed: u64,
    ) -> Self {
        let trail_asset = inventory.current().definition().assets.trail;
        hud.update_ammo(inventory.current().ammo(), inventory.current().mag_size());
        Self {
            player,
            inventory,
            trails: TrailPool::new(trail_asset, trail_capacity),
            trail_capacity,
            relay,
            hud,
            rng: ChaCha8Rng::seed_from_u64(seed),
            is_dead: false,
        }
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn inventory(&self) -> &WeaponInventory {
        &self.inventory
    }

    pub fn trails(&self) -> &TrailPool {
        &self.trails
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn relay_mut(&mut self) -> &mut R {
        &mut self.relay
    }

    pub fn hud(&self) -> &H {
        &self.hud
    }

    pub fn is_dead(&self) -> bool {
        self.is_dead
    }

    fn refresh_hud(&mut self) {
        let weapon = self.inventory.current();
        self.hud.update_ammo(weapon.ammo(), weapon.mag_size());
    }

    /// One fire input edge
    pub fn fire<W, S>(&mut self, now: f64, basis: &AimBasis, world: &W, settings: &S) -> FireReport
    where
        W: CollisionWorld + ?Sized,
        S: MatchSettings + TeamRoster + ?Sized,
    {
        if self.is_dead {
            return FireReport {
                result: FireResult {
                    outcome: FireOutcome::Blocked(FireBlock::Dead),
                    reload_cancelled: false,
                },
                resolution: None,
            };
        }

        let result = self.inventory.try_fire(now);
        if result.reload_cancelled {
            self.relay.stop_world_sfx(SoundKey::Reload);
        }

        let resolution = match result.outcome {
            FireOutcome::Fired { .. } => Some(self.play_shot(now, basis, world, settings)),
            FireOutcome::DryFire => {
                self.relay.request_world_sfx(SoundKey::DryFire, true, false);
                None
            }
            FireOutcome::RateLimited | FireOutcome::Blocked(_) => None,
        };

        FireReport { result, resolution }
    }

    fn play_shot<W, S>(&mut self, now: f64, basis: &AimBasis, world: &W, settings: &S) -> ShotResolution
    where
        W: CollisionWorld + ?Sized,
        S: MatchSettings + TeamRoster + ?Sized,
    {
        self.refresh_hud();
        self.relay.request_world_sfx(SoundKey::Shoot, true, true);

        let def = self.inventory.current().definition().clone();
        if def.assets.muzzle_light.is_none() {
            log::debug!("Weapon '{}' has no muzzle light, skipping flash", def.name);
        }

        let ctx = ShotContext {
            shooter: self.player,
            weapon_index: self.inventory.current_index(),
            first_shot_seq: self.inventory.allocate_shot_sequence(def.pellet_count()),
            multiplier: self.inventory.current().multiplier(),
        };
        // the server must register the shot before any damage for it arrives
        self.relay.send_fire(FireAction {
            weapon_index: ctx.weapon_index,
            origin: basis.origin,
            direction: basis.forward,
            first_shot_seq: ctx.first_shot_seq,
            pellet_count: def.pellet_count(),
            fired_at: now,
        });
        let resolution = resolve_shot(&ctx, basis, &def, world, settings, &mut self.rng);

        let expires_at = now + f64::from(def.assets.trail.lifetime);
        for fx in &resolution.fx {
            let handle = self.trails.acquire();
            if let Some(trail) = self.trails.get_mut(handle) {
                trail.start = fx.start;
                trail.end = fx.end_point;
                trail.expires_at = expires_at;
            }
            self.relay.request_shot_fx(*fx);
        }
        if resolution.fx.iter().any(|fx| fx.made_impact) {
            self.relay.request_world_sfx(SoundKey::Impact, false, true);
        }
        for request in &resolution.damage {
            self.relay.request_damage(*request);
        }

        resolution
    }

    pub fn reload(&mut self, now: f64) -> Result<ReloadMode, ReloadRejected> {
        if self.is_dead {
            return Err(ReloadRejected::Dead);
        }
        let mode = self.inventory.start_reload(now)?;
        self.relay.send_reload();
        self.relay.request_world_sfx(SoundKey::Reload, true, false);
        Ok(mode)
    }

    pub fn switch_weapon(
        &mut self,
        index: usize,
        now: f64,
        force: bool,
    ) -> Result<SwitchResult, SwitchRejected> {
        let switch = self.inventory.switch_to(index, now, force)?;
        self.relay.send_weapon_switch(index, force);
        if switch.reload_cancelled {
            self.relay.stop_world_sfx(SoundKey::Reload);
        }

        let def = self.inventory.current().definition().clone();
        if def.assets.world_model_socket.is_none() {
            log::debug!("Weapon '{}' has no world model socket", def.name);
        }
        self.trails.rebuild(def.assets.trail, self.trail_capacity);
        self.refresh_hud();
        Ok(switch)
    }

    /// Animation finished pulling the weapon out
    pub fn pull_out_completed(&mut self, token: PullOutToken) -> bool {
        if !self.inventory.complete_pull_out(token) {
            return false;
        }
        self.relay.send_pull_out_complete(token);
        true
    }

    /// Per-frame update: timers, multiplier, expired tracers
    pub fn tick(&mut self, now: f64, dt: f32, player_speed: f32) -> InventoryEvents {
        let events = self.inventory.tick(now);
        for event in &events {
            if let InventoryEvent::Weapon(WeaponEvent::RoundLoaded { .. } | WeaponEvent::ReloadCompleted { .. }) = event {
                self.refresh_hud();
            }
        }

        self.inventory.update_multiplier(player_speed, self.is_dead, dt);

        for handle in self.trails.expired(now) {
            self.trails.release(handle);
        }
        events
    }

    /// Authoritative hit confirmation from the damage relay
    pub fn on_hit_confirm(&mut self, was_kill: bool) {
        let key = if was_kill { SoundKey::Kill } else { SoundKey::Hit };
        self.relay.request_world_sfx(key, true, true);
    }

    /// Server correction of predicted ammo
    pub fn apply_ammo_sync(&mut self, weapon_index: usize, ammo: u32) {
        let Some(weapon) = self.inventory.weapon_mut(weapon_index) else {
            log::warn!("Ammo sync for unknown weapon slot {}", weapon_index);
            return;
        };
        weapon.set_ammo(ammo);
        if weapon_index == self.inventory.current_index() {
            self.refresh_hud();
        }
    }

    pub fn set_dead(&mut self, dead: bool) {
        self.is_dead = dead;
        if dead && self.inventory.cancel_reload() {
            self.relay.stop_world_sfx(SoundKey::Reload);
        }
    }

    pub fn respawn(&mut self) {
        self.is_dead = false;
        self.inventory.respawn();
        self.refresh_hud();
    }
}
