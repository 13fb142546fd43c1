use std::sync::Arc;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use crate::domain::weapon::{
    FireBlock, FireOutcome, FireResult, ReloadMode, ReloadRejected, WeaponEvent, WeaponState,
};
use crate::utils::weapondb::WeaponDefinition;

/// Identifies one pull-out; a completion signal only clears its own pull-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullOutToken(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
struct PullOut {
    slot: usize,
    token: PullOutToken,
    deadline: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRejected {
    InvalidIndex,
    SameSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchResult {
    pub from: usize,
    pub to: usize,
    pub token: PullOutToken,
    /// The old weapon's reload was cut short (stop its sound)
    pub reload_cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryEvent {
    Weapon(WeaponEvent),
    PullOutFinished { slot: usize, timed_out: bool },
}

pub type InventoryEvents = SmallVec<[InventoryEvent; 2]>;

/// A player's equipped weapons, at most one active
#[derive(Debug, Clone)]
pub struct WeaponInventory {
    slots: Vec<WeaponState>,
    current: usize,
    pull_out: Option<PullOut>,
    next_token: u32,
    next_shot_seq: u64,
    pull_out_timeout: f64,
}

impl WeaponInventory {
    pub fn new(
        loadout: Vec<Arc<WeaponDefinition>>,
        pull_out_timeout_secs: f32,
    ) -> Result<Self, &'static str> {
        if loadout.is_empty() {
            return Err("Empty loadout");
        }
        Ok(Self {
            slots: loadout.into_iter().map(WeaponState::new).collect(),
            current: 0,
            pull_out: None,
            next_token: 1,
            next_shot_seq: 1,
            pull_out_timeout: f64::from(pull_out_timeout_secs.max(0.0)),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &WeaponState {
        &self.slots[self.current]
    }

    pub fn current_mut(&mut self) -> &mut WeaponState {
        &mut self.slots[self.current]
    }

    pub fn weapon(&self, index: usize) -> Option<&WeaponState> {
        self.slots.get(index)
    }

    pub fn weapon_mut(&mut self, index: usize) -> Option<&mut WeaponState> {
        self.slots.get_mut(index)
    }

    pub fn is_pulling_out(&self) -> bool {
        self.pull_out.is_some()
    }

    /// Slot whose pull-out is still running
    pub fn pending_slot(&self) -> Option<usize> {
        self.pull_out.map(|p| p.slot)
    }

    /// Next shot sequence number that will be handed out
    pub fn peek_shot_sequence(&self) -> u64 {
        self.next_shot_seq
    }

    /// Reserve `count` consecutive shot sequence numbers, returns the first
    pub fn allocate_shot_sequence(&mut self, count: u32) -> u64 {
        let first = self.next_shot_seq;
        self.next_shot_seq += u64::from(count.max(1));
        first
    }

    pub fn try_fire(&mut self, now: f64) -> FireResult {
        if self.pull_out.is_some() {
            return FireResult {
                outcome: FireOutcome::Blocked(FireBlock::PullingOut),
                reload_cancelled: false,
            };
        }
        self.slots[self.current].try_fire(now)
    }

    pub fn start_reload(&mut self, now: f64) -> Result<ReloadMode, ReloadRejected> {
        if self.pull_out.is_some() {
            return Err(ReloadRejected::PullingOut);
        }
        self.slots[self.current].start_reload(now)
    }

    pub fn cancel_reload(&mut self) -> bool {
        self.slots[self.current].cancel_reload()
    }

    /// Hide the active weapon and start pulling out `index`.
    /// `force` re-equips the active slot (item pickup override).
    pub fn switch_to(
        &mut self,
        index: usize,
        now: f64,
        force: bool,
    ) -> Result<SwitchResult, SwitchRejected> {
        if index >= self.slots.len() {
            log::warn!("Weapon switch to invalid slot {} ({} equipped)", index, self.slots.len());
            return Err(SwitchRejected::InvalidIndex);
        }
        if index == self.current && !force {
            return Err(SwitchRejected::SameSlot);
        }

        let from = self.current;
        let reload_cancelled = self.slots[from].cancel_reload();

        let token = PullOutToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        self.current = index;
        self.pull_out = Some(PullOut {
            slot: index,
            token,
            deadline: now + self.pull_out_timeout,
        });

        Ok(SwitchResult {
            from,
            to: index,
            token,
            reload_cancelled,
        })
    }

    /// Animation-driven completion. Stale or repeated tokens are ignored.
    pub fn complete_pull_out(&mut self, token: PullOutToken) -> bool {
        match self.pull_out {
            Some(pull_out) if pull_out.token == token => {
                self.pull_out = None;
                true
            }
            _ => false,
        }
    }

    /// Advance reload and pull-out timers
    pub fn tick(&mut self, now: f64) -> InventoryEvents {
        let mut events = InventoryEvents::new();

        if let Some(pull_out) = self.pull_out {
            if now >= pull_out.deadline {
                self.pull_out = None;
                events.push(InventoryEvent::PullOutFinished {
                    slot: pull_out.slot,
                    timed_out: true,
                });
            }
        }

        if let Some(event) = self.slots[self.current].tick(now) {
            events.push(InventoryEvent::Weapon(event));
        }

        events
    }

    /// Multiplier of the active weapon after this tick
    pub fn update_multiplier(&mut self, player_speed: f32, is_dead: bool, dt: f32) -> f32 {
        self.slots[self.current].update_multiplier(player_speed, is_dead, dt)
    }

    /// Full ammo and baseline multiplier on every slot. Shot sequence keeps counting.
    pub fn respawn(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
        self.pull_out = None;
    }
}
