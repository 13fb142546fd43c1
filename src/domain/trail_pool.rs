use glam::Vec3;
use crate::utils::weapondb::TrailAsset;

/// Default number of pre-instantiated tracers
pub const DEFAULT_TRAIL_CAPACITY: usize = 30;

/// Visual state of one tracer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trail {
    pub start: Vec3,
    pub end: Vec3,
    pub expires_at: f64,
}

impl Trail {
    fn cleared() -> Self {
        Self { start: Vec3::ZERO, end: Vec3::ZERO, expires_at: 0.0 }
    }
}

#[derive(Debug, Clone)]
struct TrailEntry {
    asset_id: u32,
    generation: u32,
    active: bool,
    /// Left over from a previous weapon; destroyed once it finishes
    retired: bool,
    trail: Trail,
}

/// Generation-checked reference to a pooled tracer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrailHandle {
    index: usize,
    generation: u32,
}

/// Reusable tracer objects, sized for the equipped weapon's trail asset
#[derive(Debug)]
pub struct TrailPool {
    asset: TrailAsset,
    entries: Vec<Option<TrailEntry>>,
    next_generation: u32,
    allocations: usize,
}

impl TrailPool {
    pub fn new(asset: TrailAsset, capacity: usize) -> Self {
        let mut pool = Self {
            asset,
            entries: Vec::with_capacity(capacity),
            next_generation: 0,
            allocations: 0,
        };
        for _ in 0..capacity {
            pool.instantiate();
        }
        pool
    }

    pub fn asset(&self) -> TrailAsset {
        self.asset
    }

    /// Instances created since construction
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().flatten().filter(|e| e.active).count()
    }

    /// Live entries, retired ones included
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn instantiate(&mut self) -> usize {
        let entry = TrailEntry {
            asset_id: self.asset.id,
            generation: self.next_generation,
            active: false,
            retired: false,
            trail: Trail::cleared(),
        };
        self.next_generation = self.next_generation.wrapping_add(1);
        self.allocations += 1;

        if let Some(index) = self.entries.iter().position(Option::is_none) {
            self.entries[index] = Some(entry);
            index
        } else {
            self.entries.push(Some(entry));
            self.entries.len() - 1
        }
    }

    /// Reuse an inactive tracer, or grow the pool when all are busy
    pub fn acquire(&mut self) -> TrailHandle {
        let free = self.entries.iter().position(|slot| {
            matches!(slot, Some(e) if !e.active && !e.retired && e.asset_id == self.asset.id)
        });
        let index = match free {
            Some(index) => index,
            None => self.instantiate(),
        };

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        if let Some(entry) = self.entries[index].as_mut() {
            entry.active = true;
            entry.generation = generation;
            entry.trail = Trail::cleared();
        }

        TrailHandle { index, generation }
    }

    fn entry_mut(&mut self, handle: TrailHandle) -> Option<&mut TrailEntry> {
        self.entries
            .get_mut(handle.index)?
            .as_mut()
            .filter(|e| e.generation == handle.generation && e.active)
    }

    pub fn get(&self, handle: TrailHandle) -> Option<&Trail> {
        self.entries
            .get(handle.index)?
            .as_ref()
            .filter(|e| e.generation == handle.generation && e.active)
            .map(|e| &e.trail)
    }

    pub fn get_mut(&mut self, handle: TrailHandle) -> Option<&mut Trail> {
        self.entry_mut(handle).map(|e| &mut e.trail)
    }

    /// Return a tracer. Stale handles are ignored; retired tracers are destroyed.
    pub fn release(&mut self, handle: TrailHandle) -> bool {
        let Some(entry) = self.entry_mut(handle) else {
            return false;
        };
        if entry.retired {
            self.entries[handle.index] = None;
            return true;
        }
        entry.active = false;
        entry.trail = Trail::cleared();
        true
    }

    /// Active handles whose tracer has expired at `now`
    pub fn expired(&self, now: f64) -> Vec<TrailHandle> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let e = slot.as_ref()?;
                (e.active && e.trail.expires_at <= now)
                    .then_some(TrailHandle { index, generation: e.generation })
            })
            .collect()
    }

    /// Resize for a newly equipped weapon. Idle tracers are destroyed, tracers
    /// still in flight finish and self-destruct.
    pub fn rebuild(&mut self, asset: TrailAsset, capacity: usize) {
        for slot in &mut self.entries {
            match slot {
                Some(e) if e.active => e.retired = true,
                _ => *slot = None,
            }
        }
        self.asset = asset;
        for _ in 0..capacity {
            self.instantiate();
        }
    }
}
