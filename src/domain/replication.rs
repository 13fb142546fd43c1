/// Offered values closer than this count as holding still
const SETTLE_EPSILON: f32 = 1e-4;

/// Absorbs float error in the fire budget refill
const BUDGET_EPSILON: f64 = 1e-6;

/// Rate limits replication of a continuously changing value.
/// A value is sent when the minimum interval has passed AND it moved by at
/// least `min_delta`, or when it settles back on the baseline. A value that
/// stops short of `min_delta` is still sent once it has held for one interval.
#[derive(Debug, Clone)]
pub struct BroadcastGate {
    min_interval: f64,
    min_delta: f32,
    baseline: f32,
    last_value: Option<f32>,
    last_sent_at: f64,
    last_offered: Option<f32>,
    steady_since: f64,
}

impl BroadcastGate {
    pub fn new(min_interval_secs: f32, min_delta: f32, baseline: f32) -> Self {
        Self {
            min_interval: f64::from(min_interval_secs.max(0.0)),
            min_delta: min_delta.max(0.0),
            baseline,
            last_value: None,
            last_sent_at: f64::NEG_INFINITY,
            last_offered: None,
            steady_since: f64::NEG_INFINITY,
        }
    }

    pub fn last_sent(&self) -> Option<f32> {
        self.last_value
    }

    /// Returns the value to publish, if any
    pub fn offer(&mut self, now: f64, value: f32) -> Option<f32> {
        let holding = matches!(self.last_offered, Some(prev) if (value - prev).abs() <= SETTLE_EPSILON);
        if !holding {
            self.steady_since = now;
        }
        self.last_offered = Some(value);
        let settled = now - self.steady_since >= self.min_interval;

        let changed = match self.last_value {
            None => true,
            Some(last) if last == value => false,
            Some(last) => {
                let moved = (value - last).abs();
                moved >= self.min_delta
                    || value == self.baseline
                    || (settled && moved > SETTLE_EPSILON)
            }
        };
        if !changed || now - self.last_sent_at < self.min_interval {
            return None;
        }
        self.last_value = Some(value);
        self.last_sent_at = now;
        Some(value)
    }

    /// Forget the last sent value so the next offer is published
    pub fn reset(&mut self) {
        self.last_value = None;
        self.last_sent_at = f64::NEG_INFINITY;
        self.last_offered = None;
        self.steady_since = f64::NEG_INFINITY;
    }
}

/// Token bucket over fire packets, measured on the server clock.
/// Holds `1 + burst` shots and refills one shot per fire interval, so packets
/// that arrive bunched by jitter still pass while the long-run rate stays capped.
#[derive(Debug, Clone)]
pub struct FireBudget {
    capacity: f64,
    tokens: f64,
    updated_at: Option<f64>,
}

impl FireBudget {
    pub fn new(burst_shots: u32) -> Self {
        let capacity = 1.0 + f64::from(burst_shots);
        Self {
            capacity,
            tokens: capacity,
            updated_at: None,
        }
    }

    /// Shots available at `now` for a weapon firing once per `interval`
    pub fn available(&mut self, now: f64, interval: f64) -> f64 {
        if let Some(last) = self.updated_at {
            let refill = (now - last).max(0.0) / interval;
            self.tokens = (self.tokens + refill).min(self.capacity);
        }
        self.updated_at = Some(now);
        self.tokens
    }

    /// True when a shot may be honoured at `now`
    pub fn has_shot(&mut self, now: f64, interval: f64) -> bool {
        self.available(now, interval) >= 1.0 - BUDGET_EPSILON
    }

    pub fn spend(&mut self) {
        self.tokens = (self.tokens - 1.0).max(0.0);
    }
}

/// Width of the replay window in sequence numbers
pub const SEQ_WINDOW: u64 = 64;

/// Sliding replay window over shot sequence numbers
#[derive(Debug, Clone, Default)]
pub struct SeqWindow {
    highest: Option<u64>,
    /// Bit `i` set when `highest - i` was seen
    seen: u64,
}

impl SeqWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highest(&self) -> Option<u64> {
        self.highest
    }

    /// Would `seq` be accepted
    pub fn is_fresh(&self, seq: u64) -> bool {
        match self.highest {
            None => true,
            Some(highest) if seq > highest => true,
            Some(highest) => {
                let offset = highest - seq;
                offset < SEQ_WINDOW && self.seen & (1 << offset) == 0
            }
        }
    }

    /// Record `seq`; false for duplicates and sequences older than the window
    pub fn accept(&mut self, seq: u64) -> bool {
        if !self.is_fresh(seq) {
            return false;
        }
        match self.highest {
            Some(highest) if seq <= highest => {
                self.seen |= 1 << (highest - seq);
            }
            Some(highest) => {
                let shift = seq - highest;
                self.seen = if shift >= SEQ_WINDOW { 0 } else { self.seen << shift };
                self.seen |= 1;
                self.highest = Some(seq);
            }
            None => {
                self.seen = 1;
                self.highest = Some(seq);
            }
        }
        true
    }
}
