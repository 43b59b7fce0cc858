//! Time-sampled value storage and sample resolution.
//!
//! An attribute holds an optional default value plus a time-ordered list of
//! samples. Resolution at an arbitrary time coordinate follows the nearest
//! sample at or before the requested time (clamped to the first sample),
//! optionally blending to the next sample when the session interpolation
//! mode is linear.

use std::borrow::Cow;

use crate::stage::Value;
use crate::util::Time;

/// Session-wide sample interpolation mode.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Snap to the nearest sample at or before the requested time.
    Held = 0,
    /// Blend between bracketing samples for interpolatable value kinds.
    #[default]
    Linear = 1,
}

/// Default value plus time-ordered samples for one attribute.
#[derive(Clone, Debug, Default)]
pub struct TimeSamples {
    default_value: Option<Value>,
    samples: Vec<(Time, Value)>,
}

impl TimeSamples {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded time samples (the default value is not a sample).
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.default_value.is_none()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn set_default(&mut self, v: Value) {
        self.default_value = Some(v);
    }

    /// Recorded sample times in ascending order.
    pub fn times(&self) -> impl Iterator<Item = Time> + '_ {
        self.samples.iter().map(|(t, _)| *t)
    }

    pub fn samples(&self) -> &[(Time, Value)] {
        &self.samples
    }

    /// Every recorded value: the default (if any) followed by the samples.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.default_value
            .iter()
            .chain(self.samples.iter().map(|(_, v)| v))
    }

    pub fn first_time(&self) -> Option<Time> {
        self.samples.first().map(|(t, _)| *t)
    }

    pub fn last_time(&self) -> Option<Time> {
        self.samples.last().map(|(t, _)| *t)
    }

    /// Record a sample, replacing any existing sample at the same time.
    pub fn set(&mut self, t: Time, v: Value) {
        match self
            .samples
            .binary_search_by(|(st, _)| st.partial_cmp(&t).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => self.samples[i].1 = v,
            Err(i) => self.samples.insert(i, (t, v)),
        }
    }

    /// Index of the nearest sample at or before `t`, clamped to the first.
    fn floor_index(&self, t: Time) -> Option<usize> {
        if self.samples.is_empty() {
            return None;
        }
        let mut idx = 0usize;
        for (i, (st, _)) in self.samples.iter().enumerate() {
            if *st <= t {
                idx = i;
            } else {
                break;
            }
        }
        Some(idx)
    }

    /// Resolve the value at `t` under the given interpolation mode.
    ///
    /// Falls back to the default value when no samples are recorded.
    /// Returns None when the attribute has neither samples nor a default.
    pub fn resolve(&self, t: Time, interp: Interpolation) -> Option<Cow<'_, Value>> {
        let Some(i) = self.floor_index(t) else {
            return self.default_value.as_ref().map(Cow::Borrowed);
        };

        if interp == Interpolation::Linear && i + 1 < self.samples.len() {
            let (t0, ref v0) = self.samples[i];
            let (t1, ref v1) = self.samples[i + 1];
            if t > t0 && t1 > t0 {
                let alpha = ((t - t0) / (t1 - t0)) as f32;
                if let Some(blended) = v0.lerp(v1, alpha) {
                    return Some(Cow::Owned(blended));
                }
            }
        }

        Some(Cow::Borrowed(&self.samples[i].1))
    }
}
