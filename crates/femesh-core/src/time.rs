//! Time sequences for time-varying node fields.
//!
//! A node field may store one set of values per time in a
//! [`TimeSequence`]. Sequences are interned in a [`TimeSequenceRegistry`]
//! owned by the root region, so nodes with the same times share one
//! object.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::MeshError;

/// Strictly increasing, finite list of times.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSequence {
    times: Vec<f64>,
}

// Times are finite, so bitwise identity agrees with `==` except for the
// sign of zero, which `new` normalizes.
impl Eq for TimeSequence {}

impl Hash for TimeSequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.times.len().hash(state);
        for time in &self.times {
            time.to_bits().hash(state);
        }
    }
}

/// Where a time falls inside a sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeLocation {
    /// Index of the time at or below.
    pub lower: usize,
    /// Index of the time at or above.
    pub upper: usize,
    /// Fraction of the way from `lower` to `upper`.
    pub xi: f64,
}

impl TimeLocation {
    fn at(index: usize) -> Self {
        Self {
            lower: index,
            upper: index,
            xi: 0.0,
        }
    }
}

impl TimeSequence {
    /// Build a sequence, rejecting empty, unordered or non-finite times.
    pub fn new(times: impl Into<Vec<f64>>) -> Result<Self, MeshError> {
        let mut times = times.into();
        if times.is_empty() {
            return Err(MeshError::invalid_argument("time sequence needs a time"));
        }
        if let Some(bad) = times.iter().find(|t| !t.is_finite()) {
            return Err(MeshError::invalid_argument(format!("time {bad} is not finite")));
        }
        if times.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(MeshError::invalid_argument(
                "times must be strictly increasing",
            ));
        }
        for time in &mut times {
            if *time == 0.0 {
                *time = 0.0;
            }
        }
        Ok(Self { times })
    }

    /// The times, in increasing order.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of times.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True when there are no times.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Index of `time` if it is one of the sequence's times.
    pub fn index_of(&self, time: f64) -> Option<usize> {
        let index = self.times.partition_point(|t| *t < time);
        (self.times.get(index) == Some(&time)).then_some(index)
    }

    /// Bracket `time` for linear interpolation.
    ///
    /// Times outside the sequence clamp to its first or last entry.
    pub fn locate(&self, time: f64) -> TimeLocation {
        let last = self.times.len() - 1;
        let upper = self.times.partition_point(|t| *t < time);
        if upper == 0 {
            return TimeLocation::at(0);
        }
        if upper > last {
            return TimeLocation::at(last);
        }
        if self.times[upper] == time {
            return TimeLocation::at(upper);
        }
        let lower = upper - 1;
        let xi = (time - self.times[lower]) / (self.times[upper] - self.times[lower]);
        TimeLocation { lower, upper, xi }
    }

    /// Sorted union of the times of `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        let mut times = Vec::with_capacity(self.len() + other.len());
        let mut a = self.times.iter().peekable();
        let mut b = other.times.iter().peekable();
        loop {
            let next = match (a.peek(), b.peek()) {
                (Some(x), Some(y)) if x < y => a.next(),
                (Some(x), Some(y)) if y < x => b.next(),
                (Some(_), Some(_)) => {
                    b.next();
                    a.next()
                }
                (Some(_), None) => a.next(),
                (None, Some(_)) => b.next(),
                (None, None) => break,
            };
            times.extend(next.copied());
        }
        Self { times }
    }
}

/// Interned time sequences owned by a root region.
#[derive(Debug, Default)]
pub struct TimeSequenceRegistry {
    sequences: IndexMap<TimeSequence, Rc<TimeSequence>>,
}

impl TimeSequenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the registered sequence equal to `sequence`, registering it
    /// if needed.
    pub fn get(&mut self, sequence: TimeSequence) -> Rc<TimeSequence> {
        Rc::clone(
            self.sequences
                .entry(sequence)
                .or_insert_with_key(|key| Rc::new(key.clone())),
        )
    }

    /// The registered sequence holding exactly `times`.
    pub fn get_matching(&mut self, times: &[f64]) -> Result<Rc<TimeSequence>, MeshError> {
        Ok(self.get(TimeSequence::new(times)?))
    }

    /// The registered sequence holding the times of both `a` and `b`.
    pub fn get_union(&mut self, a: &TimeSequence, b: &TimeSequence) -> Rc<TimeSequence> {
        self.get(a.union(b))
    }

    /// True if `sequence` is the object this registry hands out.
    pub fn contains(&self, sequence: &Rc<TimeSequence>) -> bool {
        self.sequences
            .get(&**sequence)
            .is_some_and(|registered| Rc::ptr_eq(registered, sequence))
    }

    /// Number of distinct sequences registered.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// True if no sequence has been registered.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}
