use crate::bundle::{ResultBundle, Shuffled};
use common::{Emit, Result};
use log::{debug, warn};
use std::{fmt, hash::Hash};

/// Shuffle reports are sampled so that roughly this many are sent.
const SHUFFLE_REPORTS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Map,
    Shuffle,
    Reduce,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Map => "map",
            Phase::Shuffle => "shuffle",
            Phase::Reduce => "reduce",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress report. Map spans 0..=50 percent, shuffle 50..=75 and
/// reduce 75..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    pub percent: u8,
    pub current: usize,
    pub total: usize,
}

impl Progress {
    fn new(phase: Phase, current: usize, total: usize) -> Self {
        let (base, span) = match phase {
            Phase::Map => (0, 50.0),
            Phase::Shuffle => (50, 25.0),
            Phase::Reduce => (75, 25.0),
        };
        let percent = base + (current as f64 / total as f64 * span).round() as u8;
        Self {
            phase,
            percent,
            current,
            total,
        }
    }
}

/// Same phases as [`map_reduce`](crate::map_reduce), reporting progress and
/// tolerating failing items.
///
/// A mapper error skips that record and a reducer error skips that key; both
/// are logged as warnings and the phase carries on. The returned bundle
/// carries [`Stats`](crate::Stats).
///
/// Runs to completion once polled: there is no await point inside and no way
/// to cancel it.
pub async fn map_reduce_async<R, K, V, A, M, F>(
    data: &[R],
    mapper: M,
    reducer: F,
    mut on_progress: Option<&mut dyn FnMut(Progress)>,
) -> ResultBundle<K, V, A>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
    M: Fn(&R, usize) -> Result<Emit<K, V>>,
    F: Fn(&K, &[V]) -> Result<A>,
{
    let mut report = |progress: Progress| {
        if let Some(callback) = on_progress.as_mut() {
            callback(progress);
        }
    };

    let total = data.len();
    let mut mapped = Vec::with_capacity(total);
    for (index, record) in data.iter().enumerate() {
        let position = index + 1;
        match mapper(record, position) {
            Ok(emit) => {
                mapped.extend(emit);
                report(Progress::new(Phase::Map, position, total));
            }
            Err(e) => warn!("mapper failed on record {}, skipped: {:?}", position, e),
        }
    }
    debug!("map phase done: {} pairs", mapped.len());

    let mapped_count = mapped.len();
    let step = ((mapped_count + SHUFFLE_REPORTS - 1) / SHUFFLE_REPORTS).max(1);
    let mut shuffled = Shuffled::new();
    for (index, (key, value)) in mapped.iter().enumerate() {
        shuffled
            .entry(key.clone())
            .or_insert_with(Vec::new)
            .push(value.clone());
        if index % step == 0 {
            report(Progress::new(Phase::Shuffle, index, mapped_count));
        }
    }
    debug!("shuffle phase done: {} keys", shuffled.len());

    let key_count = shuffled.len();
    let mut results = Vec::with_capacity(key_count);
    for (index, (key, values)) in shuffled.iter().enumerate() {
        match reducer(key, values) {
            Ok(aggregate) => {
                results.push((key.clone(), aggregate));
                report(Progress::new(Phase::Reduce, index + 1, key_count));
            }
            Err(e) => warn!("reducer failed on key {:?}, skipped: {:?}", key, e),
        }
    }
    debug!("reduce phase done: {} results", results.len());

    ResultBundle::new(mapped, shuffled, results).with_stats(total)
}
