use crate::bundle::{ResultBundle, Shuffled};
use common::{Emit, Result};
use eyre::WrapErr;
use log::debug;
use std::{fmt::Debug, hash::Hash};

/// Groups values by key. A group is created on the first sighting of its key
/// and values keep their mapped order.
pub(crate) fn shuffle<K, V>(mapped: &[(K, V)]) -> Shuffled<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let mut shuffled = Shuffled::new();
    for (k, v) in mapped {
        shuffled
            .entry(k.clone())
            .or_insert_with(Vec::new)
            .push(v.clone());
    }
    shuffled
}

/// Runs map, shuffle and reduce over `data`.
///
/// The mapper sees each record with its 1-based position. The first mapper or
/// reducer error aborts the whole call; no partial bundle is returned.
pub fn map_reduce<R, K, V, A, M, F>(data: &[R], mapper: M, reducer: F) -> Result<ResultBundle<K, V, A>>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
    M: Fn(&R, usize) -> Result<Emit<K, V>>,
    F: Fn(&K, &[V]) -> Result<A>,
{
    let mut mapped = Vec::with_capacity(data.len());
    for (index, record) in data.iter().enumerate() {
        let position = index + 1;
        let emit =
            mapper(record, position).wrap_err_with(|| format!("mapper failed on record {}", position))?;
        mapped.extend(emit);
    }

    let shuffled = shuffle(&mapped);

    let results = shuffled
        .iter()
        .map(|(key, values)| {
            reducer(key, values)
                .map(|aggregate| (key.clone(), aggregate))
                .wrap_err_with(|| format!("reducer failed on key {:?}", key))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "map reduce done: {} records, {} pairs, {} keys",
        data.len(),
        mapped.len(),
        results.len()
    );
    Ok(ResultBundle::new(mapped, shuffled, results))
}
