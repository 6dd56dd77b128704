use crate::{
    bundle::{ResultBundle, Shuffled},
    phases::map_reduce,
};
use common::{Emit, Numeric, Result};
use eyre::{bail, WrapErr};
use itertools::Itertools;
use log::{debug, info};
use std::{fmt::Debug, hash::Hash};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Merged output of a batched run.
///
/// `bundle.results` holds plain numeric sums of each merged group, not the
/// caller's reducer output. See [`combine_batch_results`].
#[derive(Debug, Clone)]
pub struct BatchBundle<K: Hash + Eq, V> {
    pub bundle: ResultBundle<K, V, f64>,
    pub batch_count: usize,
}

/// Splits `data` into chunks of `batch_size` records and runs
/// [`map_reduce`] on each chunk independently, then merges the chunks.
///
/// Each chunk is a separate run, so mapper positions restart at 1 in every
/// chunk and the reducer only ever sees one chunk's values. Any chunk failure
/// fails the whole call.
pub fn map_reduce_batch<R, K, V, A, M, F>(
    data: &[R],
    mapper: M,
    reducer: F,
    batch_size: usize,
) -> Result<BatchBundle<K, V>>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Numeric,
    M: Fn(&R, usize) -> Result<Emit<K, V>>,
    F: Fn(&K, &[V]) -> Result<A>,
{
    if batch_size == 0 {
        bail!("batch size must be at least 1");
    }

    let batch_count = (data.len() + batch_size - 1) / batch_size;
    info!("processing {} items in {} batches", data.len(), batch_count);

    let batches = data
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| {
            debug!("processing batch {}/{}", i + 1, batch_count);
            map_reduce(chunk, &mapper, &reducer)
                .wrap_err_with(|| format!("batch {}/{} failed", i + 1, batch_count))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(combine_batch_results(batches))
}

/// Merges per-chunk bundles in chunk order.
///
/// Mapped pairs are concatenated and same-key groups are concatenated. The
/// merged results are then recomputed as the sum of each group's numeric
/// values; values without a numeric reading add nothing. The per-chunk
/// reducer outputs are dropped, so a non-additive reducer such as a mean or
/// a maximum does not survive the merge.
pub fn combine_batch_results<K, V, A>(batches: Vec<ResultBundle<K, V, A>>) -> BatchBundle<K, V>
where
    K: Eq + Hash + Clone,
    V: Numeric,
{
    let batch_count = batches.len();
    let mut mapped = Vec::new();
    let mut shuffled = Shuffled::new();
    for batch in batches {
        mapped.extend(batch.mapped);
        for (key, values) in batch.shuffled {
            shuffled.entry(key).or_insert_with(Vec::new).extend(values);
        }
    }

    let results = shuffled
        .iter()
        .map(|(key, values)| {
            let sum: f64 = values.iter().filter_map(Numeric::as_f64).sum();
            (key.clone(), sum)
        })
        .collect_vec();

    BatchBundle {
        bundle: ResultBundle::new(mapped, shuffled, results),
        batch_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(n: &i64, _: usize) -> Result<Emit<String, i64>> {
        Ok(Emit::Single(format!("k{}", n % 3), *n))
    }

    fn max(_: &String, values: &[i64]) -> Result<i64> {
        Ok(values.iter().copied().max().unwrap_or_default())
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = map_reduce_batch(&[1i64], pair, max, 0).unwrap_err();
        assert_eq!(err.to_string(), "batch size must be at least 1");
    }

    #[test]
    fn chunks_and_counts() {
        let data = (1..=10).collect::<Vec<i64>>();
        let batch = map_reduce_batch(&data, pair, max, 4).unwrap();
        assert_eq!(batch.batch_count, 3);
        assert_eq!(batch.bundle.mapped.len(), 10);
        assert_eq!(
            batch.bundle.mapped.iter().map(|(_, v)| *v).collect_vec(),
            data
        );
        assert_eq!(
            batch.bundle.shuffled.keys().cloned().collect_vec(),
            vec!["k1", "k2", "k0"]
        );
        assert_eq!(batch.bundle.shuffled["k1"], vec![1, 4, 7, 10]);
    }

    #[test]
    fn merge_sums_instead_of_reducing() {
        // the reducer asks for a maximum, the merge still adds everything up
        let data = (1..=10).collect::<Vec<i64>>();
        let batch = map_reduce_batch(&data, pair, max, 4).unwrap();
        assert_eq!(
            batch.bundle.results,
            vec![
                ("k1".to_owned(), 22.0),
                ("k2".to_owned(), 15.0),
                ("k0".to_owned(), 18.0),
            ]
        );
    }

    #[test]
    fn positions_restart_per_chunk() {
        let data = ["a", "b", "c", "d", "e"];
        let batch = map_reduce_batch(
            &data,
            |_, position| Ok(Emit::Single("pos", position)),
            |_, vs: &[usize]| Ok(vs.len()),
            2,
        )
        .unwrap();
        assert_eq!(batch.batch_count, 3);
        assert_eq!(batch.bundle.shuffled["pos"], vec![1, 2, 1, 2, 1]);
    }

    #[test]
    fn non_numeric_values_add_nothing() {
        let data = ["x", "y"];
        let batch = map_reduce_batch(
            &data,
            |w: &&str, _| Ok(Emit::Single("words", w.to_string())),
            |_, vs: &[String]| Ok(vs.join(" ")),
            1,
        )
        .unwrap();
        assert_eq!(batch.bundle.results, vec![("words", 0.0)]);
    }

    #[test]
    fn empty_input_has_no_batches() {
        let data: Vec<i64> = vec![];
        let batch = map_reduce_batch(&data, pair, max, DEFAULT_BATCH_SIZE).unwrap();
        assert_eq!(batch.batch_count, 0);
        assert!(batch.bundle.is_empty());
    }
}
