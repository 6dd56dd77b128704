//! In-memory map, shuffle and reduce over a slice of records.
//!
//! Three entry points share the same phases:
//!
//! - [`map_reduce`] runs synchronously and stops at the first failing mapper
//!   or reducer call.
//! - [`map_reduce_async`] reports [`Progress`] and skips failing records and
//!   keys instead of failing.
//! - [`map_reduce_batch`] runs [`map_reduce`] per chunk and merges the chunks
//!   with a numeric sum.
//!
//! The `run*` functions drive the same entry points from an [`App`].

mod batch;
mod bundle;
mod phases;
mod progress;

pub use batch::{combine_batch_results, map_reduce_batch, BatchBundle, DEFAULT_BATCH_SIZE};
pub use bundle::{ResultBundle, Shuffled, Stats};
pub use phases::map_reduce;
pub use progress::{map_reduce_async, Phase, Progress};

use common::{App, Numeric, Result};

pub type AppBundle<A> = ResultBundle<<A as App>::Key, <A as App>::Value, <A as App>::Output>;

pub fn run<A: App>(app: &A, data: &[A::Record]) -> Result<AppBundle<A>> {
    map_reduce(data, |r, i| app.map(r, i), |k, vs| app.reduce(k, vs))
}

pub async fn run_async<A: App>(
    app: &A,
    data: &[A::Record],
    on_progress: Option<&mut dyn FnMut(Progress)>,
) -> AppBundle<A> {
    map_reduce_async(data, |r, i| app.map(r, i), |k, vs| app.reduce(k, vs), on_progress).await
}

pub fn run_batch<A: App>(
    app: &A,
    data: &[A::Record],
    batch_size: usize,
) -> Result<BatchBundle<A::Key, A::Value>>
where
    A::Value: Numeric,
{
    map_reduce_batch(data, |r, i| app.map(r, i), |k, vs| app.reduce(k, vs), batch_size)
}
