use std::{io, iter};

use itertools::Itertools;
use proptest::{collection::btree_set, prelude::*};
use rand::{SeedableRng, rngs::StdRng, seq::index};

use crate::{MAX_CARDINALITY, codec::Codec, traits::ContainerRead};

/// Every codec available on this host: portable, then zero-copy when the
/// host passes the capability gate.
pub fn codecs() -> Vec<Codec> {
    iter::once(Codec::portable())
        .chain(Codec::zero_copy())
        .collect()
}

/// A strategy producing sorted, unique container values.
pub fn sorted_set(max_len: usize) -> impl Strategy<Value = Vec<u16>> {
    btree_set(any::<u16>(), 0..max_len).prop_map(|set| set.into_iter().collect())
}

/// A writer which fails every write.
pub struct FailingWriter;

impl io::Write for FailingWriter {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "writer closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct SetGen {
    rng: StdRng,
}

impl SetGen {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// `len` unique values sampled uniformly, sorted.
    #[track_caller]
    pub fn random(&mut self, len: usize) -> Vec<u16> {
        index::sample(&mut self.rng, MAX_CARDINALITY, len)
            .into_iter()
            .map(|i| i as u16)
            .sorted()
            .collect()
    }

    /// `len` unique sorted values grouped into runs. `beta` close to 1 yields a
    /// few long runs, close to 0 mostly isolated values.
    #[track_caller]
    pub fn runs(&mut self, len: usize, beta: f64) -> Vec<u16> {
        assert!(len <= MAX_CARDINALITY, "len out of range");
        assert!((0.0..=1.0).contains(&beta), "beta out of range");
        if len == 0 {
            return vec![];
        }
        let num_runs = ((len as f64 * (1.0 - beta)).round() as usize).clamp(1, len);

        // split len into num_runs lengths
        let cuts = index::sample(&mut self.rng, len - 1, num_runs - 1)
            .into_iter()
            .map(|i| i + 1)
            .sorted();
        let lengths = iter::once(0)
            .chain(cuts)
            .chain(iter::once(len))
            .tuple_windows()
            .map(|(a, b)| b - a);

        // place the runs by choosing one slot per run in the space left over
        let slots = index::sample(&mut self.rng, MAX_CARDINALITY - len + num_runs, num_runs)
            .into_iter()
            .sorted();

        let mut out = Vec::with_capacity(len);
        for (j, (slot, run_len)) in slots.zip(lengths).enumerate() {
            let start = slot + out.len() - j;
            out.extend((start..start + run_len).map(|v| v as u16));
        }
        out
    }
}

/// Check every read accessor of `container` against the sorted, unique
/// `expected` values.
#[track_caller]
pub fn test_container_read<C: ContainerRead>(container: &C, expected: &[u16]) {
    assert_eq!(container.cardinality(), expected.len());
    assert_eq!(container.is_empty(), expected.is_empty());
    assert_eq!(container.last(), expected.last().copied());
    itertools::assert_equal(container.iter(), expected.iter().copied());

    for &value in expected.iter().take(256) {
        assert!(container.contains(value), "missing {value}");
    }

    let missing = (0..=u16::MAX)
        .filter(|v| expected.binary_search(v).is_err())
        .take(256);
    for value in missing {
        assert!(!container.contains(value), "unexpected {value}");
    }
}
