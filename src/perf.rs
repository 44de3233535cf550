//! Batch decoding.
//!
//! Prefetch directories hold hundreds of small, independent files.
//! [`decode_all`] decodes a batch of them, concurrently with Rayon when the
//! `parallel` feature is enabled and sequentially otherwise.  Results come
//! back in input order; one bad file never aborts the rest.

use std::path::{Path, PathBuf};

use crate::prefetch::{DecodeOptions, Prefetch, PrefetchError};

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Anything [`decode_all`] can decode: a path on disk or bytes already read.
pub trait DecodeInput: Sync {
    fn decode(&self, opts: &DecodeOptions) -> Result<Prefetch, PrefetchError>;
}

impl DecodeInput for Path {
    fn decode(&self, opts: &DecodeOptions) -> Result<Prefetch, PrefetchError> {
        Prefetch::open(self, opts)
    }
}

impl DecodeInput for PathBuf {
    fn decode(&self, opts: &DecodeOptions) -> Result<Prefetch, PrefetchError> {
        Prefetch::open(self, opts)
    }
}

impl DecodeInput for [u8] {
    fn decode(&self, opts: &DecodeOptions) -> Result<Prefetch, PrefetchError> {
        Prefetch::from_bytes(self, opts)
    }
}

impl DecodeInput for Vec<u8> {
    fn decode(&self, opts: &DecodeOptions) -> Result<Prefetch, PrefetchError> {
        Prefetch::from_bytes(self, opts)
    }
}

impl<T: DecodeInput + ?Sized> DecodeInput for &T {
    fn decode(&self, opts: &DecodeOptions) -> Result<Prefetch, PrefetchError> {
        (**self).decode(opts)
    }
}

// ── Batch decode ──────────────────────────────────────────────────────────────

/// Decode every input, returning one result per input in the same order.
pub fn decode_all<T: DecodeInput>(
    inputs: &[T],
    opts:   &DecodeOptions,
) -> Vec<Result<Prefetch, PrefetchError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        inputs.par_iter().map(|input| input.decode(opts)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        inputs.iter().map(|input| input.decode(opts)).collect()
    }
}
