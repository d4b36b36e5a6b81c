use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use thiserror::Error;

use crate::cipher;
use crate::factor::{self, CancelToken};
use crate::keys::{self, PrivateKey, PublicKey};

/// How often the coordinator re-checks the deadline and worker liveness.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("factorization attempts exhausted without finding a factor")]
    FactorizationFailed,

    #[error("recovered factor does not split the modulus into two primes")]
    FactorizationInconsistent,

    #[error("search space exhausted without a matching exponent")]
    RecoveryFailed,

    #[error("deadline elapsed before any worker claimed a result")]
    RecoveryTimedOut,
}

/// Which engine the racing workers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Factor the modulus with Pollard's rho and derive d from p and q.
    Factorize,
    /// Walk the odd exponent candidates and test-decrypt a ciphertext
    /// sample against a known plaintext marker.
    BruteForce,
}

/// Parameters of one recovery run.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    pub workers: usize,
    pub strategy: Strategy,
    /// When set, the run is cancelled after this much wall time and
    /// reports [`RecoveryError::RecoveryTimedOut`] if nothing was claimed.
    pub deadline: Option<Duration>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            strategy: Strategy::Factorize,
            deadline: None,
        }
    }
}

/// Write-once slot the workers race for. The first successful claim wins;
/// later claims are discarded, not queued.
#[derive(Debug, Default)]
struct Outcome {
    slot: OnceLock<Win>,
}

#[derive(Debug, Clone)]
struct Win {
    value: BigUint,
    #[allow(dead_code)]
    worker: usize,
}

impl Outcome {
    fn new() -> Self {
        Self::default()
    }

    /// Returns true when this worker's claim won the slot.
    fn claim(&self, value: BigUint, worker: usize) -> bool {
        self.slot.set(Win { value, worker }).is_ok()
    }

    fn get(&self) -> Option<&Win> {
        self.slot.get()
    }
}

/// Recovers the private key for `public`, blocking until a worker claims a
/// result or the whole search is exhausted. `ciphertext` and `marker` are
/// only consulted by the brute-force strategy.
pub fn recover_private_key(
    public: &PublicKey,
    ciphertext: &[u8],
    marker: &[u8],
    config: &RecoveryConfig,
) -> Result<PrivateKey, RecoveryError> {
    match config.strategy {
        Strategy::Factorize => recover_by_factoring(public, config),
        Strategy::BruteForce => recover_by_search(public, ciphertext, marker, config),
    }
}

/// Races `workers` independent Pollard's rho runs against each other and
/// derives the private exponent from the winning factor.
pub fn recover_by_factoring(
    public: &PublicKey,
    config: &RecoveryConfig,
) -> Result<PrivateKey, RecoveryError> {
    let workers = config.workers.max(1);
    let cancel = CancelToken::new();
    let outcome = Outcome::new();
    let live = AtomicUsize::new(workers);

    let timed_out = thread::scope(|scope| {
        let cancel = &cancel;
        let outcome = &outcome;
        let live = &live;
        for id in 0..workers {
            scope.spawn(move || {
                if let Some(p) = factor::find_factor(&public.n, cancel) {
                    if outcome.claim(p, id) {
                        cancel.cancel();
                    }
                }
                live.fetch_sub(1, Ordering::AcqRel);
            });
        }
        watch(cancel, outcome, live, config.deadline)
    });

    match outcome.get() {
        Some(win) => derive_private(public, &win.value),
        None if timed_out => Err(RecoveryError::RecoveryTimedOut),
        None => Err(RecoveryError::FactorizationFailed),
    }
}

/// Partitions the odd exponents of `[3, 2^num_bits)` across `workers`
/// ranges and races them; a candidate wins when decrypting the ciphertext
/// sample with it reproduces the plaintext marker.
pub fn recover_by_search(
    public: &PublicKey,
    ciphertext: &[u8],
    marker: &[u8],
    config: &RecoveryConfig,
) -> Result<PrivateKey, RecoveryError> {
    let workers = config.workers.max(1);
    let sample = marker_sample(public, ciphertext, marker);
    let end = BigUint::one() << public.num_bits;
    let ranges = split_ranges(&end, workers);

    let cancel = CancelToken::new();
    let outcome = Outcome::new();
    let live = AtomicUsize::new(workers);

    let timed_out = thread::scope(|scope| {
        let cancel = &cancel;
        let outcome = &outcome;
        let live = &live;
        for (id, range) in ranges.into_iter().enumerate() {
            scope.spawn(move || {
                search_range(public, sample, marker, range, cancel, outcome, id);
                live.fetch_sub(1, Ordering::AcqRel);
            });
        }
        watch(cancel, outcome, live, config.deadline)
    });

    match outcome.get() {
        Some(win) => Ok(PrivateKey {
            num_bits: public.num_bits,
            enc_block_size: public.enc_block_size,
            dec_block_size: public.dec_block_size,
            n: public.n.clone(),
            d: win.value.clone(),
        }),
        None if timed_out => Err(RecoveryError::RecoveryTimedOut),
        None => Err(RecoveryError::RecoveryFailed),
    }
}

/// Coordinator-side loop: waits for a claim, worker exhaustion, or the
/// deadline. Returns true when the deadline fired and cancelled the run.
fn watch(
    cancel: &CancelToken,
    outcome: &Outcome,
    live: &AtomicUsize,
    deadline: Option<Duration>,
) -> bool {
    let started = Instant::now();
    loop {
        if outcome.get().is_some() || cancel.is_cancelled() {
            return false;
        }
        if live.load(Ordering::Acquire) == 0 {
            return false;
        }
        if let Some(limit) = deadline {
            if started.elapsed() >= limit {
                return cancel.cancel();
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// One worker's walk over its exponent range: odd candidates only, token
/// polled once per candidate.
fn search_range(
    public: &PublicKey,
    sample: &[u8],
    marker: &[u8],
    (lo, hi): (BigUint, BigUint),
    cancel: &CancelToken,
    outcome: &Outcome,
    worker: usize,
) {
    if sample.is_empty() {
        // nothing to test candidates against, the range can never match
        return;
    }
    let two = BigUint::from(2u32);
    let mut candidate = lo;
    if candidate.is_even() {
        candidate += 1u32;
    }
    while candidate < hi {
        if cancel.is_cancelled() {
            return;
        }
        let clear = cipher::decrypt_raw(
            sample,
            &public.n,
            &candidate,
            public.dec_block_size,
            public.enc_block_size,
        );
        if matches_marker(&clear, marker) {
            if outcome.claim(candidate, worker) {
                cancel.cancel();
            }
            return;
        }
        candidate += &two;
    }
}

/// The leading ciphertext blocks a candidate has to decrypt to cover the
/// marker; testing more than that per candidate would be wasted work.
fn marker_sample<'a>(public: &PublicKey, ciphertext: &'a [u8], marker: &[u8]) -> &'a [u8] {
    if public.enc_block_size == 0 || public.dec_block_size == 0 {
        return &[];
    }
    let blocks = Integer::div_ceil(&marker.len(), &public.enc_block_size).max(1);
    let aligned = (ciphertext.len() / public.dec_block_size) * public.dec_block_size;
    &ciphertext[..aligned.min(blocks * public.dec_block_size)]
}

fn matches_marker(clear: &[u8], marker: &[u8]) -> bool {
    !clear.is_empty() && clear.starts_with(&marker[..marker.len().min(clear.len())])
}

/// Splits `[3, end)` into `workers` contiguous ranges without gap or
/// overlap. Range starts may be even; the workers nudge them up to odd.
fn split_ranges(end: &BigUint, workers: usize) -> Vec<(BigUint, BigUint)> {
    let start = BigUint::from(3u32);
    if *end <= start {
        return (0..workers).map(|_| (start.clone(), start.clone())).collect();
    }
    let span = (end - &start) / BigUint::from(workers as u64);
    let mut ranges = Vec::with_capacity(workers);
    let mut lo = start;
    for i in 0..workers {
        let hi = if i + 1 == workers {
            end.clone()
        } else {
            &lo + &span
        };
        ranges.push((lo.clone(), hi.clone()));
        lo = hi;
    }
    ranges
}

/// Rebuilds the private key from one factor of the modulus. The factor and
/// its cofactor must both be prime, otherwise the derived exponent would
/// not belong to the original key.
fn derive_private(public: &PublicKey, p: &BigUint) -> Result<PrivateKey, RecoveryError> {
    if p.is_one() || p == &public.n || !(&public.n % p).is_zero() {
        return Err(RecoveryError::FactorizationInconsistent);
    }
    let q = &public.n / p;
    if !crate::prime::is_prime(p) || !crate::prime::is_prime(&q) {
        return Err(RecoveryError::FactorizationInconsistent);
    }
    let lambda = keys::totient(p, &q);
    let d = keys::invmod(&public.e, &lambda).ok_or(RecoveryError::FactorizationInconsistent)?;
    Ok(PrivateKey {
        num_bits: public.num_bits,
        enc_block_size: public.enc_block_size,
        dec_block_size: public.dec_block_size,
        n: public.n.clone(),
        d,
    })
}
