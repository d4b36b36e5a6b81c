use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;

/// Restart budget for when the tortoise and the hare collapse onto the same
/// cycle (gcd comes back as n itself).
const MAX_RESTARTS: u32 = 64;

/// Width of the raw random draws the start point and the increment are
/// reduced from.
const SEED_BITS: u64 = 128;

/// Cooperative cancellation shared between racing workers. The only
/// transition is from live to cancelled; the first caller performs it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Returns true when this call performed the
    /// transition, false when the token was already cancelled.
    pub fn cancel(&self) -> bool {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Finds one nontrivial factor of `n` with Pollard's rho.
///
/// Degenerate inputs short-circuit: 1 has no divisor and is returned as is,
/// an even n returns 2. Otherwise random restarts run the tortoise/hare
/// walk x -> (x^2 + c) mod n until gcd(|x - y|, n) lands strictly between
/// 1 and n. The token is polled once per iteration; a cancelled token or an
/// exhausted restart budget returns None. The search is randomized, so
/// repeated calls may find different factors of a non-semiprime n.
pub fn find_factor(n: &BigUint, cancel: &CancelToken) -> Option<BigUint> {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    if *n == one {
        return Some(one);
    }
    if n.is_even() {
        return Some(two);
    }

    let mut rng = rand::thread_rng();
    for _ in 0..MAX_RESTARTS {
        // x uniform in [2, n), c uniform in [1, n)
        let mut x = rng.gen_biguint(SEED_BITS) % (n - &two) + &two;
        let c = rng.gen_biguint(SEED_BITS) % (n - &one) + &one;
        let mut y = x.clone();

        loop {
            if cancel.is_cancelled() {
                return None;
            }
            x = step(&x, &c, n);
            y = step(&step(&y, &c, n), &c, n);

            let d = abs_diff(&x, &y).gcd(n);
            if d == *n {
                // the walk degenerated, restart with fresh randomness
                break;
            }
            if !d.is_one() {
                return Some(d);
            }
        }
    }
    None
}

/// One move of the polynomial walk: (v^2 + c) mod n.
fn step(v: &BigUint, c: &BigUint, n: &BigUint) -> BigUint {
    (v.modpow(&BigUint::from(2u32), n) + c) % n
}

fn abs_diff(a: &BigUint, b: &BigUint) -> BigUint {
    if a >= b {
        a - b
    } else {
        b - a
    }
}
