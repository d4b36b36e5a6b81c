use lazy_static::lazy_static;
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;

/// Rounds of Miller-Rabin. Matches GMP's recommended reps for
/// mpz_probab_prime_p.
const MILLER_RABIN_ROUNDS: u32 = 25;

lazy_static! {
    /// Primes below 1000, used to cheaply reject candidates before the
    /// Miller-Rabin rounds run.
    static ref SMALL_PRIMES: Vec<u32> = sieve(1000);
}

fn sieve(limit: usize) -> Vec<u32> {
    let mut composite = vec![false; limit];
    let mut primes = Vec::new();
    for i in 2..limit {
        if composite[i] {
            continue;
        }
        primes.push(i as u32);
        let mut j = i * i;
        while j < limit {
            composite[j] = true;
            j += i;
        }
    }
    primes
}

/// Probabilistic primality check.
pub fn is_prime(n: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }
    for &p in SMALL_PRIMES.iter() {
        let p = BigUint::from(p);
        if *n == p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }
    miller_rabin(n, MILLER_RABIN_ROUNDS, &mut rand::thread_rng())
}

/// Miller-Rabin witness loop. Expects n odd and larger than the small-prime
/// table bound.
fn miller_rabin<R: Rng>(n: &BigUint, rounds: u32, rng: &mut R) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let n_minus_one = n - &one;

    // n - 1 = d * 2^s with d odd
    let mut d = n_minus_one.clone();
    let mut s = 0u32;
    while d.is_even() {
        d >>= 1;
        s += 1;
    }

    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue 'witness;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
            if x == one {
                return false;
            }
        }
        return false;
    }
    true
}

pub mod gen {
    use super::is_prime;
    use num_bigint::{BigUint, RandBigInt};
    use num_integer::Integer;
    use num_traits::One;

    /// Draws a random integer of at most `bits` bits and advances it to
    /// the next prime.
    pub fn new_prime(bits: u64) -> BigUint {
        let start = rand::thread_rng().gen_biguint(bits);
        next_prime(&start)
    }

    /// Smallest prime strictly greater than `n`.
    pub fn next_prime(n: &BigUint) -> BigUint {
        let two = BigUint::from(2u32);
        if *n < two {
            return two;
        }
        let mut candidate = n + BigUint::one();
        if candidate.is_even() {
            candidate += BigUint::one();
        }
        while !is_prime(&candidate) {
            candidate += &two;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values() {
        let primes = [2u32, 3, 5, 7, 11, 101, 997, 1009, 1013];
        for p in primes {
            assert!(is_prime(&BigUint::from(p)), "{} should be prime", p);
        }
        let composites = [0u32, 1, 4, 9, 15, 1001, 1024, 1022117];
        for c in composites {
            assert!(!is_prime(&BigUint::from(c)), "{} should be composite", c);
        }
    }

    #[test]
    fn large_known_prime() {
        // 2^89 - 1, a Mersenne prime
        let p = (BigUint::one() << 89u32) - BigUint::one();
        assert!(is_prime(&p));
        assert!(!is_prime(&(p + BigUint::from(2u32))));
    }

    #[test]
    fn next_prime_values() {
        assert_eq!(gen::next_prime(&BigUint::from(0u32)), BigUint::from(2u32));
        assert_eq!(gen::next_prime(&BigUint::from(2u32)), BigUint::from(3u32));
        assert_eq!(gen::next_prime(&BigUint::from(8u32)), BigUint::from(11u32));
        assert_eq!(
            gen::next_prime(&BigUint::from(1009u32)),
            BigUint::from(1013u32)
        );
    }

    #[test]
    fn new_prime_is_prime() {
        for bits in [8, 16, 32, 64] {
            let p = gen::new_prime(bits);
            assert!(is_prime(&p));
        }
    }
}
