use num_bigint::{BigInt, BigUint, ToBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use thiserror::Error;

use crate::prime::{self, gen};

/// Fixed public exponent for every generated key. Deliberately tiny so the
/// recovery engine has a realistic search; real deployments use 65537.
pub const DEFAULT_E: u32 = 101;

/// Smallest key size that leaves room for two cofactors and the exponent.
pub const MIN_KEY_SIZE: u32 = 8;

#[derive(Debug, Error)]
pub enum KeyGenError {
    #[error("key size is too small")]
    KeyTooSmall,

    #[error("public exponent is not invertible modulo the totient")]
    ExponentNotInvertible,

    #[error("{0} is not prime")]
    NotPrime(BigUint),
}

/// Public half of a key pair, together with the cipher block sizes that
/// travel with it in the key file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub num_bits: u32,
    pub enc_block_size: usize,
    pub dec_block_size: usize,
    pub n: BigUint,
    pub e: BigUint,
}

/// Private decryption half: the modulus and the secret exponent. A recovered
/// key is a `PrivateKey` even when the factorization stays unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub num_bits: u32,
    pub enc_block_size: usize,
    pub dec_block_size: usize,
    pub n: BigUint,
    pub d: BigUint,
}

/// A full generated key pair, including the prime factorization of n.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub num_bits: u32,
    pub enc_block_size: usize,
    pub dec_block_size: usize,
    pub p: BigUint,
    pub q: BigUint,
    pub n: BigUint,
    pub d: BigUint,
    pub e: BigUint,
}

impl KeyPair {
    /// Generates a key pair with a modulus of roughly `num_bits` bits:
    /// p gets half the bits, q gets whatever is left next to p.
    pub fn generate(num_bits: u32) -> Result<KeyPair, KeyGenError> {
        if num_bits < MIN_KEY_SIZE {
            return Err(KeyGenError::KeyTooSmall);
        }
        let p = gen::new_prime(u64::from(num_bits / 2));
        let q_bits = u64::from(num_bits).saturating_sub(p.bits()).max(2);
        let q = gen::new_prime(q_bits);
        Self::from_parts(p, q, num_bits)
    }

    /// Builds a key pair from two known primes, deriving the cipher
    /// parameters the same way `generate` does.
    pub fn from_primes(p: BigUint, q: BigUint, num_bits: u32) -> Result<KeyPair, KeyGenError> {
        if !prime::is_prime(&p) {
            return Err(KeyGenError::NotPrime(p));
        }
        if !prime::is_prime(&q) {
            return Err(KeyGenError::NotPrime(q));
        }
        Self::from_parts(p, q, num_bits)
    }

    fn from_parts(p: BigUint, q: BigUint, requested_bits: u32) -> Result<KeyPair, KeyGenError> {
        let n = &p * &q;
        let lambda = totient(&p, &q);
        let e = BigUint::from(DEFAULT_E);
        let d = invmod(&e, &lambda).ok_or(KeyGenError::ExponentNotInvertible)?;

        // The stored bit count is the actual width of n; the decrypt block
        // must hold any value below n.
        let num_bits = n.bits() as u32;
        Ok(KeyPair {
            num_bits,
            enc_block_size: enc_block_size(requested_bits),
            dec_block_size: dec_block_size(num_bits),
            p,
            q,
            n,
            d,
            e,
        })
    }

    pub fn public(&self) -> PublicKey {
        PublicKey {
            num_bits: self.num_bits,
            enc_block_size: self.enc_block_size,
            dec_block_size: self.dec_block_size,
            n: self.n.clone(),
            e: self.e.clone(),
        }
    }

    pub fn private(&self) -> PrivateKey {
        PrivateKey {
            num_bits: self.num_bits,
            enc_block_size: self.enc_block_size,
            dec_block_size: self.dec_block_size,
            n: self.n.clone(),
            d: self.d.clone(),
        }
    }
}

/// Totient the exponents are inverses modulo. The product (p-1)(q-1) is
/// kept rather than the Carmichael lcm(p-1, q-1): both are valid, but they
/// select different d values and the serialized keys must stay comparable.
pub fn totient(p: &BigUint, q: &BigUint) -> BigUint {
    (p - 1u32) * (q - 1u32)
}

/// Bytes of plaintext per block, from the requested key size. Every block
/// value must stay strictly below n, so the tiers leave a gap.
pub fn enc_block_size(num_bits: u32) -> usize {
    match num_bits {
        0..=8 => 0,
        9..=16 => 1,
        17..=32 => 2,
        33..=64 => 4,
        65..=128 => 8,
        129..=1024 => 16,
        1025..=2048 => 32,
        2049..=4096 => 64,
        _ => 128,
    }
}

/// Bytes of ciphertext per block: enough to hold any value below a
/// `num_bits`-bit modulus.
pub fn dec_block_size(num_bits: u32) -> usize {
    Integer::div_ceil(&(num_bits as usize), &8)
}

/// Extended Euclidian algorithm. Taken directly from wikipedia
#[allow(clippy::many_single_char_names)]
pub fn egcd(a: &BigUint, b: &BigUint) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.to_bigint().expect("biguint"), b.to_bigint().expect("biguint"));
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = &old_r / &r;

        let temp = r.clone();
        r = old_r - &q * r;
        old_r = temp;

        let temp = s.clone();
        s = old_s - &q * s;
        old_s = temp;

        let temp = t.clone();
        t = old_t - q * t;
        old_t = temp;
    }
    (old_r, old_s, old_t)
}

/// Modulo inverse. Returns None if the inverse doesn't exist.
#[allow(clippy::many_single_char_names)]
pub fn invmod(a: &BigUint, n: &BigUint) -> Option<BigUint> {
    let (gcd, inverse, _) = egcd(a, n);
    if gcd == One::one() {
        let res = inverse.mod_floor(&n.to_bigint().expect("biguint"));
        res.to_biguint()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generation can legitimately fail when gcd(e, lambda) != 1; the
    /// property tests just redraw.
    fn generate_retrying(num_bits: u32) -> KeyPair {
        loop {
            match KeyPair::generate(num_bits) {
                Ok(pair) => return pair,
                Err(KeyGenError::ExponentNotInvertible) => continue,
                Err(err) => panic!("unexpected generation error: {err}"),
            }
        }
    }

    #[test]
    fn rejects_tiny_keys() {
        assert!(matches!(
            KeyPair::generate(7),
            Err(KeyGenError::KeyTooSmall)
        ));
    }

    #[test]
    fn generated_pairs_are_consistent() {
        for bits in [16u32, 32, 64, 128] {
            let pair = generate_retrying(bits);
            assert_eq!(&pair.p * &pair.q, pair.n, "n = p*q at {bits} bits");
            assert!(crate::prime::is_prime(&pair.p));
            assert!(crate::prime::is_prime(&pair.q));

            let lambda = totient(&pair.p, &pair.q);
            assert_eq!((&pair.d * &pair.e) % &lambda, BigUint::one());
            assert_eq!(pair.num_bits, pair.n.bits() as u32);
            assert_eq!(pair.dec_block_size, dec_block_size(pair.num_bits));
        }
    }

    #[test]
    fn fixed_demo_primes() {
        let pair = KeyPair::from_primes(
            BigUint::from(1009u32),
            BigUint::from(1013u32),
            32,
        )
        .unwrap();
        assert_eq!(pair.n, BigUint::from(1_022_117u32));
        assert_eq!(pair.e, BigUint::from(101u32));
        let lambda = totient(&pair.p, &pair.q);
        assert_eq!((&pair.d * &pair.e) % lambda, BigUint::one());
        assert_eq!(pair.enc_block_size, 2);
    }

    #[test]
    fn from_primes_rejects_composites() {
        let err = KeyPair::from_primes(BigUint::from(1000u32), BigUint::from(1013u32), 32);
        assert!(matches!(err, Err(KeyGenError::NotPrime(_))));
    }

    #[test]
    fn block_size_tiers() {
        assert_eq!(enc_block_size(8), 0);
        assert_eq!(enc_block_size(16), 1);
        assert_eq!(enc_block_size(32), 2);
        assert_eq!(enc_block_size(64), 4);
        assert_eq!(enc_block_size(128), 8);
        assert_eq!(enc_block_size(1024), 16);
        assert_eq!(enc_block_size(2048), 32);
        assert_eq!(enc_block_size(4096), 64);
        assert_eq!(enc_block_size(8192), 128);

        assert_eq!(dec_block_size(32), 4);
        assert_eq!(dec_block_size(33), 5);
        assert_eq!(dec_block_size(20), 3);
    }

    #[test]
    fn invmod_known_values() {
        // 3 * 5 = 15 = 1 mod 7
        let inv = invmod(&BigUint::from(3u32), &BigUint::from(7u32)).unwrap();
        assert_eq!(inv, BigUint::from(5u32));
        // 2 has no inverse mod 4
        assert!(invmod(&BigUint::from(2u32), &BigUint::from(4u32)).is_none());
    }
}
