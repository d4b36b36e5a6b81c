use num_bigint::BigUint;
use num_integer::Integer;
use thiserror::Error;

use crate::keys::{PrivateKey, PublicKey};

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("key carries no usable block sizes")]
    InvalidBlockSizes,

    #[error("ciphertext length {0} is not a multiple of the block size {1}")]
    MisalignedCiphertext(usize, usize),
}

/// Encrypts `message` block by block.
///
/// The message is split into `enc_block_size`-byte chunks, the last chunk
/// zero-padded to full width. Each chunk is read as a big-endian integer m
/// and written out as the fixed `dec_block_size`-byte big-endian encoding
/// of m^e mod n. A message whose length is an exact multiple of the block
/// size emits no extra padding block; the empty message encrypts to the
/// empty ciphertext.
pub fn encrypt(message: &[u8], key: &PublicKey) -> Result<Vec<u8>, CipherError> {
    if key.enc_block_size == 0 || key.dec_block_size == 0 {
        return Err(CipherError::InvalidBlockSizes);
    }
    let blocks = Integer::div_ceil(&message.len(), &key.enc_block_size);
    let mut encrypted = Vec::with_capacity(blocks * key.dec_block_size);
    for chunk in message.chunks(key.enc_block_size) {
        let mut block = vec![0u8; key.enc_block_size];
        block[..chunk.len()].copy_from_slice(chunk);
        let m = BigUint::from_bytes_be(&block);
        let c = m.modpow(&key.e, &key.n);
        encrypted.extend_from_slice(&to_block(&c, key.dec_block_size));
    }
    Ok(encrypted)
}

/// Decrypts a ciphertext produced by [`encrypt`].
///
/// Every `dec_block_size`-byte chunk yields exactly `enc_block_size` bytes
/// of plaintext; trailing zero padding from the final block is not
/// stripped, callers compare against a known length or marker.
pub fn decrypt(ciphertext: &[u8], key: &PrivateKey) -> Result<Vec<u8>, CipherError> {
    if key.enc_block_size == 0 || key.dec_block_size == 0 {
        return Err(CipherError::InvalidBlockSizes);
    }
    if ciphertext.len() % key.dec_block_size != 0 {
        return Err(CipherError::MisalignedCiphertext(
            ciphertext.len(),
            key.dec_block_size,
        ));
    }
    Ok(decrypt_raw(
        ciphertext,
        &key.n,
        &key.d,
        key.dec_block_size,
        key.enc_block_size,
    ))
}

/// Block loop without a key struct; the brute-force search calls this with
/// candidate exponents.
pub(crate) fn decrypt_raw(
    ciphertext: &[u8],
    n: &BigUint,
    d: &BigUint,
    in_block: usize,
    out_block: usize,
) -> Vec<u8> {
    let mut clear = Vec::with_capacity((ciphertext.len() / in_block) * out_block);
    for chunk in ciphertext.chunks(in_block) {
        let c = BigUint::from_bytes_be(chunk);
        let m = c.modpow(d, n);
        clear.extend_from_slice(&to_block(&m, out_block));
    }
    clear
}

/// Fixed-width big-endian encoding, zero-padded at the high end. A value
/// too wide for the block keeps only its low `width` bytes.
fn to_block(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut block = vec![0u8; width];
    if bytes.len() >= width {
        block.copy_from_slice(&bytes[bytes.len() - width..]);
    } else {
        block[width - bytes.len()..].copy_from_slice(&bytes);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyGenError, KeyPair};

    fn demo_pair() -> KeyPair {
        KeyPair::from_primes(BigUint::from(1009u32), BigUint::from(1013u32), 32).unwrap()
    }

    fn generate(num_bits: u32) -> KeyPair {
        loop {
            match KeyPair::generate(num_bits) {
                Ok(pair) => return pair,
                Err(KeyGenError::ExponentNotInvertible) => continue,
                Err(err) => panic!("unexpected generation error: {err}"),
            }
        }
    }

    #[test]
    fn round_trip_multi_block() {
        let pair = demo_pair();
        let message = b"The Magic Words are Squeamish Ossifrage";
        let encrypted = encrypt(message, &pair.public()).unwrap();
        assert_eq!(encrypted.len() % pair.dec_block_size, 0);

        let clear = decrypt(&encrypted, &pair.private()).unwrap();
        assert_eq!(&clear[..message.len()], message);
        // padding on the short final block is zero bytes
        assert!(clear[message.len()..].iter().all(|&b| b == 0));
        assert_eq!(clear.len() % pair.enc_block_size, 0);
    }

    #[test]
    fn exact_multiple_emits_no_extra_block() {
        let pair = demo_pair();
        // 4 bytes with enc_block_size 2: exactly two blocks
        let message = b"abcd";
        let encrypted = encrypt(message, &pair.public()).unwrap();
        assert_eq!(encrypted.len(), 2 * pair.dec_block_size);

        let clear = decrypt(&encrypted, &pair.private()).unwrap();
        assert_eq!(clear, message);
    }

    #[test]
    fn empty_message_encrypts_to_nothing() {
        let pair = demo_pair();
        let encrypted = encrypt(b"", &pair.public()).unwrap();
        assert!(encrypted.is_empty());
        let clear = decrypt(&encrypted, &pair.private()).unwrap();
        assert!(clear.is_empty());
    }

    #[test]
    fn round_trip_generated_key() {
        let pair = generate(32);
        let message = b"<h1>hello</h1>";
        let encrypted = encrypt(message, &pair.public()).unwrap();
        let clear = decrypt(&encrypted, &pair.private()).unwrap();
        assert_eq!(&clear[..message.len()], message);
        assert!(clear[message.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn rejects_misaligned_ciphertext() {
        let pair = demo_pair();
        let result = decrypt(&[0u8; 5][..pair.dec_block_size + 1], &pair.private());
        assert!(matches!(result, Err(CipherError::MisalignedCiphertext(..))));
    }

    #[test]
    fn rejects_zero_block_sizes() {
        let mut public = demo_pair().public();
        public.enc_block_size = 0;
        assert!(matches!(
            encrypt(b"hi", &public),
            Err(CipherError::InvalidBlockSizes)
        ));
    }
}
