use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use num_bigint::BigUint;
use num_traits::Num;
use thiserror::Error;

use crate::keys::{KeyPair, PublicKey};

/// First line of every key file.
const HEADER: &str = "KEY FILE";

#[derive(Debug, Error)]
pub enum KeyfileError {
    #[error("key file i/o: {0}")]
    Io(#[from] io::Error),

    #[error("missing or wrong header line")]
    BadHeader,

    #[error("malformed size line")]
    BadSizes,

    #[error("missing or malformed {0} field")]
    BadField(&'static str),
}

/// Writes the private variant: header, size line, then p, q, n, d, e as
/// hexadecimal big integers, one per line.
pub fn write_private<P: AsRef<Path>>(keys: &KeyPair, path: P) -> Result<(), KeyfileError> {
    let mut file = File::create(path)?;
    writeln!(file, "{HEADER}")?;
    writeln!(
        file,
        "{} {} {}",
        keys.num_bits, keys.enc_block_size, keys.dec_block_size
    )?;
    for field in [&keys.p, &keys.q, &keys.n, &keys.d, &keys.e] {
        writeln!(file, "{}", field.to_str_radix(16))?;
    }
    Ok(())
}

/// Writes the public variant: header, size line, then n and e.
pub fn write_public<P: AsRef<Path>>(public: &PublicKey, path: P) -> Result<(), KeyfileError> {
    let mut file = File::create(path)?;
    writeln!(file, "{HEADER}")?;
    writeln!(
        file,
        "{} {} {}",
        public.num_bits, public.enc_block_size, public.dec_block_size
    )?;
    writeln!(file, "{}", public.n.to_str_radix(16))?;
    writeln!(file, "{}", public.e.to_str_radix(16))?;
    Ok(())
}

pub fn read_private<P: AsRef<Path>>(path: P) -> Result<KeyPair, KeyfileError> {
    let mut lines = BufReader::new(File::open(path)?).lines();
    let (num_bits, enc_block_size, dec_block_size) = read_sizes(&mut lines)?;
    let p = read_field(&mut lines, "p")?;
    let q = read_field(&mut lines, "q")?;
    let n = read_field(&mut lines, "n")?;
    let d = read_field(&mut lines, "d")?;
    let e = read_field(&mut lines, "e")?;
    Ok(KeyPair {
        num_bits,
        enc_block_size,
        dec_block_size,
        p,
        q,
        n,
        d,
        e,
    })
}

pub fn read_public<P: AsRef<Path>>(path: P) -> Result<PublicKey, KeyfileError> {
    let mut lines = BufReader::new(File::open(path)?).lines();
    let (num_bits, enc_block_size, dec_block_size) = read_sizes(&mut lines)?;
    let n = read_field(&mut lines, "n")?;
    let e = read_field(&mut lines, "e")?;
    Ok(PublicKey {
        num_bits,
        enc_block_size,
        dec_block_size,
        n,
        e,
    })
}

fn read_sizes(
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<(u32, usize, usize), KeyfileError> {
    let header = lines.next().ok_or(KeyfileError::BadHeader)??;
    if header.trim_end() != HEADER {
        return Err(KeyfileError::BadHeader);
    }
    let line = lines.next().ok_or(KeyfileError::BadSizes)??;
    let mut parts = line.split_whitespace();
    let num_bits = parse_size(parts.next())?;
    let enc_block_size = parse_size(parts.next())? as usize;
    let dec_block_size = parse_size(parts.next())? as usize;
    if parts.next().is_some() {
        return Err(KeyfileError::BadSizes);
    }
    Ok((num_bits, enc_block_size, dec_block_size))
}

fn parse_size(part: Option<&str>) -> Result<u32, KeyfileError> {
    part.and_then(|s| s.parse().ok()).ok_or(KeyfileError::BadSizes)
}

fn read_field(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    name: &'static str,
) -> Result<BigUint, KeyfileError> {
    let line = lines.next().ok_or(KeyfileError::BadField(name))??;
    BigUint::from_str_radix(line.trim(), 16).map_err(|_| KeyfileError::BadField(name))
}
