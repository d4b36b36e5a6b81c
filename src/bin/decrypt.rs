use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rsa_lab::cipher;
use rsa_lab::keyfile;

/// Decrypts a ciphertext file with a private key file and prints the
/// recovered plaintext.
#[derive(Parser, Debug)]
#[command(name = "decrypt")]
struct Args {
    /// Private key file
    private_key: PathBuf,

    /// Encrypted message file
    ciphertext: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let keys = keyfile::read_private(&args.private_key)
        .with_context(|| format!("reading {}", args.private_key.display()))?;
    let encrypted = fs::read(&args.ciphertext)
        .with_context(|| format!("reading {}", args.ciphertext.display()))?;
    println!("Read {} bytes", encrypted.len());
    println!("Encrypted: ({})", hex::encode(&encrypted));

    let clear = cipher::decrypt(&encrypted, &keys.private()).context("decryption failed")?;
    println!("Decrypted: ({})", hex::encode(&clear));

    // decrypt keeps the zero padding of the final block; trim it only here
    let text = String::from_utf8_lossy(&clear);
    println!("{}", text.trim_end_matches('\0'));
    Ok(())
}
