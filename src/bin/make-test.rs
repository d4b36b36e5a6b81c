use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rsa_lab::cipher;
use rsa_lab::keyfile;
use rsa_lab::keys::KeyPair;

/// Generates a key pair, wraps the message in <h1>...</h1>, and writes the
/// private key, public key and encrypted message files.
#[derive(Parser, Debug)]
#[command(name = "make-test")]
struct Args {
    /// Key size in bits
    #[arg(short = 'b', long = "bits", default_value_t = 32)]
    bits: u32,

    /// Message to encrypt
    message: String,

    /// Directory the key and ciphertext files are written into
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("Generating keys with {} bits", args.bits);
    let keys = KeyPair::generate(args.bits).context("key generation failed")?;

    let message = format!("<h1>{}</h1>", args.message);
    println!("Encrypting: ({message})");
    let encrypted =
        cipher::encrypt(message.as_bytes(), &keys.public()).context("encryption failed")?;
    println!("Encrypted: ({})", hex::encode(&encrypted));

    let cipher_path = args.out_dir.join(format!("encrypted-{}.dat", args.bits));
    fs::write(&cipher_path, &encrypted)
        .with_context(|| format!("writing {}", cipher_path.display()))?;

    let private_path = args.out_dir.join(format!("private-{}.txt", args.bits));
    keyfile::write_private(&keys, &private_path)
        .with_context(|| format!("writing {}", private_path.display()))?;

    let public_path = args.out_dir.join(format!("public-{}.txt", args.bits));
    keyfile::write_public(&keys.public(), &public_path)
        .with_context(|| format!("writing {}", public_path.display()))?;

    println!(
        "Wrote {}, {} and {} ({} ciphertext bytes)",
        private_path.display(),
        public_path.display(),
        cipher_path.display(),
        encrypted.len()
    );
    Ok(())
}
