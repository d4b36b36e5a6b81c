use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use rsa_lab::cipher;
use rsa_lab::keyfile;
use rsa_lab::recover::{self, RecoveryConfig, Strategy};

/// Attacks an RSA public key: recovers the private exponent from the
/// public key file and a ciphertext, then prints the decrypted message.
#[derive(Parser, Debug)]
#[command(name = "find-key")]
struct Args {
    /// Public key file
    public_key: PathBuf,

    /// Encrypted message file
    ciphertext: PathBuf,

    /// Number of racing workers
    #[arg(short = 'w', long = "workers", default_value_t = 4)]
    workers: usize,

    /// Recovery strategy
    #[arg(short = 's', long = "strategy", value_enum, default_value = "factorize")]
    strategy: StrategyArg,

    /// Known plaintext prefix the brute-force search matches against
    #[arg(short = 'm', long = "marker", default_value = "<h1>")]
    marker: String,

    /// Give up after this many seconds
    #[arg(short = 't', long = "timeout")]
    timeout_secs: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StrategyArg {
    /// Factor the modulus with racing Pollard's rho workers
    Factorize,
    /// Brute-force the private exponent against the marker
    BruteForce,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Factorize => Strategy::Factorize,
            StrategyArg::BruteForce => Strategy::BruteForce,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let public = keyfile::read_public(&args.public_key)
        .with_context(|| format!("reading {}", args.public_key.display()))?;
    let encrypted = fs::read(&args.ciphertext)
        .with_context(|| format!("reading {}", args.ciphertext.display()))?;
    println!("Read {} ciphertext bytes", encrypted.len());

    let config = RecoveryConfig {
        workers: args.workers,
        strategy: args.strategy.into(),
        deadline: args.timeout_secs.map(Duration::from_secs),
    };

    let started = Instant::now();
    let private =
        recover::recover_private_key(&public, &encrypted, args.marker.as_bytes(), &config)
            .context("key recovery failed")?;
    println!("Recovered d: {}", private.d.to_str_radix(16));

    let clear = cipher::decrypt(&encrypted, &private).context("decryption failed")?;
    let text = String::from_utf8_lossy(&clear);
    println!("Message: {}", text.trim_end_matches('\0'));
    println!("Took {:?}", started.elapsed());
    Ok(())
}
