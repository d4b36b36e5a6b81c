/// Module dedicated to block-chunked RSA encryption and decryption
pub mod cipher;

/// Module dedicated to finding a nontrivial factor of a composite
/// integer with Pollard's rho
pub mod factor;

/// Module dedicated to reading and writing the text key files
pub mod keyfile;

/// Module dedicated to the generation of RSA key pairs and the
/// modular-arithmetic key utils
pub mod keys;

/// Module dedicated to the prime number generation and verification
pub mod prime;

/// Module dedicated to recovering a private exponent from a public key
/// and a ciphertext, racing a pool of workers
pub mod recover;
