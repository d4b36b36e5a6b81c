use criterion::{black_box, criterion_group, criterion_main, Criterion};
use num_bigint::BigUint;

use rsa_lab::factor::{find_factor, CancelToken};
use rsa_lab::prime::gen;

fn semiprime(bits: u64) -> BigUint {
    let p = gen::new_prime(bits / 2);
    let q = gen::new_prime(bits / 2);
    p * q
}

fn pollard_rho(c: &mut Criterion) {
    let sizes = [16, 24, 32];
    for size in sizes {
        let n = semiprime(size);
        let name = format!("find_factor({}-bit)", size);
        c.bench_function(&name, |b| {
            b.iter(|| {
                let token = CancelToken::new();
                find_factor(black_box(&n), &token)
            })
        });
    }
}

fn prime_gen(c: &mut Criterion) {
    let sizes = [16, 32, 64, 128];
    for size in sizes {
        let name = format!("prime::gen({})", size);
        c.bench_function(&name, |b| b.iter(|| gen::new_prime(black_box(size))));
    }
}

criterion_group!(benches, pollard_rho, prime_gen);
criterion_main!(benches);
