use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand_core::{RngCore, SeedableRng};
use rand_xorshift::XorShiftRng;

use rns_ring::primes::generate_ntt_primes;
use rns_ring::ring::Ring;
use rns_ring::{new_uniform_sampler, Poly};

fn bench_ntt(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt");
    // One prime valid for the largest nth_root also satisfies every smaller
    // nth_root in this benchmark, since each is a divisor of the largest.
    let moduli = generate_ntt_primes(55, 1 << 15, 1).expect("a 55-bit NTT-friendly prime exists");
    for log_n in [10u32, 12, 14] {
        let n = 1usize << log_n;
        let ring = Ring::new(n, &moduli).unwrap();
        let rng = XorShiftRng::seed_from_u64(log_n as u64);
        let mut sampler = new_uniform_sampler(rng, &ring);
        let mut p = Poly::new(n, 0);
        sampler.read(&mut p).unwrap();
        let mut spectrum = Poly::new(n, 0);

        group.bench_with_input(BenchmarkId::new("forward", n), &n, |b, _| {
            b.iter(|| {
                ring.ntt(&p, &mut spectrum).unwrap();
            });
        });

        let mut back = Poly::new(n, 0);
        group.bench_with_input(BenchmarkId::new("inverse", n), &n, |b, _| {
            b.iter(|| {
                ring.intt(&spectrum, &mut back).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_coefficient_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("coeff_kernels");
    let n = 1usize << 14;
    let moduli = generate_ntt_primes(55, 2 * n as u64, 1).expect("a 55-bit NTT-friendly prime exists");
    let ring = Ring::new(n, &moduli).unwrap();
    let mut rng = XorShiftRng::seed_from_u64(99);
    let mut a = Poly::new(n, 0);
    let mut b = Poly::new(n, 0);
    for slot in a.channel_mut(0).iter_mut().chain(b.channel_mut(0).iter_mut()) {
        *slot = rng.next_u64() % moduli[0];
    }
    let mut out = Poly::new(n, 0);

    group.bench_function("add", |bencher| {
        bencher.iter(|| ring.add(&a, &b, &mut out).unwrap());
    });
    group.bench_function("mul_coeffs_montgomery", |bencher| {
        bencher.iter(|| ring.mul_coeffs_montgomery(&a, &b, &mut out).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_ntt, bench_coefficient_kernels);
criterion_main!(benches);
