use criterion::{criterion_group, criterion_main, Criterion};
use rand_core::SeedableRng;
use rand_xorshift::XorShiftRng;

use rns_ring::basis::BasisExtender;
use rns_ring::primes::generate_ntt_primes;
use rns_ring::ring::Ring;
use rns_ring::{new_uniform_sampler, Poly};

fn bench_basis_extend(c: &mut Criterion) {
    let n = 1usize << 13;
    // Distinct bit-lengths keep the two searches from landing on the same
    // primes (both start from `2^log_q` and step outward in the same
    // order, so sharing a bit-length risks Q and P overlapping).
    let q_moduli = generate_ntt_primes(54, 2 * n as u64, 4).expect("enough Q primes");
    let p_moduli = generate_ntt_primes(53, 2 * n as u64, 2).expect("enough P primes");
    let ring_q = Ring::new(n, &q_moduli).unwrap();
    let ring_p = Ring::new(n, &p_moduli).unwrap();
    let extender = BasisExtender::new(&ring_q, &ring_p).unwrap();

    let rng = XorShiftRng::seed_from_u64(123);
    let mut sampler = new_uniform_sampler(rng, &ring_q);
    let mut a = Poly::new(n, ring_q.level());
    sampler.read(&mut a).unwrap();
    let mut out = Poly::new(n, ring_p.level());

    let mut group = c.benchmark_group("basis_extend");
    group.bench_function("mod_up_q_to_p", |b| {
        b.iter(|| {
            extender.mod_up_q_to_p(&ring_q, &ring_p, &a, &mut out).unwrap();
        });
    });
    group.finish();
}

criterion_group!(benches, bench_basis_extend);
criterion_main!(benches);
