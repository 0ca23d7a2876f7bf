//! End-to-end seed scenarios exercising the public surface as a whole
//! (cross-module integration, as opposed to each module's own `#[cfg(test)]`
//! unit coverage).

use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

use rns_ring::basis::BasisExtender;
use rns_ring::{new_ternary_sampler, new_uniform_sampler, Distribution, Poly, Ring};

#[test]
fn scenario_1_ntt_round_trip_small() {
    let ring = Ring::new(16, &[97]).unwrap();
    let mut p = Poly::new(16, 0);
    for (i, c) in p.channel_mut(0).iter_mut().enumerate() {
        *c = i as u64;
    }
    let mut spectrum = Poly::new(16, 0);
    ring.ntt(&p, &mut spectrum).unwrap();
    let mut back = Poly::new(16, 0);
    ring.intt(&spectrum, &mut back).unwrap();
    assert!(p.equal(&back));
}

#[test]
fn scenario_2_scalar_add_and_reduce() {
    let ring = Ring::new(16, &[97]).unwrap();
    let mut p = Poly::new(16, 0);
    for c in p.channel_mut(0).iter_mut() {
        *c = 90;
    }
    let mut added = Poly::new(16, 0);
    ring.add_scalar(&p, &[20], &mut added).unwrap();
    let mut reduced = Poly::new(16, 0);
    ring.reduce(&added, &mut reduced).unwrap();
    for c in reduced.channel(0) {
        assert_eq!(*c, 13);
    }
}

#[test]
fn scenario_3_basis_extend() {
    // spec §8 scenario 3's own prime values are one 2-adic step short of
    // 1 mod 32, which a Standard ring of N=16 requires; these are the
    // nearest primes of the same 31-bit shape that satisfy it.
    let q0: u64 = 1073741857;
    let q1: u64 = 1073741953;
    let p0: u64 = 1073742113;
    let ring_q = Ring::new(16, &[q0, q1]).unwrap();
    let ring_p = Ring::new(16, &[p0]).unwrap();
    let extender = BasisExtender::new(&ring_q, &ring_p).unwrap();

    // value = 2*q0*q1 + 1
    let value: u128 = 2u128 * q0 as u128 * q1 as u128 + 1;
    let mut a = Poly::new(16, 1);
    for c in a.channel_mut(0).iter_mut() {
        *c = (value % q0 as u128) as u64;
    }
    for c in a.channel_mut(1).iter_mut() {
        *c = (value % q1 as u128) as u64;
    }

    let mut out = Poly::new(16, 0);
    extender.mod_up_q_to_p(&ring_q, &ring_p, &a, &mut out).unwrap();

    let expected = (value % p0 as u128) as u64;
    for c in out.channel(0) {
        assert_eq!(*c, expected);
    }
}

#[test]
fn scenario_4_galois_shift() {
    let ring = Ring::new(16, &[97]).unwrap();
    let mut p = Poly::new(16, 0);
    for (i, c) in p.channel_mut(0).iter_mut().enumerate() {
        *c = i as u64;
    }
    let mut out = Poly::new(16, 0);
    ring.permute(&p, 3, &mut out);

    for i in 0..16u64 {
        let prod = i * 3;
        let dst = (prod % 16) as usize;
        let wraps_odd = (prod / 16) % 2 == 1;
        let expect = if wraps_odd {
            if i == 0 {
                0
            } else {
                97 - i
            }
        } else {
            i
        };
        assert_eq!(out.channel(0)[dst], expect);
    }
}

#[test]
fn scenario_5_ternary_sparse() {
    let ring = Ring::new(1024, &[12289]).unwrap();
    let rng = ChaCha8Rng::seed_from_u64(2026);
    let (dist, warning) = Distribution::ternary_hamming_weight(128, ring.n());
    assert!(warning.is_none());
    let mut sampler = new_ternary_sampler(rng, &ring, dist, false).unwrap();
    let mut p = Poly::new(1024, 0);
    sampler.read(&mut p).unwrap();

    let nonzero_count = p.channel(0).iter().filter(|&&c| c != 0).count();
    assert_eq!(nonzero_count, 128);
    for &c in p.channel(0) {
        assert!(c == 0 || c == 1 || c == 12289 - 1);
    }
}

#[test]
fn scenario_6_mod_down_round_trip() {
    use num_bigint::BigUint;

    let ring_q = Ring::new(16, &[1073741857, 1073741953]).unwrap();
    let ring_p = Ring::new(16, &[1073742113]).unwrap();
    let extender = BasisExtender::new(&ring_q, &ring_p).unwrap();

    let rng = ChaCha8Rng::seed_from_u64(7);
    let mut sampler = new_uniform_sampler(rng, &ring_q);
    let mut original = Poly::new(16, ring_q.level());
    sampler.read(&mut original).unwrap();

    // Build x = original * P, a value divisible by P: its Q-channels are
    // `original` scaled by (P mod q_i); its P-channels are all zero, since
    // P | x (spec §8's mod-down invariant: "for all x with x ≡ 0 (mod P)").
    let p_product: BigUint = ring_p.modulus_chain().iter().map(|&q| BigUint::from(q)).product();
    let mut x_q = Poly::new(16, ring_q.level());
    ring_q.mul_scalar_bigint(&original, &p_product, &mut x_q).unwrap();
    let x_p = Poly::new(16, ring_p.level());

    let mut back = Poly::new(16, ring_q.level());
    extender.mod_down_qp_to_q(&ring_q, &ring_p, &x_q, &x_p, &mut back).unwrap();

    assert!(back.equal(&original), "mod-down of P*original should recover original exactly");
}

#[test]
fn scenario_7_serialize() {
    let ring = Ring::new(8192, &rns_ring::primes::generate_ntt_primes(20, 2 * 8192, 4).unwrap()).unwrap();
    let rng = ChaCha8Rng::seed_from_u64(55);
    let mut sampler = new_uniform_sampler(rng, &ring);
    let mut p = Poly::new(8192, ring.level());
    sampler.read(&mut p).unwrap();

    let bytes = p.marshal();
    let back = Poly::unmarshal(&bytes).unwrap();
    assert!(p.equal(&back));

    let mut truncated = bytes.clone();
    truncated.pop();
    assert!(Poly::unmarshal(&truncated).is_err());
}
