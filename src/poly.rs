//! Polynomial container and scratch-buffer pool (spec §4.7, §6, component
//! C8).

use std::sync::{Arc, Mutex};

use crate::error::{EncodingError, ShapeError};

/// A degree-`< n` polynomial in RNS: `level + 1` channels, each `n`
/// residues mod the chain's `q_0, ..., q_level`, backed by one contiguous
/// buffer (spec §3 `Poly` invariants). `Poly` carries no domain flag — the
/// caller tracks whether it holds coefficient-domain, NTT-domain, or
/// Montgomery-form values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Poly {
    n: usize,
    level: usize,
    buf: Vec<u64>,
}

impl Poly {
    /// Allocate a zero-filled polynomial with `level+1` channels of `n`
    /// residues each.
    pub fn new(n: usize, level: usize) -> Self {
        Poly {
            n,
            level,
            buf: vec![0u64; n * (level + 1)],
        }
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.level + 1
    }

    #[inline]
    pub fn buffer(&self) -> &[u64] {
        &self.buf
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut [u64] {
        &mut self.buf
    }

    #[inline]
    pub fn channel(&self, ch: usize) -> &[u64] {
        &self.buf[ch * self.n..(ch + 1) * self.n]
    }

    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [u64] {
        &mut self.buf[ch * self.n..(ch + 1) * self.n]
    }

    /// Grow or shrink the channel count. Growing zero-fills the new
    /// channels; shrinking drops channels logically (capacity may be
    /// retained, matching spec §3).
    pub fn resize(&mut self, new_level: usize) {
        let new_len = self.n * (new_level + 1);
        if new_level > self.level {
            self.buf.resize(new_len, 0);
        } else {
            self.buf.truncate(new_len);
        }
        self.level = new_level;
    }

    pub fn zero(&mut self) {
        self.buf.iter_mut().for_each(|x| *x = 0);
    }

    pub fn copy(&mut self, src: &Poly) -> Result<(), ShapeError> {
        if src.n != self.n {
            return Err(ShapeError::DegreeMismatch {
                expected: self.n,
                found: src.n,
            });
        }
        self.level = src.level;
        self.buf.clear();
        self.buf.extend_from_slice(&src.buf);
        Ok(())
    }

    /// Copy values channel-by-channel without changing `self`'s level;
    /// copies `min(self.level, src.level) + 1` channels.
    pub fn copy_values(&mut self, src: &Poly) {
        let channels = self.channel_count().min(src.channel_count());
        let n = self.n.min(src.n);
        for ch in 0..channels {
            self.buf[ch * self.n..ch * self.n + n].copy_from_slice(&src.buf[ch * src.n..ch * src.n + n]);
        }
    }

    pub fn equal(&self, other: &Poly) -> bool {
        self.n == other.n && self.level == other.level && self.buf == other.buf
    }

    /// Bit-exact binary serialization (spec §6): 8-byte `n` (i64 LE),
    /// 8-byte `level` (i64 LE), then `n*(level+1)` little-endian `u64`s.
    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + 8 * self.buf.len());
        out.extend_from_slice(&(self.n as i64).to_le_bytes());
        out.extend_from_slice(&(self.level as i64).to_le_bytes());
        for x in &self.buf {
            out.extend_from_slice(&x.to_le_bytes());
        }
        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() < 16 {
            return Err(EncodingError::HeaderTruncated {
                expected: 16,
                found: bytes.len(),
            });
        }
        let n = i64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let level = i64::from_le_bytes(bytes[8..16].try_into().unwrap());
        if n <= 0 {
            return Err(EncodingError::InvalidHeader(format!("n must be > 0, got {n}")));
        }
        if level < 0 {
            return Err(EncodingError::InvalidHeader(format!("level must be >= 0, got {level}")));
        }
        let n = n as usize;
        let level = level as usize;
        let expected_body = n * (level + 1) * 8;
        let found_body = bytes.len() - 16;
        if found_body != expected_body {
            return Err(EncodingError::BodyLengthMismatch {
                expected: expected_body,
                found: found_body,
            });
        }
        let mut buf = Vec::with_capacity(n * (level + 1));
        for chunk in bytes[16..].chunks_exact(8) {
            buf.push(u64::from_le_bytes(chunk.try_into().unwrap()));
        }
        Ok(Poly { n, level, buf })
    }
}

/// A fixed polynomial shape (`n`, `level`) a [`Pool`] recycles buffers for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PolyShape {
    pub n: usize,
    pub level: usize,
}

/// A thread-safe free-list of zero-initialized [`Poly`] buffers of one
/// fixed shape (spec §4.7). `acquire`/`release` are the only operations;
/// internal locking makes buffer identity safe to move across threads.
pub struct Pool {
    shape: PolyShape,
    free: Arc<Mutex<Vec<Poly>>>,
}

impl Pool {
    pub fn new(shape: PolyShape) -> Self {
        Pool {
            shape,
            free: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn shape(&self) -> PolyShape {
        self.shape
    }

    /// Take a zero-filled buffer of this pool's shape, reusing a released
    /// one if available.
    pub fn acquire(&self) -> Poly {
        let mut free = self.free.lock().expect("pool mutex poisoned");
        match free.pop() {
            Some(mut p) => {
                p.zero();
                p
            }
            None => Poly::new(self.shape.n, self.shape.level),
        }
    }

    /// Return a buffer to the pool. Panics (a caller bug, not a runtime
    /// error) if the buffer's shape does not match the pool's.
    pub fn release(&self, poly: Poly) {
        assert_eq!(poly.n(), self.shape.n, "pool shape mismatch on release");
        assert_eq!(poly.level(), self.shape.level, "pool shape mismatch on release");
        self.free.lock().expect("pool mutex poisoned").push(poly);
    }

    pub fn len(&self) -> usize {
        self.free.lock().expect("pool mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for Pool {
    fn clone(&self) -> Self {
        Pool {
            shape: self.shape,
            free: Arc::clone(&self.free),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_up_zero_fills_new_channels() {
        let mut p = Poly::new(8, 0);
        p.channel_mut(0).iter_mut().for_each(|x| *x = 5);
        p.resize(1);
        assert_eq!(p.channel(0), [5u64; 8]);
        assert_eq!(p.channel(1), [0u64; 8]);
    }

    #[test]
    fn resize_up_then_down_restores_equality() {
        let mut p = Poly::new(8, 0);
        p.channel_mut(0).iter_mut().enumerate().for_each(|(i, x)| *x = i as u64);
        let original = p.clone();
        p.resize(2);
        p.resize(0);
        assert!(p.equal(&original));
    }

    #[test]
    fn marshal_round_trip() {
        let mut p = Poly::new(8, 1);
        for (i, x) in p.buffer_mut().iter_mut().enumerate() {
            *x = i as u64 * 3 + 1;
        }
        let bytes = p.marshal();
        let back = Poly::unmarshal(&bytes).unwrap();
        assert!(p.equal(&back));
    }

    #[test]
    fn unmarshal_rejects_truncated_buffer() {
        let p = Poly::new(8, 0);
        let mut bytes = p.marshal();
        bytes.pop();
        assert!(Poly::unmarshal(&bytes).is_err());
    }

    #[test]
    fn pool_round_trips_buffer() {
        let pool = Pool::new(PolyShape { n: 16, level: 0 });
        let mut p = pool.acquire();
        p.channel_mut(0)[0] = 42;
        pool.release(p);
        assert_eq!(pool.len(), 1);
        let p2 = pool.acquire();
        assert_eq!(p2.channel(0)[0], 0, "acquired buffer must be zeroed");
        assert_eq!(pool.len(), 0);
    }
}
