//! CKKS SIMD slot packing via the canonical embedding.
//!
//! Encodes N/2 real values into one polynomial using the isomorphism
//! R[X]/(X^N+1) ≅ C^{N/2}. Polynomial add/multiply then becomes
//! element-wise add/multiply across all slots at once.
//!
//! # Encoding pipeline
//!
//! 1. Place slot values at Galois-aligned positions of a conjugate-symmetric
//!    C^N vector
//! 2. Inverse FFT → twisted coefficients
//! 3. Untwist by ψ^{-j} → polynomial coefficients
//! 4. Scale and round to integers
//!
//! Decoding runs the same steps backwards.

use std::f64::consts::PI;

use crate::error::{CkksError, Result};

/// 5 generates the slot-rotation subgroup of (Z/2N)*.
pub const GALOIS_GEN: u64 = 5;

#[derive(Clone, Copy, Debug)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    const ZERO: Self = Self { re: 0.0, im: 0.0 };

    fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    fn add(self, other: Self) -> Self {
        Self::new(self.re + other.re, self.im + other.im)
    }

    fn sub(self, other: Self) -> Self {
        Self::new(self.re - other.re, self.im - other.im)
    }

    fn mul(self, other: Self) -> Self {
        Self::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    fn conj(self) -> Self {
        Self::new(self.re, -self.im)
    }

    fn scale(self, s: f64) -> Self {
        Self::new(self.re * s, self.im * s)
    }
}

/// In-place radix-2 FFT: Z_k = Σ_j X_j · e^{2πijk/n}.
fn fft(a: &mut [Complex]) {
    let n = a.len();
    if n <= 1 {
        return;
    }

    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            a.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let w_base = Complex::from_angle(2.0 * PI / len as f64);
        let mut start = 0;
        while start < n {
            let mut w = Complex::new(1.0, 0.0);
            for k in 0..half {
                let u = a[start + k];
                let t = a[start + k + half].mul(w);
                a[start + k] = u.add(t);
                a[start + k + half] = u.sub(t);
                w = w.mul(w_base);
            }
            start += len;
        }
        len <<= 1;
    }
}

fn ifft(a: &mut [Complex]) {
    for x in a.iter_mut() {
        *x = x.conj();
    }
    fft(a);
    let inv_n = 1.0 / a.len() as f64;
    for x in a.iter_mut() {
        *x = x.conj().scale(inv_n);
    }
}

/// Slot encoder for one ring degree. Built once per context.
#[derive(Clone, Debug)]
pub struct SlotEncoder {
    degree: usize,
    /// Slot i sits at FFT position (5^i mod 2N − 1)/2.
    slot_to_fft: Vec<usize>,
    /// ψ^j with ψ = e^{iπ/N}.
    twist: Vec<Complex>,
}

impl SlotEncoder {
    pub fn new(degree: usize) -> Self {
        let two_n = 2 * degree as u64;
        let slots = degree / 2;

        let mut slot_to_fft = Vec::with_capacity(slots);
        let mut root_idx = 1u64;
        for _ in 0..slots {
            slot_to_fft.push(((root_idx - 1) / 2) as usize);
            root_idx = root_idx * GALOIS_GEN % two_n;
        }

        let psi_angle = PI / degree as f64;
        let twist = (0..degree)
            .map(|j| Complex::from_angle(j as f64 * psi_angle))
            .collect();

        Self {
            degree,
            slot_to_fft,
            twist,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.degree / 2
    }

    /// Encode up to N/2 real values into N integer coefficients at `scale`.
    /// Unused slots are zero.
    pub fn encode(&self, values: &[f64], scale: f64) -> Result<Vec<i64>> {
        let n = self.degree;
        if values.len() > self.slot_count() {
            return Err(CkksError::TooManyValues {
                count: values.len(),
                slots: self.slot_count(),
            });
        }
        if let Some(&bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(CkksError::ValueOutOfRange { value: bad, scale });
        }

        let mut z = vec![Complex::ZERO; n];
        for (&v, &pos) in values.iter().zip(&self.slot_to_fft) {
            z[pos] = Complex::new(v, 0.0);
            z[n - 1 - pos] = Complex::new(v, 0.0);
        }

        ifft(&mut z);

        Ok(z
            .iter()
            .zip(&self.twist)
            .map(|(c, t)| (c.mul(t.conj()).re * scale).round() as i64)
            .collect())
    }

    /// Decode the first `count` slots from centered coefficients.
    pub fn decode(&self, coeffs: &[i64], scale: f64, count: usize) -> Vec<f64> {
        let real: Vec<f64> = coeffs.iter().map(|&c| c as f64).collect();
        self.decode_real(&real, scale, count)
    }

    /// Like [`decode`](Self::decode) for coefficients lifted past the i64 range.
    pub fn decode_real(&self, coeffs: &[f64], scale: f64, count: usize) -> Vec<f64> {
        let mut b: Vec<Complex> = coeffs
            .iter()
            .zip(&self.twist)
            .map(|(&c, t)| t.scale(c / scale))
            .collect();
        b.resize(self.degree, Complex::ZERO);

        fft(&mut b);

        self.slot_to_fft
            .iter()
            .take(count.min(self.slot_count()))
            .map(|&pos| b[pos].re)
            .collect()
    }
}

/// Galois element 5^r mod 2N for a left rotation by `steps` slots.
pub fn galois_element(steps: usize, degree: usize) -> usize {
    let two_n = 2 * degree as u64;
    let mut g = 1u64;
    for _ in 0..steps % (degree / 2) {
        g = g * GALOIS_GEN % two_n;
    }
    g as usize
}
