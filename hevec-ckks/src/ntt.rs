//! Number Theoretic Transform over NTT-friendly primes.
//!
//! Each prime q satisfies q ≡ 1 (mod 2N) so that a primitive 2N-th root of
//! unity ψ exists in Z_q. Multiplication in Z_q[X]/(X^N + 1) is then a
//! twisted NTT, a pointwise product and an inverse NTT: O(N log N) instead
//! of the O(N²) negacyclic convolution.
//!
//! # Primes
//!
//! Primes are not hard-coded: the modulus chain is derived from the
//! requested bit sizes at context creation (see [`find_ntt_primes`]).
//! Residues are stored as `u64` in `[0, q)`; products go through `u128`,
//! which supports primes up to 62 bits.

use crate::error::{CkksError, Result};

// ═══════════════════════════════════════════════════════════════════════
// Modular arithmetic helpers
// ═══════════════════════════════════════════════════════════════════════

#[inline]
pub fn mul_mod(a: u64, b: u64, q: u64) -> u64 {
    ((a as u128 * b as u128) % q as u128) as u64
}

#[inline]
pub fn add_mod(a: u64, b: u64, q: u64) -> u64 {
    let s = a + b;
    if s >= q {
        s - q
    } else {
        s
    }
}

#[inline]
pub fn sub_mod(a: u64, b: u64, q: u64) -> u64 {
    if a >= b {
        a - b
    } else {
        a + q - b
    }
}

/// Modular exponentiation: base^exp mod q.
pub fn pow_mod(base: u64, mut exp: u64, q: u64) -> u64 {
    let mut result = 1u64 % q;
    let mut b = base % q;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, b, q);
        }
        exp >>= 1;
        b = mul_mod(b, b, q);
    }
    result
}

/// Modular inverse via Fermat's little theorem. `q` must be prime and
/// `a` nonzero mod q.
pub fn inv_mod(a: u64, q: u64) -> u64 {
    pow_mod(a, q - 2, q)
}

/// Reduce a signed integer into `[0, q)`.
#[inline]
pub fn reduce_signed(v: i128, q: u64) -> u64 {
    v.rem_euclid(q as i128) as u64
}

/// Lift a residue in `[0, q)` to the centered range `(-q/2, q/2]`.
#[inline]
pub fn center(v: u64, q: u64) -> i64 {
    if v > q / 2 {
        v as i64 - q as i64
    } else {
        v as i64
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Prime generation
// ═══════════════════════════════════════════════════════════════════════

/// Deterministic Miller-Rabin for all 64-bit inputs.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    const BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    for &p in &BASES {
        if n % p == 0 {
            return n == p;
        }
    }

    let mut d = n - 1;
    let mut r = 0;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }

    'witness: for &a in &BASES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Find one NTT-friendly prime per requested bit size.
///
/// For each size b (in order) the largest unused prime q < 2^b with
/// q ≡ 1 (mod 2N) is selected. Sizes may repeat; repeated sizes yield
/// successively smaller distinct primes of the same width.
pub fn find_ntt_primes(degree: usize, bit_sizes: &[u32]) -> Result<Vec<u64>> {
    let two_n = 2 * degree as u64;
    let mut primes: Vec<u64> = Vec::with_capacity(bit_sizes.len());

    for &bits in bit_sizes {
        let upper = 1u64 << bits;
        let lower = 1u64 << (bits - 1);
        let mut candidate = (upper - 1) / two_n * two_n + 1;
        let found = loop {
            if candidate <= lower {
                break None;
            }
            if is_prime(candidate) && !primes.contains(&candidate) {
                break Some(candidate);
            }
            candidate -= two_n;
        };
        match found {
            Some(q) => primes.push(q),
            None => {
                return Err(CkksError::Configuration(format!(
                    "no {bits}-bit prime congruent to 1 mod {two_n} left"
                )))
            }
        }
    }

    Ok(primes)
}

/// Find a primitive 2N-th root of unity modulo q.
///
/// Since q ≡ 1 (mod 2N), ψ = g^((q-1)/2N) is a 2N-th root for any g; it is
/// primitive exactly when ψ^N ≡ -1.
pub fn find_primitive_root(q: u64, degree: usize) -> Result<u64> {
    let exp = (q - 1) / (2 * degree as u64);
    for g in 2..q.min(10_000) {
        let psi = pow_mod(g, exp, q);
        if pow_mod(psi, degree as u64, q) == q - 1 {
            return Ok(psi);
        }
    }
    Err(CkksError::Configuration(format!(
        "no primitive {}-th root of unity modulo {q}",
        2 * degree
    )))
}

// ═══════════════════════════════════════════════════════════════════════
// NTT tables
// ═══════════════════════════════════════════════════════════════════════

/// Precomputed NTT tables for one prime and one ring degree.
#[derive(Clone, Debug)]
pub struct NttTable {
    /// The NTT-friendly prime.
    pub q: u64,
    /// Ring degree N.
    pub degree: usize,
    /// Inverse of N mod q.
    n_inv: u64,
    /// ψ^i for the negacyclic twist.
    psi_powers: Vec<u64>,
    /// ψ^(-i) for the inverse twist.
    psi_inv_powers: Vec<u64>,
    /// Per butterfly stage: ω = ψ^(2N/len).
    stage_roots: Vec<u64>,
    stage_roots_inv: Vec<u64>,
}

impl NttTable {
    pub fn new(q: u64, degree: usize) -> Result<Self> {
        let psi = find_primitive_root(q, degree)?;
        let psi_inv = inv_mod(psi, q);
        let n_inv = inv_mod(degree as u64 % q, q);

        let mut stage_roots = Vec::new();
        let mut stage_roots_inv = Vec::new();
        let mut len = 2;
        while len <= degree {
            let exp = (2 * degree / len) as u64;
            stage_roots.push(pow_mod(psi, exp, q));
            stage_roots_inv.push(pow_mod(psi_inv, exp, q));
            len <<= 1;
        }

        Ok(Self {
            q,
            degree,
            n_inv,
            psi_powers: powers(psi, q, degree),
            psi_inv_powers: powers(psi_inv, q, degree),
            stage_roots,
            stage_roots_inv,
        })
    }

    /// Forward negacyclic NTT: coefficients in `[0, q)` → evaluations.
    pub fn forward(&self, a: &[u64]) -> Vec<u64> {
        debug_assert_eq!(a.len(), self.degree);
        let q = self.q;
        let mut data: Vec<u64> = a
            .iter()
            .zip(&self.psi_powers)
            .map(|(&c, &pw)| mul_mod(c, pw, q))
            .collect();
        self.butterflies(&mut data, &self.stage_roots);
        data
    }

    /// Inverse negacyclic NTT: evaluations → coefficients in `[0, q)`.
    pub fn inverse(&self, a: &[u64]) -> Vec<u64> {
        debug_assert_eq!(a.len(), self.degree);
        let q = self.q;
        let mut data = a.to_vec();
        self.butterflies(&mut data, &self.stage_roots_inv);
        for (v, &pw) in data.iter_mut().zip(&self.psi_inv_powers) {
            *v = mul_mod(mul_mod(*v, self.n_inv, q), pw, q);
        }
        data
    }

    /// Multiply two polynomials in Z_q[X]/(X^N + 1).
    pub fn mul(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        let a_ntt = self.forward(a);
        let b_ntt = self.forward(b);
        let prod: Vec<u64> = a_ntt
            .iter()
            .zip(&b_ntt)
            .map(|(&x, &y)| mul_mod(x, y, self.q))
            .collect();
        self.inverse(&prod)
    }

    /// In-place iterative Cooley-Tukey radix-2 transform.
    fn butterflies(&self, data: &mut [u64], roots: &[u64]) {
        let q = self.q;
        let n = data.len();
        bit_reverse_permutation(data);

        let mut len = 2;
        let mut stage = 0;
        while len <= n {
            let half = len / 2;
            let w = roots[stage];
            let mut start = 0;
            while start < n {
                let mut wk = 1u64;
                for k in 0..half {
                    let u = data[start + k];
                    let v = mul_mod(data[start + k + half], wk, q);
                    data[start + k] = add_mod(u, v, q);
                    data[start + k + half] = sub_mod(u, v, q);
                    wk = mul_mod(wk, w, q);
                }
                start += len;
            }
            len <<= 1;
            stage += 1;
        }
    }
}

fn powers(root: u64, q: u64, n: usize) -> Vec<u64> {
    let mut out = Vec::with_capacity(n);
    let mut acc = 1u64;
    for _ in 0..n {
        out.push(acc);
        acc = mul_mod(acc, root, q);
    }
    out
}

fn bit_reverse_permutation(data: &mut [u64]) {
    let n = data.len();
    let bits = n.trailing_zeros();
    if bits == 0 {
        return;
    }
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if i < j {
            data.swap(i, j);
        }
    }
}
