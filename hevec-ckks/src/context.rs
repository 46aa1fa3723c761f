//! Evaluation contexts and their two capability views.
//!
//! [`PublicContext`] holds everything a computing party needs: parameters,
//! NTT tables, the public key and the evaluation keys. It can encrypt and
//! combine ciphertexts but has no way to decrypt.
//!
//! [`PrivateContext`] wraps a public context together with the secret key.
//! It is the only type that can decrypt or generate evaluation keys, and
//! there is no constructor that builds one from public material.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ciphertext::Ciphertext;
use crate::error::{CkksError, Result};
use crate::keys::{GaloisKey, GaloisKeys, KeySwitchKey, PublicKey, SecretKey};
use crate::ntt::NttTable;
use crate::params::CkksParams;
use crate::simd::{galois_element, SlotEncoder};

const BLOB_VERSION: u16 = 1;

/// Which view a serialized context blob holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextKind {
    Public,
    Private,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKind::Public => f.write_str("public"),
            ContextKind::Private => f.write_str("private"),
        }
    }
}

/// SHA-256 digest over the parameters and the public key.
///
/// The public and private view of one key set share the same id; every
/// ciphertext carries the id of the context that produced it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub [u8; 32]);

impl ContextId {
    fn compute(params: &CkksParams, moduli: &[u64], pk: &PublicKey) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"hevec_context_id_v1");
        hasher.update((params.poly_modulus_degree as u64).to_le_bytes());
        hasher.update(params.global_scale.to_bits().to_le_bytes());
        for q in moduli {
            hasher.update(q.to_le_bytes());
        }
        for residue in pk.b.residues.iter().chain(&pk.a.residues) {
            for c in residue {
                hasher.update(c.to_le_bytes());
            }
        }
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", &self.to_string()[..16])
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct EvaluationKeys {
    pub(crate) public_key: PublicKey,
    pub(crate) relin_key: Option<KeySwitchKey>,
    pub(crate) galois_keys: GaloisKeys,
}

#[derive(Serialize)]
struct ContextBlobRef<'a> {
    version: u16,
    kind: ContextKind,
    params: &'a CkksParams,
    keys: &'a EvaluationKeys,
    secret: Option<&'a SecretKey>,
}

#[derive(Deserialize)]
struct ContextBlob {
    version: u16,
    kind: ContextKind,
    params: CkksParams,
    keys: EvaluationKeys,
    secret: Option<SecretKey>,
}

impl ContextBlob {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let blob: ContextBlob = bincode::deserialize(bytes)?;
        if blob.version != BLOB_VERSION {
            return Err(CkksError::Malformed(format!(
                "unsupported context blob version {}",
                blob.version
            )));
        }
        Ok(blob)
    }
}

/// Encrypt-and-evaluate view of a CKKS context.
#[derive(Clone)]
pub struct PublicContext {
    pub(crate) params: CkksParams,
    /// NTT tables for [q_0, .., q_L, P].
    pub(crate) tables: Vec<NttTable>,
    pub(crate) encoder: SlotEncoder,
    pub(crate) keys: EvaluationKeys,
    pub(crate) id: ContextId,
}

impl fmt::Debug for PublicContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicContext")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("relin_key", &self.keys.relin_key.is_some())
            .field("galois_steps", &self.keys.galois_keys.steps().collect::<Vec<_>>())
            .finish()
    }
}

impl PublicContext {
    fn assemble(params: CkksParams, keys: EvaluationKeys) -> Result<Self> {
        let moduli = params.generate_moduli()?;
        let degree = params.poly_modulus_degree;
        let tables = moduli
            .iter()
            .map(|&q| NttTable::new(q, degree))
            .collect::<Result<Vec<_>>>()?;

        let data = params.data_prime_count();
        let pk = &keys.public_key;
        let pk_ok = [&pk.b, &pk.a]
            .iter()
            .all(|p| p.channels() == data && p.residues.iter().all(|r| r.len() == degree));
        let relin_ok = keys
            .relin_key
            .as_ref()
            .map_or(true, |k| k.is_well_formed(data, degree));
        let galois_ok = keys.galois_keys.keys.iter().all(|(&steps, gk)| {
            gk.galois_element == galois_element(steps, degree) && gk.key.is_well_formed(data, degree)
        });
        if !(pk_ok && relin_ok && galois_ok) {
            return Err(CkksError::Malformed(
                "key material does not match the context parameters".into(),
            ));
        }

        let id = ContextId::compute(&params, &moduli, pk);
        Ok(Self {
            encoder: SlotEncoder::new(degree),
            params,
            tables,
            keys,
            id,
        })
    }

    pub fn params(&self) -> &CkksParams {
        &self.params
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn slot_count(&self) -> usize {
        self.params.slot_count()
    }

    /// Concrete moduli [q_0, .., q_L, P].
    pub fn moduli(&self) -> Vec<u64> {
        self.tables.iter().map(|t| t.q).collect()
    }

    pub fn has_relin_key(&self) -> bool {
        self.keys.relin_key.is_some()
    }

    /// Rotation step counts for which a Galois key is present.
    pub fn galois_steps(&self) -> Vec<usize> {
        self.keys.galois_keys.steps().collect()
    }

    /// Tables for the first `k` data primes.
    pub(crate) fn data_basis(&self, k: usize) -> Vec<&NttTable> {
        self.tables[..k].iter().collect()
    }

    /// Tables for the first `k` data primes followed by P.
    pub(crate) fn ks_basis(&self, k: usize) -> Vec<&NttTable> {
        let mut basis = self.data_basis(k);
        if let Some(p) = self.tables.last() {
            basis.push(p);
        }
        basis
    }

    pub(crate) fn full_basis(&self) -> Vec<&NttTable> {
        self.tables.iter().collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&ContextBlobRef {
            version: BLOB_VERSION,
            kind: ContextKind::Public,
            params: &self.params,
            keys: &self.keys,
            secret: None,
        })?)
    }

    /// Load a public context. A private blob is refused: the computing
    /// party must never hold the secret key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let blob = ContextBlob::decode(bytes)?;
        if blob.kind != ContextKind::Public {
            return Err(CkksError::ContextKind {
                expected: ContextKind::Public,
                found: blob.kind,
            });
        }
        Self::assemble(blob.params, blob.keys)
    }

    /// Deserialize a ciphertext and check it belongs to this context.
    pub fn ciphertext_from_bytes(&self, bytes: &[u8]) -> Result<Ciphertext> {
        let ct: Ciphertext = bincode::deserialize(bytes)?;
        ct.validate(self)?;
        Ok(ct)
    }
}

/// Full-capability view: a public context plus the secret key.
pub struct PrivateContext {
    public: PublicContext,
    pub(crate) secret: SecretKey,
}

impl fmt::Debug for PrivateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateContext")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl PrivateContext {
    /// Validate `params`, derive the modulus chain and generate a fresh
    /// secret and public key. Evaluation keys are generated separately.
    pub fn new<R: Rng + ?Sized>(params: CkksParams, rng: &mut R) -> Result<Self> {
        let moduli = params.generate_moduli()?;
        let degree = params.poly_modulus_degree;
        let data = params.data_prime_count();
        let tables = moduli
            .iter()
            .map(|&q| NttTable::new(q, degree))
            .collect::<Result<Vec<_>>>()?;

        let secret = SecretKey::generate(rng, degree);
        let public_key = {
            let basis: Vec<&NttTable> = tables[..data].iter().collect();
            PublicKey::generate(&secret, rng, &basis)
        };
        let id = ContextId::compute(&params, &moduli, &public_key);

        Ok(Self {
            public: PublicContext {
                encoder: SlotEncoder::new(degree),
                params,
                tables,
                keys: EvaluationKeys {
                    public_key,
                    relin_key: None,
                    galois_keys: GaloisKeys::default(),
                },
                id,
            },
            secret,
        })
    }

    /// The public view, borrowed.
    pub fn public(&self) -> &PublicContext {
        &self.public
    }

    /// A copy of the public view without the secret key.
    pub fn to_public(&self) -> PublicContext {
        self.public.clone()
    }

    /// Consume the private context, dropping the secret key.
    pub fn make_public(self) -> PublicContext {
        let PrivateContext { public, secret } = self;
        drop(secret);
        public
    }

    pub fn id(&self) -> ContextId {
        self.public.id
    }

    /// Generate the key that switches s² back to s after multiplication.
    pub fn generate_relin_keys<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let basis = self.public.full_basis();
        let s = self.secret.poly(&basis);
        let s_squared = s.mul(&s, &basis);
        let key = KeySwitchKey::generate(&self.secret, &s_squared, rng, &basis);
        self.public.keys.relin_key = Some(key);
    }

    /// Generate rotation keys for every power of two below the slot count.
    pub fn generate_galois_keys<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let slots = self.public.slot_count();
        let steps: Vec<usize> = std::iter::successors(Some(1usize), |s| Some(s * 2))
            .take_while(|&s| s < slots)
            .collect();
        self.generate_galois_keys_for(&steps, rng);
    }

    /// Generate rotation keys for the given left-rotation step counts.
    pub fn generate_galois_keys_for<R: Rng + ?Sized>(&mut self, steps: &[usize], rng: &mut R) {
        let degree = self.public.params.poly_modulus_degree;
        let slots = self.public.slot_count();
        let basis = self.public.full_basis();
        let s = self.secret.poly(&basis);

        let mut fresh = Vec::new();
        for &step in steps {
            let step = step % slots;
            if step == 0 {
                continue;
            }
            let g = galois_element(step, degree);
            let target = s.automorphism(g, &basis);
            let key = KeySwitchKey::generate(&self.secret, &target, rng, &basis);
            fresh.push((
                step,
                GaloisKey {
                    galois_element: g,
                    key,
                },
            ));
        }
        self.public.keys.galois_keys.keys.extend(fresh);
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&ContextBlobRef {
            version: BLOB_VERSION,
            kind: ContextKind::Private,
            params: &self.public.params,
            keys: &self.public.keys,
            secret: Some(&self.secret),
        })?)
    }

    /// Load a private context. A public blob fails with
    /// [`CkksError::MissingSecretKey`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let blob = ContextBlob::decode(bytes)?;
        let secret = match (blob.kind, blob.secret) {
            (ContextKind::Private, Some(secret)) => secret,
            _ => return Err(CkksError::MissingSecretKey),
        };
        if secret.degree() != blob.params.poly_modulus_degree {
            return Err(CkksError::Malformed(
                "secret key degree does not match the context parameters".into(),
            ));
        }
        let public = PublicContext::assemble(blob.params, blob.keys)?;
        Ok(Self { public, secret })
    }
}
