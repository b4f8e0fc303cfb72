//! Seed derivation for reproducible payload selection
//!
//! A single master seed (from the profile's `experiment.seed`) fans out into
//! independent per-component seeds via SHA-256, so the domain and IP draws
//! never share a random stream.
//!
//! # Example
//!
//! ```
//! use phloem_core::seed::{components, derive_seed};
//!
//! let domain_seed = derive_seed(42, components::DOMAIN_SELECTION);
//! let ip_seed = derive_seed(42, components::IP_SELECTION);
//!
//! assert_eq!(domain_seed, derive_seed(42, components::DOMAIN_SELECTION));
//! assert_ne!(domain_seed, ip_seed);
//! ```

use rand::rngs::SmallRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

/// Derive a component-specific seed from a master seed
///
/// Hashes the big-endian master seed followed by the component name and
/// takes the first 8 bytes of the digest.
pub fn derive_seed(master_seed: u64, component: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(master_seed.to_be_bytes());
    hasher.update(component.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Build an RNG for `component`, seeded from the master seed when one is set
/// and from OS entropy otherwise
pub fn component_rng(master_seed: Option<u64>, component: &str) -> SmallRng {
    match master_seed {
        Some(master) => SmallRng::seed_from_u64(derive_seed(master, component)),
        None => SmallRng::from_os_rng(),
    }
}

/// Standard component names for seed derivation
pub mod components {
    pub const DOMAIN_SELECTION: &str = "domain_selection";
    pub const IP_SELECTION: &str = "ip_selection";
    pub const RESPONDER_SCORES: &str = "responder_scores";
    pub const RESPONDER_DROPS: &str = "responder_drops";
}
