//! Request payload generation
//!
//! Domains and IPs are each drawn uniformly at random, independently and with
//! replacement, from the pools supplied by the list provider. Ids are
//! assigned sequentially starting at 1.

use crate::request::Request;
use crate::seed::{component_rng, components};
use crate::{Error, Result};
use rand::rngs::SmallRng;
use rand::Rng;
use std::sync::Arc;

/// Payload material for synthetic requests
#[derive(Debug, Clone)]
pub struct PayloadPool {
    domains: Arc<[String]>,
    ips: Arc<[String]>,
}

impl PayloadPool {
    /// Create a pool; both sequences must be non-empty
    pub fn new(domains: Vec<String>, ips: Vec<String>) -> Result<Self> {
        if domains.is_empty() {
            return Err(Error::Config("domain list is empty".to_string()));
        }
        if ips.is_empty() {
            return Err(Error::Config("IP list is empty".to_string()));
        }
        Ok(Self { domains: domains.into(), ips: ips.into() })
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn ips(&self) -> &[String] {
        &self.ips
    }
}

/// Generates requests with sequential ids and randomly drawn payloads
pub struct RequestGenerator {
    pool: PayloadPool,
    domain_rng: SmallRng,
    ip_rng: SmallRng,
    next_id: u32,
}

impl RequestGenerator {
    /// Create a generator; `seed` makes the payload sequence reproducible
    pub fn new(pool: PayloadPool, seed: Option<u64>) -> Self {
        Self {
            pool,
            domain_rng: component_rng(seed, components::DOMAIN_SELECTION),
            ip_rng: component_rng(seed, components::IP_SELECTION),
            next_id: 1,
        }
    }

    /// Id the next generated request will carry
    pub fn peek_id(&self) -> u32 {
        self.next_id
    }

    /// Generate the next request
    ///
    /// Fails once the 32-bit id space is exhausted.
    pub fn next_request(&mut self) -> Result<Request> {
        let id = self.next_id;
        if id == 0 {
            return Err(Error::Other("request id space exhausted".to_string()));
        }
        self.next_id = id.wrapping_add(1);

        let domain = &self.pool.domains[self.domain_rng.random_range(0..self.pool.domains.len())];
        let ip = &self.pool.ips[self.ip_rng.random_range(0..self.pool.ips.len())];
        Ok(Request::new(id, domain.clone(), ip.clone()))
    }
}
