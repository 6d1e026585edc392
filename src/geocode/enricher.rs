use tracing::{debug, warn};
use ureq::{Agent, AgentBuilder};

use super::{
    limiter::{RateLimiter, SystemClock},
    nominatim::Nominatim,
    photon::Photon,
};
use crate::{
    config::GeocoderConfig,
    error::ProviderError,
    model::{Candidate, GeocodeResult, Service},
};

/// A geocoding service that turns a free-text address into its top-ranked
/// match, if it has one.
pub trait Provider {
    fn service(&self) -> Service;
    fn resolve(&self, address: &str) -> Result<Option<Candidate>, ProviderError>;
}

/// Resolves addresses against an ordered list of providers, trying each in
/// turn until one matches. Every provider call goes through the rate limiter.
pub struct Enricher {
    providers: Vec<Box<dyn Provider>>,
    limiter: RateLimiter,
}

impl Enricher {
    pub fn new(providers: Vec<Box<dyn Provider>>, limiter: RateLimiter) -> Self {
        Self { providers, limiter }
    }

    /// Nominatim first, Photon as the fallback, sharing one HTTP agent.
    pub fn from_config(config: &GeocoderConfig) -> Self {
        let agent: Agent = AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Self::new(
            vec![
                Box::new(Nominatim::new(agent.clone(), config)),
                Box::new(Photon::new(agent, config)),
            ],
            RateLimiter::new(config.min_interval, SystemClock),
        )
    }

    pub fn geocode(&mut self, address: &str) -> GeocodeResult {
        if address.trim().is_empty() {
            return GeocodeResult::empty_address();
        }

        debug!("Geocoding: {address}");
        for provider in &self.providers {
            let service = provider.service();
            self.limiter.wait();
            match provider.resolve(address) {
                Ok(Some(candidate)) => {
                    debug!(
                        "{service} matched {address:?} at ({}, {}) {:?}",
                        candidate.latitude(),
                        candidate.longitude(),
                        candidate.label.as_deref().unwrap_or_default()
                    );
                    return GeocodeResult::success(address, service, candidate);
                }
                Ok(None) => debug!("{service} has no match for {address:?}"),
                Err(err) => warn!("{service} error for {address:?}: {err}"),
            }
        }

        GeocodeResult::failed(address)
    }
}
