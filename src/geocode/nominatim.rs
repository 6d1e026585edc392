use serde::Deserialize;
use ureq::Agent;

use super::enricher::Provider;
use crate::{
    config::GeocoderConfig,
    error::ProviderError,
    model::{Candidate, Service},
};

/// OpenStreetMap Nominatim `/search`, biased to the configured countries.
pub struct Nominatim {
    agent: Agent,
    url: String,
    country_codes: String,
    email: Option<String>,
}

impl Nominatim {
    pub fn new(agent: Agent, config: &GeocoderConfig) -> Self {
        Self {
            agent,
            url: format!("{}/search", config.nominatim_url.trim_end_matches('/')),
            country_codes: config.country_codes.clone(),
            email: config.email.clone(),
        }
    }
}

impl Provider for Nominatim {
    fn service(&self) -> Service {
        Service::Nominatim
    }

    fn resolve(&self, address: &str) -> Result<Option<Candidate>, ProviderError> {
        let mut request = self
            .agent
            .get(&self.url)
            .query("q", address)
            .query("format", "json")
            .query("limit", "1");
        if !self.country_codes.is_empty() {
            request = request.query("countrycodes", &self.country_codes);
        }
        if let Some(email) = &self.email {
            request = request.query("email", email);
        }

        let places: Vec<Place> = request.call()?.into_json()?;
        match places.into_iter().next() {
            Some(place) => place.refine().map(Some),
            None => Ok(None),
        }
    }
}

// nominatim sends coordinates as strings
#[derive(Deserialize)]
struct Place {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

impl Place {
    fn refine(self) -> Result<Candidate, ProviderError> {
        let parse = |x: &str| {
            x.parse::<f64>()
                .map_err(|_| ProviderError::Malformed(format!("bad coordinate {x:?}")))
        };
        let mut candidate = Candidate::new(parse(&self.lat)?, parse(&self.lon)?);
        candidate.label = self.display_name;
        Ok(candidate)
    }
}
