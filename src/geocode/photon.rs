use itertools::Itertools;
use serde::Deserialize;
use ureq::Agent;

use super::enricher::Provider;
use crate::{
    config::GeocoderConfig,
    error::ProviderError,
    model::{Candidate, Service},
};

/// Komoot Photon `/api/`, returning GeoJSON features.
pub struct Photon {
    agent: Agent,
    url: String,
    osm_tag: Option<String>,
}

impl Photon {
    pub fn new(agent: Agent, config: &GeocoderConfig) -> Self {
        Self {
            agent,
            url: format!("{}/api/", config.photon_url.trim_end_matches('/')),
            osm_tag: config.photon_osm_tag.clone(),
        }
    }
}

impl Provider for Photon {
    fn service(&self) -> Service {
        Service::Photon
    }

    fn resolve(&self, address: &str) -> Result<Option<Candidate>, ProviderError> {
        let mut request = self.agent.get(&self.url).query("q", address).query("limit", "1");
        if let Some(tag) = &self.osm_tag {
            request = request.query("osm_tag", tag);
        }

        let response: FeatureCollection = request.call()?.into_json()?;
        match response.features.into_iter().next() {
            Some(feature) => feature.refine().map(Some),
            None => Ok(None),
        }
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Deserialize)]
struct Geometry {
    // geojson order: lon, lat
    coordinates: Vec<f64>,
}

#[derive(Default, Deserialize)]
struct Properties {
    name: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
}

impl Feature {
    fn refine(self) -> Result<Candidate, ProviderError> {
        let [lon, lat, ..] = self.geometry.coordinates[..] else {
            return Err(ProviderError::Malformed(format!(
                "expected [lon, lat], got {:?}",
                self.geometry.coordinates
            )));
        };

        let p = self.properties;
        let label = [p.name, p.city, p.state, p.postcode]
            .into_iter()
            .flatten()
            .join(", ");

        let mut candidate = Candidate::new(lat, lon);
        if !label.is_empty() {
            candidate.label = Some(label);
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn provider(server: &MockServer) -> Photon {
        let config = GeocoderConfig {
            photon_url: server.base_url(),
            ..GeocoderConfig::default()
        };
        Photon::new(Agent::new(), &config)
    }

    #[test]
    fn swaps_geojson_order() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/")
                .query_param("q", "Bayswater, VIC")
                .query_param("limit", "1")
                .query_param("osm_tag", "place");
            then.status(200).json_body(json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [145.2667, -37.85] },
                    "properties": { "name": "Bayswater", "state": "Victoria", "postcode": "3153" }
                }]
            }));
        });

        let candidate = provider(&server).resolve("Bayswater, VIC").unwrap().unwrap();
        mock.assert();
        assert_eq!(candidate.latitude(), -37.85);
        assert_eq!(candidate.longitude(), 145.2667);
        assert_eq!(candidate.label.as_deref(), Some("Bayswater, Victoria, 3153"));
    }

    #[test]
    fn empty_collection_is_no_match() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/");
            then.status(200)
                .json_body(json!({ "type": "FeatureCollection", "features": [] }));
        });

        assert_eq!(provider(&server).resolve("Atlantis").unwrap(), None);
    }

    #[test]
    fn short_coordinates_are_malformed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/");
            then.status(200).json_body(json!({
                "features": [{ "geometry": { "coordinates": [145.0] } }]
            }));
        });

        let err = provider(&server).resolve("Bayswater").unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
