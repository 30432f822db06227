//! Direct debt query against the state vehicle registry (DETRAN).

use crate::types::VehicleQuery;
use async_trait::async_trait;
use failure::Error;
use log::{debug, info};
use url::Url;

pub const DEFAULT_API_URL: &str =
    "https://api.detrannet.detran.ma.gov.br/api/Veiculo/ConsultarDebitos";

const PLATE_PARAM: &str = "placa";
const REGISTRATION_PARAM: &str = "renavam";

/// Anything that can answer a debt query URL with the page body.
#[async_trait]
pub trait DebtSource {
    async fn fetch(&self, url: &Url) -> Result<String, Error>;
}

pub struct DetranClient {
    client: reqwest::Client,
}

impl DetranClient {
    pub fn new() -> Self {
        DetranClient {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for DetranClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DebtSource for DetranClient {
    async fn fetch(&self, url: &Url) -> Result<String, Error> {
        info!("Querying debts at {}", url);
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            bail!("registry returned {}", status);
        }
        let body = resp.text().await?;
        debug!("Registry answered with {} bytes", body.len());
        Ok(body)
    }
}

/// Builds the query URL for `query` on top of `base`, keeping any query
/// parameters `base` already carries.
pub fn query_url(base: &Url, query: &VehicleQuery) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair(PLATE_PARAM, &query.plate)
        .append_pair(REGISTRATION_PARAM, &query.registration_number);
    url
}

/// Recovers the plate and registration number a query URL was built from.
/// Missing parameters come back empty.
pub fn query_from_url(url: &Url) -> VehicleQuery {
    let mut plate = String::new();
    let mut registration_number = String::new();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            PLATE_PARAM => plate = value.into_owned(),
            REGISTRATION_PARAM => registration_number = value.into_owned(),
            _ => {}
        }
    }
    VehicleQuery {
        plate,
        registration_number,
    }
}
