use std::time::Duration;

use crate::config::AppConfig;
use crate::core::error::PotcheckError;
use crate::probes::HttpFetch;

/// Blocking HTTP collaborator. Certificate verification stays on; the
/// certificate check relies on a broken chain surfacing as an error here.
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(config: &AppConfig) -> Result<Self, PotcheckError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout())
            .redirect(reqwest::redirect::Policy::limited(4))
            .build()?;

        Ok(Self { client })
    }
}

impl HttpFetch for HttpClient {
    fn get(&self, url: &str, timeout: Duration) -> Result<String, PotcheckError> {
        let response = self.client.get(url).timeout(timeout).send()?;
        Ok(response.error_for_status()?.text()?)
    }

    fn head(&self, url: &str, timeout: Duration) -> Result<(), PotcheckError> {
        self.client.head(url).timeout(timeout).send()?;
        Ok(())
    }
}
