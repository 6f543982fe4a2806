use anyhow::Result;
use serde::Deserialize;

/// Client for the external exercise-catalog API (api-ninjas style:
/// `GET {base}?muscle=<muscle>` with an `X-Api-Key` header).
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogExercise {
    pub name: String,
    #[serde(default)]
    pub muscle: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl CatalogClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    pub async fn fetch_by_muscle(&self, muscle: &str) -> Result<Vec<CatalogExercise>> {
        let mut request = self.http.get(&self.base_url).header("X-Api-Key", &self.api_key);
        if !muscle.is_empty() {
            request = request.query(&[("muscle", muscle)]);
        }
        let exercises = request
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<CatalogExercise>>()
            .await?;
        Ok(exercises)
    }
}
