use panorama_shared::models::Panorama;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::session::PanoramaStore;

const PANORAMA_FIELDS: &str = "id title imageUrl northOffset createdAt updatedAt";

/// Build the GraphQL endpoint URL for a server origin.
pub fn build_graphql_url(origin: &str) -> String {
    format!("{}/graphql", origin.trim_end_matches('/'))
}

/// Build the variables JSON for a panorama lookup.
pub fn build_panorama_variables(id: &str) -> serde_json::Value {
    serde_json::json!({ "id": id })
}

/// Build the variables JSON for a north offset mutation.
pub fn build_set_north_offset_variables(id: &str, degrees: f64) -> serde_json::Value {
    serde_json::json!({ "id": id, "degrees": degrees })
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

impl<T> GraphQLResponse<T> {
    /// The data, or the first error message verbatim.
    pub fn into_result(self) -> Result<T, String> {
        if let Some(errors) = self.errors {
            if let Some(first) = errors.into_iter().next() {
                return Err(first.message);
            }
        }
        self.data.ok_or_else(|| "No data returned".to_string())
    }
}

#[derive(Deserialize)]
pub struct FetchPanoramaResponse {
    pub panorama: Option<Panorama>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NorthOffsetData {
    pub north_offset: f64,
}

#[derive(Deserialize)]
pub struct SetNorthOffsetResponse {
    #[serde(rename = "setNorthOffset")]
    pub set_north_offset: NorthOffsetData,
}

/// Panorama store backed by the server's GraphQL API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    endpoint: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(origin: &str) -> Self {
        ApiClient {
            endpoint: build_graphql_url(origin),
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query_str: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<T, String> {
        let req = GraphQLRequest {
            query: query_str.to_string(),
            variables,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&req)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let gql_resp: GraphQLResponse<T> = resp.json().await.map_err(|e| e.to_string())?;
        gql_resp.into_result()
    }

    pub async fn fetch_panorama(&self, id: &str) -> Result<Option<Panorama>, String> {
        let resp: FetchPanoramaResponse = self
            .query(
                &format!(
                    "query FetchPanorama($id: ID!) {{ panorama(id: $id) {{ {} }} }}",
                    PANORAMA_FIELDS
                ),
                Some(build_panorama_variables(id)),
            )
            .await?;
        Ok(resp.panorama)
    }

    pub async fn save_north_offset(&self, id: &str, degrees: f64) -> Result<f64, String> {
        let resp: SetNorthOffsetResponse = self
            .query(
                r#"mutation SetNorthOffset($id: ID!, $degrees: Float!) {
                    setNorthOffset(id: $id, degrees: $degrees) { northOffset }
                }"#,
                Some(build_set_north_offset_variables(id, degrees)),
            )
            .await?;
        Ok(resp.set_north_offset.north_offset)
    }
}

impl PanoramaStore for ApiClient {
    async fn get(&self, id: &str) -> Result<Option<Panorama>, String> {
        self.fetch_panorama(id).await
    }

    async fn set_north_offset(&self, id: &str, degrees: f64) -> Result<(), String> {
        self.save_north_offset(id, degrees).await.map(|_| ())
    }
}
