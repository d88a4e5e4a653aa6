use reqwest::{header, Client, Method, RequestBuilder};

use super::error::StoreError;
use super::types::*;
use crate::config::Config;

/// Client for the PostgREST-style endpoint that stores lots and companies.
pub struct LotClient {
    client: Client,
    base_url: String,
    api_key: String,
    project_id: Option<String>,
}

impl LotClient {
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let api_key = config.api_key.clone()
            .ok_or(StoreError::NotConfigured("API key"))?;
        if config.backend_url.trim().is_empty() {
            return Err(StoreError::NotConfigured("backend URL"));
        }

        let client = Client::builder()
            .build()?;

        Ok(Self {
            client,
            base_url: config.rest_url(),
            api_key,
            project_id: config.project_id.clone(),
        })
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint);
        self.client
            .request(method, &url)
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::ACCEPT, "application/json")
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http { status, body });
        }

        let result = response.json::<T>().await?;
        Ok(result)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T, StoreError> {
        self.send(self.request(Method::GET, endpoint)).await
    }

    /// Write with `return=representation` so the store echoes the rows back
    async fn write<B: serde::Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<Vec<Lot>, StoreError> {
        let request = self.request(method, endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .json(body);
        self.send(request).await
    }

    fn lot_filter(id: &str) -> String {
        format!("/lots?id=eq.{}", urlencoding::encode(id))
    }

    /// All lots of the configured project
    pub async fn list_lots(&self) -> Result<Vec<Lot>, StoreError> {
        let endpoint = match &self.project_id {
            Some(project) => format!(
                "/lots?select=*&project_id=eq.{}&order=sort_order.asc",
                urlencoding::encode(project)
            ),
            None => "/lots?select=*&order=sort_order.asc".to_string(),
        };
        self.get(&endpoint).await
    }

    /// Contractor names, used for row labels only
    pub async fn list_companies(&self) -> Result<Vec<Company>, StoreError> {
        self.get("/companies?select=id,name&order=name.asc").await
    }

    pub async fn update_lot(&self, id: &str, patch: &LotPatch) -> Result<Lot, StoreError> {
        let rows = self.write(Method::PATCH, &Self::lot_filter(id), patch).await?;
        rows.into_iter().next()
            .ok_or_else(|| StoreError::LotNotFound(id.to_string()))
    }

    pub async fn create_lot(&self, new_lot: &NewLot) -> Result<Lot, StoreError> {
        let mut body = new_lot.clone();
        if body.project_id.is_none() {
            body.project_id = self.project_id.clone();
        }
        let rows = self.write(Method::POST, "/lots", &body).await?;
        rows.into_iter().next()
            .ok_or_else(|| StoreError::LotNotFound(new_lot.name.clone()))
    }

    pub async fn delete_lot(&self, id: &str) -> Result<(), StoreError> {
        let response = self.request(Method::DELETE, &Self::lot_filter(id))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http { status, body });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lot_filter_encodes_id() {
        assert_eq!(LotClient::lot_filter("abc-1"), "/lots?id=eq.abc-1");
        assert_eq!(LotClient::lot_filter("a b&c"), "/lots?id=eq.a%20b%26c");
    }

    #[test]
    fn test_new_requires_key_and_url() {
        let mut config = Config::default();
        config.backend_url = "https://example.supabase.co".into();
        assert!(matches!(LotClient::new(&config), Err(StoreError::NotConfigured("API key"))));

        config.api_key = Some("key".into());
        config.backend_url = "  ".into();
        assert!(matches!(LotClient::new(&config), Err(StoreError::NotConfigured("backend URL"))));
    }
}
