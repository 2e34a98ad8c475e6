use crate::core::config::BackendConfig;
use crate::data::conversion::{ErrorDto, PlaceDetailDto, PlaceListDto};
use crate::data::model::{PlaceDetail, PlaceItem, PlaceKind, PlaceRef, UserPlaces};
use crate::pipeline::ViewportQuery;
use crate::services::PlaceService;
use crate::{MapError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;

/// Shared async HTTP client used when no dedicated settings are given
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    let defaults = BackendConfig::default();
    reqwest::Client::builder()
        .user_agent(defaults.user_agent.as_str())
        .timeout(defaults.request_timeout())
        .tcp_keepalive(std::time::Duration::from_secs(30))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .build()
        .expect("failed to build reqwest async client")
});

/// JSON-over-HTTP implementation of [`PlaceService`]
#[derive(Debug, Clone)]
pub struct HttpPlaceService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPlaceService {
    /// Uses the shared client with default timeouts
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: HTTP_CLIENT.clone(),
        }
    }

    /// Builds a dedicated client from `config`
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: config.base_url.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn fetch_list(&self, kind: PlaceKind, query: &ViewportQuery) -> Result<PlaceListDto> {
        let url = self.url(&format!("places/{}", kind));
        log::debug!("GET {} for {}", url, query);
        let response = self
            .client
            .get(&url)
            .query(&viewport_params(query))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

/// Query parameters describing a viewport request
pub fn viewport_params(query: &ViewportQuery) -> Vec<(&'static str, String)> {
    vec![
        ("west", query.rect.west.to_string()),
        ("south", query.rect.south.to_string()),
        ("east", query.rect.east.to_string()),
        ("north", query.rect.north.to_string()),
        ("lat", query.anchor.lat.to_string()),
        ("lng", query.anchor.lng.to_string()),
        ("zoom", query.zoom.value().to_string()),
    ]
}

fn transport_error(err: reqwest::Error) -> MapError {
    if err.is_timeout() {
        MapError::Timeout(err.to_string())
    } else {
        MapError::Network(err)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorDto>(&body)
        .map(|dto| dto.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    Err(MapError::Backend {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await.map_err(transport_error)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl PlaceService for HttpPlaceService {
    async fn official_places(&self, query: &ViewportQuery) -> Result<Vec<PlaceItem>> {
        let list = self.fetch_list(PlaceKind::Official, query).await?;
        Ok(list.into_places(PlaceKind::Official))
    }

    async fn user_places(&self, query: &ViewportQuery) -> Result<UserPlaces> {
        let list = self.fetch_list(PlaceKind::User, query).await?;
        Ok(list.into_user_places())
    }

    async fn place_detail(&self, place: &PlaceRef) -> Result<PlaceDetail> {
        let url = self.url(&format!("places/{}/{}", place.kind, place.id));
        log::debug!("GET {}", url);
        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        let dto: PlaceDetailDto = decode(response).await?;
        Ok(dto.into_detail(place))
    }

    async fn set_favorite(&self, place: &PlaceRef, favorite: bool) -> Result<()> {
        let url = self.url(&format!("favorites/{}/{}", place.kind, place.id));
        let request = if favorite {
            self.client.put(&url)
        } else {
            self.client.delete(&url)
        };
        log::debug!("{} {}", if favorite { "PUT" } else { "DELETE" }, url);
        let response = request.send().await.map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }
}
