use crate::db::Store;
use crate::error::LookupError;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Bookkeeping key holding the auth-context-key -> bearer token map.
const AUTH_TOKENS_KEY: &str = "auth_tokens";

#[derive(Debug, Clone)]
pub struct TvdbConfig {
    pub base_url: String,

    pub banner_url: String,

    pub api_key: String,

    pub username: Option<String>,

    pub password: Option<String>,

    pub request_timeout_seconds: u32,
}

impl Default for TvdbConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.thetvdb.com/".to_string(),
            banner_url: "https://thetvdb.com/banners/".to_string(),
            api_key: String::new(),
            username: None,
            password: None,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    data: Option<Value>,
    errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPayload {
    pub id: i32,
    pub series_name: Option<String>,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub site_rating: Option<f64>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "flexible_i32")]
    pub runtime: Option<i32>,
    pub airs_time: Option<String>,
    pub airs_day_of_week: Option<String>,
    /// Content rating; TVDB calls this field `rating`.
    pub rating: Option<String>,
    pub network: Option<String>,
    pub overview: Option<String>,
    pub imdb_id: Option<String>,
    pub zap2it_id: Option<String>,
    pub banner: Option<String>,
    pub first_aired: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub genre: Option<Vec<String>>,
    pub last_updated: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodePayload {
    pub id: i32,
    pub episode_name: Option<String>,
    pub aired_season: Option<i32>,
    pub aired_episode_number: Option<i32>,
    pub absolute_number: Option<i32>,
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub site_rating: Option<f64>,
    pub director: Option<String>,
    pub filename: Option<String>,
    pub first_aired: Option<String>,
    pub last_updated: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub id: i32,
    pub series_name: Option<String>,
    pub first_aired: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeQueryEntry {
    pub id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActorEntry {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    pub file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEntry {
    pub id: i32,
}

/// TheTVDB API client. Bearer tokens are keyed by auth-context-key
/// (the configured username, or `"default"`) and persisted through the
/// bookkeeping store so a restart does not force a re-login.
#[derive(Clone)]
pub struct TvdbClient {
    client: Client,
    config: TvdbConfig,
    store: Store,
    auth_key: String,
}

impl TvdbClient {
    #[must_use]
    pub fn new(config: TvdbConfig, store: Store) -> Self {
        let auth_key = config
            .username
            .clone()
            .unwrap_or_else(|| "default".to_string());

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
                .user_agent("Metarr/1.0")
                .build()
                .expect("Failed to build HTTP client"),
            config,
            store,
            auth_key,
        }
    }

    #[must_use]
    pub fn banner_url(&self) -> &str {
        &self.config.banner_url
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, LookupError> {
        let base = Url::parse(&self.config.base_url)
            .map_err(|e| LookupError::Remote(format!("invalid TVDB base url: {e}")))?;
        base.join(endpoint)
            .map_err(|e| LookupError::Remote(format!("invalid TVDB endpoint {endpoint}: {e}")))
    }

    async fn load_tokens(&self) -> Result<HashMap<String, String>, LookupError> {
        let tokens = match self.store.get_bookkeeping(AUTH_TOKENS_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            None => HashMap::new(),
        };
        Ok(tokens)
    }

    /// Returns the cached bearer token for this auth-context-key, logging
    /// in when there is none or a refresh is forced.
    async fn auth_token(&self, refresh: bool) -> Result<String, LookupError> {
        let mut tokens = self.load_tokens().await?;

        if !refresh {
            if let Some(token) = tokens.get(&self.auth_key) {
                return Ok(token.clone());
            }
        }

        debug!(
            auth_key = %self.auth_key,
            "Authenticating to TheTVDB"
        );

        let mut body = json!({ "apikey": self.config.api_key });
        if let Some(username) = &self.config.username {
            body["username"] = json!(username);
        }
        if let Some(password) = &self.config.password {
            body["userpass"] = json!(password);
        }

        let url = self.endpoint_url("login")?;
        let response = self.client.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(LookupError::Remote(format!(
                "TVDB login failed with status {}",
                response.status()
            )));
        }

        let login: LoginResponse = response.json().await?;
        tokens.insert(self.auth_key.clone(), login.token.clone());

        let raw = serde_json::to_string(&tokens)
            .map_err(|e| LookupError::InvalidData(e.to_string()))?;
        self.store.set_bookkeeping(AUTH_TOKENS_KEY, &raw).await?;

        Ok(login.token)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        query: &[(String, String)],
        body: Option<&Value>,
        token: &str,
    ) -> Result<Response, LookupError> {
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// One request with the shared token; a 401 triggers exactly one token
    /// refresh and retry, anything else non-2xx is a remote failure.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, LookupError> {
        let url = self.endpoint_url(endpoint)?;

        let token = self.auth_token(false).await?;
        let mut response = self
            .send(method.clone(), url.clone(), query, body.as_ref(), &token)
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Auth token expired, refreshing");
            let token = self.auth_token(true).await?;
            response = self.send(method, url, query, body.as_ref(), &token).await?;
        }

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(format!(
                "TVDB has no results for {endpoint}"
            )));
        }
        if !response.status().is_success() {
            return Err(LookupError::Remote(format!(
                "TVDB request to {endpoint} failed with status {}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope = response.json().await?;
        if let Some(errors) = envelope.errors {
            return Err(LookupError::Remote(format!(
                "TVDB reported errors for {endpoint}: {errors}"
            )));
        }

        envelope.data.ok_or_else(|| {
            LookupError::InvalidData(format!("TVDB response for {endpoint} has no data"))
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<T, LookupError> {
        let data = self.request(Method::GET, endpoint, query, None).await?;
        serde_json::from_value(data).map_err(|e| {
            LookupError::InvalidData(format!("unexpected TVDB payload for {endpoint}: {e}"))
        })
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<T, LookupError> {
        let data = self.request(Method::POST, endpoint, &[], Some(body)).await?;
        serde_json::from_value(data).map_err(|e| {
            LookupError::InvalidData(format!("unexpected TVDB payload for {endpoint}: {e}"))
        })
    }

    pub async fn put<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, LookupError> {
        let data = self.request(Method::PUT, endpoint, &[], None).await?;
        serde_json::from_value(data).map_err(|e| {
            LookupError::InvalidData(format!("unexpected TVDB payload for {endpoint}: {e}"))
        })
    }

    pub async fn delete(&self, endpoint: &str) -> Result<(), LookupError> {
        self.request(Method::DELETE, endpoint, &[], None).await?;
        Ok(())
    }

    pub async fn series(&self, id: i32) -> Result<SeriesPayload, LookupError> {
        self.get(&format!("series/{id}"), &[]).await
    }

    /// Actors of a series; a 404 from the service means "none recorded".
    pub async fn series_actors(&self, id: i32) -> Result<Vec<ActorEntry>, LookupError> {
        match self.get(&format!("series/{id}/actors"), &[]).await {
            Ok(actors) => Ok(actors),
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// Poster images of a series; a 404 from the service means "none".
    pub async fn series_posters(&self, id: i32) -> Result<Vec<ImageEntry>, LookupError> {
        let query = [("keyType".to_string(), "poster".to_string())];
        match self.get(&format!("series/{id}/images/query"), &query).await {
            Ok(posters) => Ok(posters),
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    pub async fn search_series(&self, name: &str) -> Result<Vec<SearchEntry>, LookupError> {
        let query = [("name".to_string(), name.to_string())];
        self.get("search/series", &query).await
    }

    pub async fn episode(&self, id: i32) -> Result<EpisodePayload, LookupError> {
        self.get(&format!("episodes/{id}"), &[]).await
    }

    pub async fn series_episodes(
        &self,
        series_id: i32,
        query: &[(String, String)],
    ) -> Result<Vec<EpisodeQueryEntry>, LookupError> {
        self.get(&format!("series/{series_id}/episodes/query"), query)
            .await
    }

    /// Ids of all catalog entries changed since the given epoch second.
    pub async fn updated_since(&self, from_time: i64) -> Result<Vec<UpdateEntry>, LookupError> {
        let query = [("fromTime".to_string(), from_time.to_string())];
        self.get("updated/query", &query).await
    }
}

/// TheTVDB serves some numeric fields as numbers, strings or null
/// depending on the record; accept all three.
fn flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

fn flexible_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}
