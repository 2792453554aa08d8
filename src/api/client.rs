//! Typed client for a json-server style `posts` resource.

use std::time::Instant;

use metrics::histogram;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiSettings;
use crate::domain::posts::{DEMO_AUTHOR_ID, NewPost, PageSlice, Post, PostIdAllocator};

use super::error::ApiError;

const METRIC_API_REQUEST_MS: &str = "bacheca_api_request_ms";
const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// HTTP client bound to one API base URL.
///
/// Owns the id allocator so every created post carries a fresh numeric id.
#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
    page_size: u32,
    ids: PostIdAllocator,
}

impl ApiClient {
    /// Build a client from validated settings.
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            base: settings.base_url.clone(),
            page_size: settings.page_size.get(),
            ids: PostIdAllocator::new(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("bacheca/", env!("CARGO_PKG_VERSION"))
    }

    /// Page size sent with paginated requests.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch every post, sorted by title on the server.
    pub async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        let mut url = self.endpoint("posts")?;
        url.query_pairs_mut().append_pair("_sort", "title");

        let started = Instant::now();
        let result = self.get_json(url).await;
        record_request("list_posts", started);
        result
    }

    /// Fetch one page of posts together with the total-count signal.
    ///
    /// Pages are sliced from the same title ordering as the full listing.
    pub async fn list_posts_page(&self, page: u32) -> Result<PageSlice, ApiError> {
        let mut url = self.endpoint("posts")?;
        url.query_pairs_mut()
            .append_pair("_page", &page.to_string())
            .append_pair("_sort", "title")
            .append_pair("_limit", &self.page_size.to_string());

        let started = Instant::now();
        let result = self.fetch_page(url, page).await;
        record_request("list_posts_page", started);
        result
    }

    /// Fetch a single post; a 404 maps to [`ApiError::NotFound`].
    pub async fn get_post(&self, id: i64) -> Result<Post, ApiError> {
        let url = self.endpoint(&format!("posts/{id}"))?;

        let started = Instant::now();
        let result = self.fetch_post(url, id).await;
        record_request("get_post", started);
        result
    }

    /// Create a post from a draft and return the record the server echoes.
    ///
    /// The client supplies the payload's `id` (allocator) and `userId`
    /// (demo author); title and body are sent exactly as the draft holds
    /// them.
    pub async fn create_post(&self, draft: &NewPost) -> Result<Post, ApiError> {
        let url = self.endpoint("posts")?;
        let payload = Post {
            id: self.ids.allocate(),
            title: draft.title.clone(),
            body: draft.body.clone(),
            user_id: DEMO_AUTHOR_ID,
        };

        let started = Instant::now();
        let result = self.send_create(url, &payload).await;
        record_request("create_post", started);
        result
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(ApiError::from)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }
        Self::read_body(response).await
    }

    async fn fetch_page(&self, url: Url, page: u32) -> Result<PageSlice, ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }

        let header_total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        let items: Vec<Post> = Self::read_body(response).await?;
        let total_count = match header_total {
            Some(total) => total,
            None => {
                debug!(
                    page,
                    fallback = items.len(),
                    "Total-count header missing; using slice length"
                );
                items.len() as u64
            }
        };

        Ok(PageSlice { items, total_count })
    }

    async fn fetch_post(&self, url: Url, id: i64) -> Result<Post, ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound { id });
        }
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }
        Self::read_body(response).await
    }

    async fn send_create(&self, url: Url, payload: &Post) -> Result<Post, ApiError> {
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }
        Self::read_body(response).await
    }

    async fn read_body<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn record_request(op: &'static str, started: Instant) {
    histogram!(METRIC_API_REQUEST_MS, "op" => op).record(started.elapsed().as_secs_f64() * 1000.0);
}
