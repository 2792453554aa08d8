//! Cache behavior tests that go through the HTTP client against a mock API.

use std::num::NonZeroU32;
use std::time::Duration;

use httpmock::MockServer;
use url::Url;

use bacheca::api::{ApiClient, ApiError};
use bacheca::config::ApiSettings;
use bacheca::domain::posts::{NewPost, Post, PostPage};
use bacheca::query::{
    KeyPrefix, Mutation, QueryClient, QueryConfig, QueryData, QueryKey, QueryObserver, QueryStatus,
};

fn api_for(server: &MockServer) -> ApiClient {
    let settings = ApiSettings {
        base_url: Url::parse(&server.base_url()).expect("mock server url"),
        timeout: Duration::from_secs(5),
        page_size: NonZeroU32::new(2).expect("page size"),
    };
    ApiClient::new(&settings).expect("client builds")
}

async fn fetch_page(api: &ApiClient, page: u32) -> Result<QueryData, ApiError> {
    let slice = api.list_posts_page(page).await?;
    Ok(QueryData::Page(PostPage::from_slice(
        page,
        api.page_size(),
        slice,
    )))
}

#[tokio::test]
async fn concurrent_fetches_share_one_wire_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/posts")
                .query_param("_sort", "title");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[{"id":1,"title":"alpha","body":"a","userId":1}]"#);
        })
        .await;

    let api = api_for(&server);
    let queries = QueryClient::new(&QueryConfig::default());
    let key = QueryKey::Posts;

    let api_ref = &api;
    let (first, second) = tokio::join!(
        queries.fetch(&key, move || async move {
            api_ref.list_posts().await.map(QueryData::Posts)
        }),
        queries.fetch(&key, move || async move {
            api_ref.list_posts().await.map(QueryData::Posts)
        }),
    );

    assert_eq!(first.status, QueryStatus::Success);
    assert_eq!(second.status, QueryStatus::Success);
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn invalidation_serves_stale_data_and_refetches() {
    let server = MockServer::start_async().await;
    let seeded = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/posts")
                .query_param("_sort", "title");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[{"id":1,"title":"alpha","body":"a","userId":1}]"#);
        })
        .await;

    let api = api_for(&server);
    let queries = QueryClient::new(&QueryConfig::default());
    let key = QueryKey::Posts;
    let api_ref = &api;

    let first = queries
        .fetch(&key, move || async move {
            api_ref.list_posts().await.map(QueryData::Posts)
        })
        .await;
    assert_eq!(first.status, QueryStatus::Success);
    assert!(!first.stale);

    // A second fetch is a pure cache hit.
    let cached = queries
        .fetch(&key, move || async move {
            api_ref.list_posts().await.map(QueryData::Posts)
        })
        .await;
    assert_eq!(cached.status, QueryStatus::Success);
    seeded.assert_calls_async(1).await;

    assert_eq!(queries.invalidate(&KeyPrefix::Posts), 1);
    let held = queries.snapshot(&key);
    assert!(held.stale);
    assert!(held.data.is_some(), "stale entries keep serving data");

    seeded.delete_async().await;
    let updated = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/posts")
                .query_param("_sort", "title");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[{"id":1,"title":"alpha","body":"a","userId":1},{"id":2,"title":"beta","body":"b","userId":1}]"#);
        })
        .await;

    let refetched = queries
        .fetch(&key, move || async move {
            api_ref.list_posts().await.map(QueryData::Posts)
        })
        .await;
    assert!(!refetched.stale);
    assert_eq!(
        refetched.data.as_ref().and_then(QueryData::as_posts).map(<[Post]>::len),
        Some(2)
    );
    updated.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_refetch_keeps_the_last_good_data() {
    let server = MockServer::start_async().await;
    let healthy = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/posts")
                .query_param("_sort", "title");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[{"id":1,"title":"alpha","body":"a","userId":1}]"#);
        })
        .await;

    let api = api_for(&server);
    let queries = QueryClient::new(&QueryConfig::default());
    let key = QueryKey::Posts;
    let api_ref = &api;

    queries
        .fetch(&key, move || async move {
            api_ref.list_posts().await.map(QueryData::Posts)
        })
        .await;

    healthy.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/posts");
            then.status(500);
        })
        .await;

    queries.invalidate(&KeyPrefix::Posts);
    let failed = queries
        .fetch(&key, move || async move {
            api_ref.list_posts().await.map(QueryData::Posts)
        })
        .await;

    assert_eq!(failed.status, QueryStatus::Error);
    assert!(matches!(
        failed.error.as_deref(),
        Some(ApiError::Http { status: 500 })
    ));
    assert_eq!(
        failed.data.as_ref().and_then(QueryData::as_posts).map(<[Post]>::len),
        Some(1),
        "the last good payload stays visible next to the error"
    );
}

#[tokio::test]
async fn failed_prefetch_leaves_the_slot_clean() {
    let server = MockServer::start_async().await;
    let broken = server
        .mock_async(|when, then| {
            when.method("GET").path("/posts/7");
            then.status(500);
        })
        .await;

    let api = api_for(&server);
    let queries = QueryClient::new(&QueryConfig::default());
    let key = QueryKey::Post { id: 7 };
    let api_ref = &api;

    queries
        .prefetch(&key, move || async move {
            api_ref.get_post(7).await.map(QueryData::Post)
        })
        .await;

    let after = queries.snapshot(&key);
    assert_eq!(after.status, QueryStatus::Idle);
    assert!(after.data.is_none());
    assert!(after.error.is_none(), "a failed warm-up records no error");

    broken.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/posts/7");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"id":7,"title":"eta","body":"e","userId":1}"#);
        })
        .await;

    let recovered = queries
        .fetch(&key, move || async move {
            api_ref.get_post(7).await.map(QueryData::Post)
        })
        .await;
    assert_eq!(recovered.status, QueryStatus::Success);
}

#[tokio::test]
async fn page_flip_keeps_the_previous_page_on_screen() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/posts")
                .query_param("_page", "1")
                .query_param("_sort", "title")
                .query_param("_limit", "2");
            then.status(200)
                .header("content-type", "application/json")
                .header("x-total-count", "5")
                .body(r#"[{"id":1,"title":"alpha","body":"a","userId":1},{"id":2,"title":"beta","body":"b","userId":1}]"#);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/posts")
                .query_param("_page", "2")
                .query_param("_sort", "title")
                .query_param("_limit", "2");
            then.status(200)
                .header("content-type", "application/json")
                .header("x-total-count", "5")
                .body(r#"[{"id":3,"title":"gamma","body":"c","userId":1},{"id":4,"title":"delta","body":"d","userId":1}]"#);
        })
        .await;

    let api = api_for(&server);
    let queries = QueryClient::new(&QueryConfig::default());
    let observer = QueryObserver::new(queries.clone(), true);
    let api_ref = &api;

    observer.set_key(QueryKey::PostsPage { page: 1 });
    let first = observer.refresh(move || fetch_page(api_ref, 1)).await;
    assert_eq!(first.status, QueryStatus::Success);

    observer.set_key(QueryKey::PostsPage { page: 2 });
    let held = observer.snapshot();
    assert!(held.is_previous_data);
    assert_eq!(
        held.data
            .as_ref()
            .and_then(QueryData::as_page)
            .map(|page| page.page),
        Some(1),
        "page one stays visible while page two loads"
    );

    let settled = observer.refresh(move || fetch_page(api_ref, 2)).await;
    assert!(!settled.is_previous_data);
    assert_eq!(
        settled
            .data
            .as_ref()
            .and_then(QueryData::as_page)
            .map(|page| page.page),
        Some(2)
    );
}

#[tokio::test]
async fn mutation_success_invalidates_listings() {
    let server = MockServer::start_async().await;
    let listing = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/posts")
                .query_param("_sort", "title");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[{"id":1,"title":"alpha","body":"a","userId":1}]"#);
        })
        .await;
    let created = server
        .mock_async(|when, then| {
            when.method("POST").path("/posts");
            then.status(201)
                .header("content-type", "application/json")
                .body(r#"{"id":900,"title":"Hello","body":"world","userId":1}"#);
        })
        .await;

    let api = api_for(&server);
    let queries = QueryClient::new(&QueryConfig::default());
    let key = QueryKey::Posts;
    let api_ref = &api;

    queries
        .fetch(&key, move || async move {
            api_ref.list_posts().await.map(QueryData::Posts)
        })
        .await;
    listing.assert_calls_async(1).await;

    let mut mutation: Mutation<NewPost, Post, ()> = Mutation::new().on_success({
        let queries = queries.clone();
        move |_post: &Post, _vars: &NewPost, _ctx: &()| {
            queries.invalidate(&KeyPrefix::Posts);
        }
    });

    let draft = NewPost::new("Hello", "world").expect("valid draft");
    let outcome = mutation
        .run(draft, move |vars| async move {
            api_ref.create_post(&vars).await
        })
        .await;

    assert_eq!(outcome.success().map(|post| post.id), Some(900));
    created.assert_calls_async(1).await;

    queries
        .fetch(&key, move || async move {
            api_ref.list_posts().await.map(QueryData::Posts)
        })
        .await;
    listing.assert_calls_async(2).await;
}
