//! Reqwest transports against a mock server

use crate::common::{user_agent, BlockingServer};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use sumi_crawler::components::{
    user_agent_string, AsyncReqwestTransport, HttpMethod, HttpResponse, RequestDescriptor,
    ReqwestTransport,
};
use sumi_crawler::retry::CallbackHooks;
use sumi_crawler::{AsyncTransport, CrawlError, Transport};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Nothing listens on the tcpmux port
const UNREACHABLE: &str = "http://127.0.0.1:1/";

#[test]
fn test_blocking_get_sends_user_agent() {
    let server = BlockingServer::start();
    let agent = user_agent_string(&user_agent());

    server.mount(
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(header("user-agent", agent.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string(r#"[["a", 1]]"#),
            )
            .expect(1),
    );

    let transport = ReqwestTransport::from_config(&user_agent()).unwrap();
    let url = format!("{}/data", server.uri());
    let response = transport
        .request(&RequestDescriptor::new(HttpMethod::Get, url.clone(), 1))
        .unwrap()
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.url, url);
    assert_eq!(response.content_type, "application/json");
    assert_eq!(response.body, r#"[["a", 1]]"#);
}

#[test]
fn test_blocking_error_status_is_a_response() {
    let server = BlockingServer::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here")),
    );

    let transport = ReqwestTransport::from_config(&user_agent()).unwrap();
    let response = transport
        .request(&RequestDescriptor::new(
            HttpMethod::Get,
            format!("{}/gone", server.uri()),
            3,
        ))
        .unwrap()
        .unwrap();

    // Only transport failures are retried
    assert_eq!(response.status, 404);
    assert_eq!(response.body, "not here");
}

#[test]
fn test_blocking_dispatches_every_verb() {
    let server = BlockingServer::start();
    for verb in ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS"] {
        server.mount(
            Mock::given(method(verb))
                .and(path("/verbs"))
                .respond_with(ResponseTemplate::new(200).insert_header("x-verb", verb))
                .expect(1),
        );
    }

    let transport = ReqwestTransport::from_config(&user_agent()).unwrap();
    let url = format!("{}/verbs", server.uri());
    for verb in HttpMethod::ALL {
        let response = transport
            .request(&RequestDescriptor::new(verb, url.clone(), 1))
            .unwrap()
            .unwrap();
        assert_eq!(response.status, 200, "{} was not routed", verb);
    }
}

#[test]
fn test_blocking_connection_failure_uses_every_attempt() {
    let attempts = Arc::new(AtomicU32::new(0));
    let finals = Arc::new(AtomicU32::new(0));
    let seen_attempts = Arc::clone(&attempts);
    let seen_finals = Arc::clone(&finals);

    let hooks = CallbackHooks::<Option<HttpResponse>>::new()
        .on_before(move |_, _| {
            seen_attempts.fetch_add(1, Ordering::SeqCst);
        })
        .on_final(move || {
            seen_finals.fetch_add(1, Ordering::SeqCst);
        });
    let transport = ReqwestTransport::from_config(&user_agent())
        .unwrap()
        .with_hooks(hooks);

    let result = transport.request(&RequestDescriptor::new(HttpMethod::Get, UNREACHABLE, 3));

    assert!(matches!(result, Err(CrawlError::Http { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(finals.load(Ordering::SeqCst), 3);
}

#[test]
fn test_blocking_error_hook_recovers() {
    let hooks = CallbackHooks::<Option<HttpResponse>>::new().on_error(|_| {
        Ok(Some(HttpResponse {
            url: UNREACHABLE.to_string(),
            status: 503,
            content_type: String::new(),
            body: String::new(),
        }))
    });
    let transport = ReqwestTransport::from_config(&user_agent())
        .unwrap()
        .with_hooks(hooks);

    let response = transport
        .request(&RequestDescriptor::new(HttpMethod::Get, UNREACHABLE, 2))
        .unwrap()
        .unwrap();

    assert_eq!(response.status, 503);
}

#[tokio::test]
async fn test_async_post_sends_user_agent() {
    let server = MockServer::start().await;
    let agent = user_agent_string(&user_agent());

    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(header("user-agent", agent.as_str()))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = AsyncReqwestTransport::from_config(&user_agent()).unwrap();
    let method = HttpMethod::dispatch("post").unwrap();
    let response = transport
        .request(&RequestDescriptor::new(
            method,
            format!("{}/submit", server.uri()),
            1,
        ))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.body, "created");
}

#[tokio::test]
async fn test_async_connection_failure_uses_every_attempt() {
    let attempts = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&attempts);

    let hooks = CallbackHooks::<Option<HttpResponse>>::new().on_before(move |request, attempt| {
        assert_eq!(request.url, UNREACHABLE);
        assert!(attempt >= 1 && attempt <= request.retry_budget);
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let transport = AsyncReqwestTransport::from_config(&user_agent())
        .unwrap()
        .with_hooks(hooks);

    let result = transport
        .request(&RequestDescriptor::new(HttpMethod::Get, UNREACHABLE, 4))
        .await;

    assert!(matches!(result, Err(CrawlError::Http { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
}
