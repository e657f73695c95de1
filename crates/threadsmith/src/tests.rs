//! Integration tests for GenerationPipeline

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{
        ContentSource, ExtractedArticle, ExtractionMethod, FetchError, GeneratedBy, GeneratorError, Period,
        SourceType,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ARTICLE: &str = "Ownership is the feature that sets Rust apart. Every value has a \
        single owner, and when the owner goes out of scope the value is dropped. Borrowing \
        lets code use a value without taking ownership of it, and the borrow checker makes \
        sure references never outlive the data they point to. Together these rules remove \
        whole classes of memory bugs without a garbage collector.";

    struct FakeSource {
        calls: AtomicUsize,
        result: Result<ExtractedArticle, FetchError>,
    }

    impl FakeSource {
        fn article() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result: Ok(ExtractedArticle {
                    title: Some("Understanding Ownership".to_string()),
                    content: ARTICLE.to_string(),
                    method: ExtractionMethod::Selectors,
                }),
            })
        }

        fn failing(err: FetchError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result: Err(err),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        async fn fetch(&self, _url: &str) -> Result<ExtractedArticle, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    enum Behaviour {
        Reply(Vec<String>),
        Fail,
        Hang,
    }

    struct FakeGenerator(Behaviour);

    #[async_trait]
    impl TweetGenerator for FakeGenerator {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn generate(&self, _text: &str, _max_length: usize) -> Result<Vec<String>, GeneratorError> {
            match &self.0 {
                Behaviour::Reply(parts) => Ok(parts.clone()),
                Behaviour::Fail => Err(GeneratorError::Unavailable("model overloaded".to_string())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(vec!["too late".to_string()])
                }
            }
        }
    }

    fn settings() -> Settings {
        Settings::default().enforce_rate_limit(false)
    }

    fn pipeline(settings: Settings, source: Arc<FakeSource>) -> GenerationPipeline {
        GenerationPipeline::builder(settings, Arc::new(LocalStore::with_defaults()))
            .fetcher(source)
            .build()
    }

    fn caller() -> RequestContext {
        RequestContext::new("203.0.113.7")
    }

    #[tokio::test]
    async fn test_url_request_generates_numbered_thread() {
        let source = FakeSource::article();
        let pipeline = pipeline(settings(), source.clone());

        let response = pipeline
            .generate(&GenerateRequest::url("https://medium.com/rust/ownership"), &caller())
            .await
            .unwrap();

        assert!(response.success);
        assert!(!response.cached);
        assert_eq!(response.source_type, SourceType::Url);
        assert_eq!(response.generated_by, GeneratedBy::Segmenter);
        assert_eq!(response.title.as_deref(), Some("Understanding Ownership"));
        assert!(response.tweets.len() > 1);
        for tweet in &response.tweets {
            assert!(tweet.char_count <= 280);
            assert!(tweet.content.starts_with(&format!("{}/{} ", tweet.index, tweet.total)));
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_quota_exceeded_skips_acquisition() {
        let source = FakeSource::article();
        let pipeline = pipeline(settings().free_tier(2, 50), source.clone());

        for i in 0..2 {
            let url = format!("https://medium.com/post-{i}");
            pipeline.generate(&GenerateRequest::url(url), &caller()).await.unwrap();
        }

        let err = pipeline
            .generate(&GenerateRequest::url("https://medium.com/post-3"), &caller())
            .await
            .unwrap_err();

        match &err {
            GenerateError::QuotaExceeded { usage } => {
                assert_eq!(usage.blocked_by, Some(Period::Daily));
                assert_eq!(usage.daily.ip_count, 2);
                assert_eq!(usage.daily_remaining, 0);
            }
            other => panic!("Expected QuotaExceeded, got {other:?}"),
        }
        assert_eq!(err.http_status(), 402);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_email_quota_follows_user_across_ips() {
        let pipeline = pipeline(settings().free_tier(1, 50), FakeSource::article());
        let first = RequestContext::new("203.0.113.7").with_email("dana@example.com");
        let second = RequestContext::new("198.51.100.9").with_email("Dana@Example.com");

        pipeline.generate(&GenerateRequest::text(ARTICLE), &first).await.unwrap();
        let err = pipeline
            .generate(&GenerateRequest::text("Another text"), &second)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn test_cache_hit_is_flagged_and_still_counts() {
        let source = FakeSource::article();
        let pipeline = pipeline(settings(), source.clone());
        let request = GenerateRequest::url("https://dev.to/a/ownership");

        let first = pipeline.generate(&request, &caller()).await.unwrap();
        let second = pipeline.generate(&request, &caller()).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.tweets, second.tweets);
        assert_eq!(source.calls(), 1);

        let usage = pipeline.usage(&caller()).await.unwrap();
        assert_eq!(usage.daily.ip_count, 2);
    }

    #[tokio::test]
    async fn test_url_and_text_requests_do_not_collide() {
        let source = FakeSource::article();
        let pipeline = pipeline(settings(), source.clone());
        let url = "https://medium.com/rust/ownership";

        pipeline.generate(&GenerateRequest::url(url), &caller()).await.unwrap();
        let response = pipeline.generate(&GenerateRequest::text(url), &caller()).await.unwrap();

        assert!(!response.cached);
        assert_eq!(response.source_type, SourceType::Text);
        assert_eq!(response.tweets.len(), 1);
        assert_eq!(response.tweets[0].content, url);
    }

    #[tokio::test]
    async fn test_failed_fetch_still_consumes_quota() {
        let source = FakeSource::failing(FetchError::UpstreamStatus(403));
        let pipeline = pipeline(settings(), source.clone());

        let err = pipeline
            .generate(&GenerateRequest::url("https://medium.com/locked"), &caller())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GenerateError::UpstreamStatus {
                code: 403,
                category: "access blocked"
            }
        );
        assert_eq!(pipeline.usage(&caller()).await.unwrap().daily.ip_count, 1);
    }

    #[tokio::test]
    async fn test_security_rejection_surfaces() {
        let source = FakeSource::failing(FetchError::SecurityRejection("private address".into()));
        let pipeline = pipeline(settings(), source);

        let err = pipeline
            .generate(&GenerateRequest::url("https://medium.com/x"), &caller())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SECURITY_REJECTION");
    }

    #[tokio::test]
    async fn test_generator_output_used() {
        let generator = FakeGenerator(Behaviour::Reply(vec![
            "Rust has no garbage collector.".to_string(),
            "  ".to_string(),
            "Ownership rules free memory.".to_string(),
        ]));
        let pipeline = GenerationPipeline::builder(settings(), Arc::new(LocalStore::with_defaults()))
            .fetcher(FakeSource::article())
            .generator(Arc::new(generator))
            .build();

        let response = pipeline.generate(&GenerateRequest::text(ARTICLE), &caller()).await.unwrap();
        assert_eq!(response.generated_by, GeneratedBy::Ai);
        assert_eq!(response.tweets.len(), 2);
        assert_eq!(response.tweets[1].content, "Ownership rules free memory.");
        assert_eq!(response.tweets[1].total, 2);
    }

    #[tokio::test]
    async fn test_generator_failure_falls_back() {
        let pipeline = GenerationPipeline::builder(settings(), Arc::new(LocalStore::with_defaults()))
            .fetcher(FakeSource::article())
            .generator(Arc::new(FakeGenerator(Behaviour::Fail)))
            .build();

        let response = pipeline.generate(&GenerateRequest::text(ARTICLE), &caller()).await.unwrap();
        assert_eq!(response.generated_by, GeneratedBy::Segmenter);
        assert!(!response.tweets.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_generator_output_falls_back() {
        let generator = FakeGenerator(Behaviour::Reply(vec!["x".repeat(400)]));
        let pipeline = GenerationPipeline::builder(settings(), Arc::new(LocalStore::with_defaults()))
            .fetcher(FakeSource::article())
            .generator(Arc::new(generator))
            .build();

        let response = pipeline.generate(&GenerateRequest::text(ARTICLE), &caller()).await.unwrap();
        assert_eq!(response.generated_by, GeneratedBy::Segmenter);
        assert!(response.tweets.iter().all(|t| t.char_count <= 280));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_timeout_falls_back() {
        let mut settings = settings();
        settings.ai_timeout = Duration::from_secs(5);
        let pipeline = GenerationPipeline::builder(settings, Arc::new(LocalStore::with_defaults()))
            .fetcher(FakeSource::article())
            .generator(Arc::new(FakeGenerator(Behaviour::Hang)))
            .build();

        let response = pipeline.generate(&GenerateRequest::text(ARTICLE), &caller()).await.unwrap();
        assert_eq!(response.generated_by, GeneratedBy::Segmenter);
    }

    #[tokio::test]
    async fn test_premium_bypasses_quota() {
        let source = FakeSource::article();
        let pipeline = pipeline(settings().free_tier(1, 1), source.clone());
        let ctx = caller().with_email("pat@example.com");

        let status = pipeline.grant_premium(&ctx, "monthly", 30).await.unwrap();
        assert!(status.has_premium);

        for i in 0..3 {
            let url = format!("https://substack.com/p/{i}");
            pipeline.generate(&GenerateRequest::url(url), &ctx).await.unwrap();
        }
        assert_eq!(source.calls(), 3);

        // Usage is still recorded for premium callers
        assert_eq!(pipeline.usage(&ctx).await.unwrap().daily.combined, 3);
    }

    #[tokio::test]
    async fn test_rate_limit_gate() {
        let settings = settings()
            .enforce_rate_limit(true)
            .rate_limit_requests(2, Duration::from_secs(3600));
        let pipeline = pipeline(settings, FakeSource::article());

        for _ in 0..2 {
            pipeline.generate(&GenerateRequest::text(ARTICLE), &caller()).await.unwrap();
        }
        let err = pipeline
            .generate(&GenerateRequest::text(ARTICLE), &caller())
            .await
            .unwrap_err();

        let GenerateError::RateLimited { decision } = &err else {
            panic!("Expected RateLimited, got {err:?}");
        };
        assert!(!decision.allowed);
        assert_eq!(decision.used, 3);
        let failure = err.to_failure();
        assert_eq!(failure.code, "RATE_LIMITED");
        assert!(failure.retry_after.is_some());

        // Rejected requests do not reserve usage
        assert_eq!(pipeline.usage(&caller()).await.unwrap().daily.ip_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_window_resets() {
        let settings = settings().rate_limit_requests(5, Duration::from_secs(60));
        let pipeline = pipeline(settings, FakeSource::article());

        for _ in 0..5 {
            assert!(pipeline.check_rate_limit("10.1.1.1").await.allowed);
        }
        assert!(!pipeline.check_rate_limit("10.1.1.1").await.allowed);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(pipeline.check_rate_limit("10.1.1.1").await.allowed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rate_limit_checks() {
        let settings = settings().rate_limit_requests(5, Duration::from_secs(3600));
        let pipeline = Arc::new(pipeline(settings, FakeSource::article()));

        let barrier = Arc::new(tokio::sync::Barrier::new(6));
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..6 {
            let pipeline = pipeline.clone();
            let barrier = barrier.clone();
            tasks.spawn(async move {
                barrier.wait().await;
                pipeline.check_rate_limit("192.0.2.50").await
            });
        }

        let mut allowed = 0;
        let mut rejected = Vec::new();
        while let Some(decision) = tasks.join_next().await {
            let decision = decision.unwrap();
            if decision.allowed {
                allowed += 1;
            } else {
                rejected.push(decision);
            }
        }
        assert_eq!(allowed, 5);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].remaining, 0);
    }

    #[tokio::test]
    async fn test_invalid_requests_consume_nothing() {
        let source = FakeSource::article();
        let pipeline = pipeline(settings(), source.clone());

        let err = pipeline
            .generate(&GenerateRequest::default(), &caller())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
        assert_eq!(pipeline.usage(&caller()).await.unwrap().daily.ip_count, 0);
        assert_eq!(source.calls(), 0);
    }
}
