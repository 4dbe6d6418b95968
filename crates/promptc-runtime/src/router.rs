//! The processing router.
//!
//! For each request the router asks the quality analyser first, then masks
//! sensitive data in every field. A reliable request is compiled locally
//! and never reaches a backend. Otherwise the
//! provider chain is walked once, in order, until one provider answers;
//! every attempt runs under a timeout bounded by both the per-attempt limit
//! and what is left of the request deadline.
//!
//! Only failover exhaustion (and the size guard) is visible to the caller.
//! Individual provider failures are logged, audited and skipped.

use crate::error::{ProviderError, RouterError};
use crate::health::NodeHealth;
use crate::metrics::MetricsStore;
use crate::provider::{Provider, ProviderTier};
use promptc_audit::{AuditCategory, AuditEvent, AuditHub, AuditResult};
use promptc_core::{
    Analysis, Formatter, HeuristicAnalyzer, MarkdownFormatter, Masker, PromptRequest,
    QualityAnalyzer, RegexMasker, RouterConfig, mask_request,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const ENGINE_ACTOR: &str = "promptc-engine";

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutePath {
    /// Good enough as written; compiled locally.
    Bypass,
    /// No provider configured; compiled locally at lower quality.
    Degraded,
    /// Answered by a provider.
    Provider,
}

/// One provider attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub provider: String,
    pub latency_ms: u64,
    /// `None` on success.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "error_message")]
    pub error: Option<ProviderError>,
}

fn error_message<S: serde::Serializer>(
    error: &Option<ProviderError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// A successful routing result.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub text: String,
    pub path: RoutePath,
    /// Provider that produced `text`, when `path` is `Provider`.
    pub provider: Option<String>,
    pub analysis: Analysis,
    pub attempts: Vec<Attempt>,
    pub latency_ms: u64,
}

pub struct Router {
    analyzer: Arc<dyn QualityAnalyzer>,
    formatter: Arc<dyn Formatter>,
    masker: Arc<dyn Masker>,
    providers: Vec<Arc<dyn Provider>>,
    metrics: MetricsStore,
    health: NodeHealth,
    hub: AuditHub,
    config: RouterConfig,
    node_name: String,
}

impl Router {
    /// Router with the default analyser, masker and formatter and an empty
    /// chain.
    pub fn new(
        config: RouterConfig,
        metrics: MetricsStore,
        health: NodeHealth,
        hub: AuditHub,
    ) -> Self {
        Self {
            analyzer: Arc::new(HeuristicAnalyzer),
            formatter: Arc::new(MarkdownFormatter),
            masker: Arc::new(RegexMasker),
            providers: Vec::new(),
            metrics,
            health,
            hub,
            config,
            node_name: "local-node".to_string(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn QualityAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_masker(mut self, masker: Arc<dyn Masker>) -> Self {
        self.masker = masker;
        self
    }

    /// Set the failover chain. Order is attempt order.
    pub fn with_providers(mut self, providers: Vec<Arc<dyn Provider>>) -> Self {
        self.providers = providers;
        self
    }

    /// Name attributed to local work in audit records.
    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }

    /// Route one request.
    pub async fn process(
        &self,
        request: &PromptRequest,
        correlation_id: Option<&str>,
    ) -> Result<ProcessOutcome, RouterError> {
        let started = Instant::now();
        let cid = correlation_id.map(str::to_string);

        let size = request.byte_len();
        if size > self.config.max_prompt_bytes {
            let limit = self.config.max_prompt_bytes;
            tracing::warn!(size, limit, "Rejected oversized prompt");
            self.hub
                .publish(
                    AuditEvent::builder(AuditCategory::Security, "PROMPT_REJECTED", ENGINE_ACTOR)
                        .result(AuditResult::Fail)
                        .detail(format!("{} bytes exceeds {} byte limit", size, limit))
                        .correlation_id(cid.clone())
                        .build(),
                )
                .await;
            return Err(RouterError::PromptTooLarge {
                size,
                limit: self.config.max_prompt_bytes,
            });
        }

        self.hub
            .publish(
                AuditEvent::builder(AuditCategory::Inference, "PIPELINE_START", ENGINE_ACTOR)
                    .resource(self.expected_actor())
                    .correlation_id(cid.clone())
                    .build(),
            )
            .await;

        let mut analysis = self.analyzer.analyze(request);

        let (masked, detected) = mask_request(self.masker.as_ref(), request);
        if !detected.is_empty() {
            let kinds = detected.join(", ");
            tracing::warn!(kinds = %kinds, "Masked sensitive data in prompt");
            analysis
                .issues
                .insert(0, format!("sensitive data masked ({})", kinds));
            self.hub
                .publish(
                    AuditEvent::builder(AuditCategory::Security, "PII_MASKED", ENGINE_ACTOR)
                        .result(AuditResult::Warn)
                        .detail(kinds)
                        .correlation_id(cid.clone())
                        .build(),
                )
                .await;
        }
        let request = &masked;

        if analysis.is_reliable {
            let text = self.formatter.format(request);
            let latency_ms = elapsed_ms(started);
            self.metrics.record(true, latency_ms, estimate_tokens(&text), false);
            self.hub
                .publish(
                    AuditEvent::builder(AuditCategory::Inference, "BYPASS", ENGINE_ACTOR)
                        .latency_ms(latency_ms)
                        .detail(format!("score {} needs no backend", analysis.score))
                        .correlation_id(cid)
                        .build(),
                )
                .await;
            return Ok(ProcessOutcome {
                text,
                path: RoutePath::Bypass,
                provider: None,
                analysis,
                attempts: Vec::new(),
                latency_ms,
            });
        }

        if self.providers.is_empty() {
            tracing::warn!(
                score = analysis.score,
                "No providers configured, returning local compilation"
            );
            let text = self.formatter.format(request);
            let latency_ms = elapsed_ms(started);
            self.metrics.record(true, latency_ms, estimate_tokens(&text), false);
            self.hub
                .publish(
                    AuditEvent::builder(AuditCategory::Inference, "DEGRADED", ENGINE_ACTOR)
                        .result(AuditResult::Warn)
                        .latency_ms(latency_ms)
                        .detail(format!("no providers; score {}", analysis.score))
                        .correlation_id(cid)
                        .build(),
                )
                .await;
            return Ok(ProcessOutcome {
                text,
                path: RoutePath::Degraded,
                provider: None,
                analysis,
                attempts: Vec::new(),
                latency_ms,
            });
        }

        let deadline = started + self.config.request_timeout();
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let attempt_started = Instant::now();
            let result = self
                .attempt(provider.as_ref(), request, &analysis.issues, deadline)
                .await;
            let attempt_ms = elapsed_ms(attempt_started);

            match result {
                Ok(text) => {
                    attempts.push(Attempt {
                        provider: provider.name().to_string(),
                        latency_ms: attempt_ms,
                        error: None,
                    });
                    let latency_ms = elapsed_ms(started);
                    let tokens = estimate_tokens(&text);
                    self.metrics.record(
                        true,
                        latency_ms,
                        tokens,
                        provider.tier() == ProviderTier::Cloud,
                    );
                    tracing::info!(
                        provider = provider.name(),
                        latency_ms,
                        tokens,
                        attempts = attempts.len(),
                        "Provider answered"
                    );
                    let event = AuditEvent::builder(
                        AuditCategory::Inference,
                        "PIPELINE_OK",
                        provider.name(),
                    )
                    .latency_ms(latency_ms)
                    .detail(format!("{} tokens", tokens))
                    .correlation_id(cid)
                    .build();
                    self.hub.publish(event).await;
                    return Ok(ProcessOutcome {
                        text,
                        path: RoutePath::Provider,
                        provider: Some(provider.name().to_string()),
                        analysis,
                        attempts,
                        latency_ms,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "Provider failed, trying next"
                    );
                    let event = AuditEvent::builder(
                        AuditCategory::Inference,
                        "PROVIDER_FAILED",
                        provider.name(),
                    )
                    .result(AuditResult::Warn)
                    .latency_ms(attempt_ms)
                    .detail(e.to_string())
                    .correlation_id(cid.clone())
                    .build();
                    self.hub.publish(event).await;
                    attempts.push(Attempt {
                        provider: provider.name().to_string(),
                        latency_ms: attempt_ms,
                        error: Some(e),
                    });
                }
            }
        }

        let latency_ms = elapsed_ms(started);
        self.metrics.record(false, latency_ms, 0, false);
        tracing::error!(attempts = attempts.len(), "Every provider failed");
        self.hub
            .publish(
                AuditEvent::builder(AuditCategory::Inference, "PIPELINE_EXHAUSTED", ENGINE_ACTOR)
                    .result(AuditResult::Fail)
                    .latency_ms(latency_ms)
                    .detail(format!("{} providers failed", attempts.len()))
                    .correlation_id(cid)
                    .build(),
            )
            .await;
        Err(RouterError::Exhausted { attempts })
    }

    async fn attempt(
        &self,
        provider: &dyn Provider,
        request: &PromptRequest,
        issues: &[String],
        deadline: Instant,
    ) -> Result<String, ProviderError> {
        let budget = self
            .config
            .attempt_timeout()
            .min(deadline.saturating_duration_since(Instant::now()));
        if budget.is_zero() {
            return Err(ProviderError::Timeout(Duration::ZERO));
        }

        let text = tokio::time::timeout(budget, provider.transform(request, issues))
            .await
            .map_err(|_| ProviderError::Timeout(budget))??;

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }

    /// Who is expected to serve the next request, for the audit trail.
    fn expected_actor(&self) -> String {
        let has_local = self
            .providers
            .iter()
            .any(|p| p.tier() == ProviderTier::Local);
        if has_local && self.health.is_online() {
            return self.node_name.clone();
        }
        self.providers
            .iter()
            .find(|p| p.tier() == ProviderTier::Cloud)
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| "local-compiler".to_string())
    }
}

/// Output size estimate used for metrics: one token per four bytes.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() / 4) as u64
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider with a fixed answer that counts its calls and records the
    /// global call order.
    struct StubProvider {
        name: String,
        tier: ProviderTier,
        answer: Result<String, ProviderError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        order: Arc<Mutex<Vec<String>>>,
    }

    impl StubProvider {
        fn new(
            name: &str,
            tier: ProviderTier,
            answer: Result<&str, ProviderError>,
            order: &Arc<Mutex<Vec<String>>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                tier,
                answer: answer.map(str::to_string),
                delay: None,
                calls: AtomicUsize::new(0),
                order: order.clone(),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn tier(&self) -> ProviderTier {
            self.tier
        }

        async fn transform(
            &self,
            _request: &PromptRequest,
            _issues: &[String],
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(self.name.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.answer.clone()
        }
    }

    /// Provider that fails the test if it is ever called.
    struct ForbiddenProvider;

    #[async_trait]
    impl Provider for ForbiddenProvider {
        fn name(&self) -> &str {
            "forbidden"
        }

        fn tier(&self) -> ProviderTier {
            ProviderTier::Cloud
        }

        async fn transform(
            &self,
            _request: &PromptRequest,
            _issues: &[String],
        ) -> Result<String, ProviderError> {
            panic!("provider must not be called for a reliable request");
        }
    }

    /// Cloud provider that keeps what it was sent.
    #[derive(Default)]
    struct CapturingProvider {
        seen: Mutex<Option<(PromptRequest, Vec<String>)>>,
    }

    #[async_trait]
    impl Provider for CapturingProvider {
        fn name(&self) -> &str {
            "capture"
        }

        fn tier(&self) -> ProviderTier {
            ProviderTier::Cloud
        }

        async fn transform(
            &self,
            request: &PromptRequest,
            issues: &[String],
        ) -> Result<String, ProviderError> {
            *self.seen.lock().unwrap() = Some((request.clone(), issues.to_vec()));
            Ok("optimised".into())
        }
    }

    /// Analyser with a fixed verdict.
    struct FixedAnalyzer(bool);

    impl QualityAnalyzer for FixedAnalyzer {
        fn analyze(&self, _request: &PromptRequest) -> Analysis {
            Analysis {
                score: if self.0 { 100 } else { 0 },
                is_reliable: self.0,
                issues: Vec::new(),
            }
        }
    }

    /// Masker that hides one literal word.
    struct WordMasker(&'static str);

    impl Masker for WordMasker {
        fn mask(&self, text: &str) -> promptc_core::Masked {
            promptc_core::Masked {
                text: text.replace(self.0, "[HIDDEN]"),
                detected: if text.contains(self.0) { vec!["WORD"] } else { Vec::new() },
            }
        }
    }

    fn router(providers: Vec<Arc<dyn Provider>>) -> (Router, MetricsStore, AuditHub) {
        let metrics = MetricsStore::in_memory();
        let hub = AuditHub::in_memory();
        let router = Router::new(
            RouterConfig::default(),
            metrics.clone(),
            NodeHealth::offline(),
            hub.clone(),
        )
        .with_providers(providers)
        .with_node_name("mac-mini");
        (router, metrics, hub)
    }

    fn reliable_request() -> PromptRequest {
        PromptRequest {
            role: "Senior Cloud Architect".into(),
            context: "Migrating a monolith to managed services".into(),
            task: "Produce a phased migration plan covering data, compute and networking."
                .into(),
            constraints: vec!["no downtime".into(), "budget under 10k".into()],
            ..Default::default()
        }
    }

    fn failure() -> ProviderError {
        ProviderError::Transport("connection refused".into())
    }

    fn actions(hub: &AuditHub) -> Vec<String> {
        hub.history()
            .iter()
            .filter_map(|line| line.split_whitespace().nth(2).map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_reliable_request_bypasses_providers() {
        let (router, metrics, hub) = router(vec![Arc::new(ForbiddenProvider)]);

        let outcome = router.process(&reliable_request(), None).await.unwrap();
        assert_eq!(outcome.path, RoutePath::Bypass);
        assert!(outcome.analysis.is_reliable);
        assert!(outcome.text.starts_with("### ROLE\nSenior Cloud Architect"));

        let snap = metrics.snapshot();
        assert_eq!(snap.inference_success, 1);
        assert_eq!(snap.cloud_calls, 0);
        assert_eq!(actions(&hub), vec!["PIPELINE_START", "BYPASS"]);
    }

    #[tokio::test]
    async fn test_empty_chain_degrades_to_formatter() {
        let (router, metrics, hub) = router(Vec::new());
        let request = PromptRequest::with_task("short");

        let outcome = router.process(&request, None).await.unwrap();
        assert_eq!(outcome.path, RoutePath::Degraded);
        assert!(!outcome.analysis.is_reliable);
        assert_eq!(outcome.text, "### TASK\nshort");
        assert!(outcome.attempts.is_empty());
        assert_eq!(metrics.snapshot().inference_success, 1);
        assert!(hub.history().iter().any(|l| l.contains("DEGRADED") && l.contains("result=WARN")));
    }

    #[tokio::test]
    async fn test_kth_provider_wins() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = StubProvider::new("ollama", ProviderTier::Local, Err(failure()), &order);
        let second = StubProvider::new("gemini", ProviderTier::Cloud, Err(failure()), &order);
        let third = StubProvider::new("openrouter", ProviderTier::Cloud, Ok("optimised"), &order);
        let fourth = StubProvider::new("spare", ProviderTier::Cloud, Ok("unused"), &order);

        let (router, metrics, hub) = router(vec![
            first.clone(),
            second.clone(),
            third.clone(),
            fourth.clone(),
        ]);

        let outcome = router
            .process(&PromptRequest::with_task("short"), Some("req-1"))
            .await
            .unwrap();

        assert_eq!(outcome.text, "optimised");
        assert_eq!(outcome.path, RoutePath::Provider);
        assert_eq!(outcome.provider.as_deref(), Some("openrouter"));
        assert_eq!(outcome.attempts.len(), 3);
        assert!(outcome.attempts[2].error.is_none());

        assert_eq!(
            *order.lock().unwrap(),
            vec!["ollama".to_string(), "gemini".to_string(), "openrouter".to_string()]
        );
        assert_eq!((first.calls(), second.calls(), third.calls()), (1, 1, 1));
        assert_eq!(fourth.calls(), 0);

        let snap = metrics.snapshot();
        assert_eq!(snap.inference_success, 1);
        assert_eq!(snap.cloud_calls, 1);
        assert_eq!(
            actions(&hub),
            vec!["PIPELINE_START", "PROVIDER_FAILED", "PROVIDER_FAILED", "PIPELINE_OK"]
        );
    }

    #[tokio::test]
    async fn test_local_success_is_not_cloud() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let local = StubProvider::new("ollama", ProviderTier::Local, Ok("local answer"), &order);
        let (router, metrics, _hub) = router(vec![local]);

        router.process(&PromptRequest::with_task("short"), None).await.unwrap();
        assert_eq!(metrics.snapshot().cloud_calls, 0);
    }

    #[tokio::test]
    async fn test_exhaustion_is_an_error() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let a = StubProvider::new("a", ProviderTier::Local, Err(failure()), &order);
        let b = StubProvider::new("b", ProviderTier::Cloud, Ok("   "), &order);
        let (router, metrics, hub) = router(vec![a, b]);

        let err = router
            .process(&PromptRequest::with_task("short"), None)
            .await
            .unwrap_err();
        match err {
            RouterError::Exhausted { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[1].error, Some(ProviderError::EmptyResponse));
            }
            other => panic!("unexpected error: {other}"),
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.inference_fail, 1);
        assert_eq!(snap.inference_success, 0);
        assert!(
            hub.history()
                .iter()
                .any(|l| l.contains("PIPELINE_EXHAUSTED") && l.contains("result=FAIL"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out_and_fails_over() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let slow = Arc::new(StubProvider {
            name: "slow".into(),
            tier: ProviderTier::Local,
            answer: Ok("late".into()),
            delay: Some(Duration::from_secs(120)),
            calls: AtomicUsize::new(0),
            order: order.clone(),
        });
        let fast = StubProvider::new("fast", ProviderTier::Cloud, Ok("on time"), &order);
        let (router, _metrics, _hub) = router(vec![slow, fast]);

        let outcome = router
            .process(&PromptRequest::with_task("short"), None)
            .await
            .unwrap();
        assert_eq!(outcome.text, "on time");
        assert!(matches!(
            outcome.attempts[0].error,
            Some(ProviderError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_prompt_is_rejected() {
        let (router, metrics, hub) = router(vec![Arc::new(ForbiddenProvider)]);
        let request = PromptRequest::with_task("x".repeat(100 * 1024 + 1));

        let err = router.process(&request, None).await.unwrap_err();
        assert!(matches!(err, RouterError::PromptTooLarge { .. }));
        assert_eq!(metrics.snapshot().inference_count, 0);
        assert_eq!(actions(&hub), vec!["PROMPT_REJECTED"]);
    }

    #[tokio::test]
    async fn test_sensitive_data_never_reaches_a_provider() {
        let capture = Arc::new(CapturingProvider::default());
        let (router, _metrics, hub) = router(vec![capture.clone()]);

        let mut request = PromptRequest::with_task("Reply to ana@example.com about 10.0.0.7");
        request.constraints = vec!["cc boss@example.com".into()];
        let outcome = router.process(&request, Some("req-9")).await.unwrap();

        let (sent, issues) = capture.seen.lock().unwrap().clone().unwrap();
        assert_eq!(sent.task, "Reply to [EMAIL_HIDDEN] about [IP_HIDDEN]");
        assert_eq!(sent.constraints, vec!["cc [EMAIL_HIDDEN]".to_string()]);
        assert_eq!(issues[0], "sensitive data masked (EMAIL, IP_ADDRESS)");
        assert_eq!(outcome.analysis.issues[0], issues[0]);

        assert_eq!(actions(&hub), vec!["PIPELINE_START", "PII_MASKED", "PIPELINE_OK"]);
        assert!(
            hub.history()
                .iter()
                .any(|l| l.contains("SECURITY") && l.contains("result=WARN"))
        );
    }

    #[tokio::test]
    async fn test_local_compilation_is_masked() {
        let (router, _metrics, _hub) = router(Vec::new());
        let mut request = PromptRequest::with_task("Summarise the ticket from {{who}}");
        request.variables.insert("who".into(), "joe@example.com".into());

        let outcome = router.process(&request, None).await.unwrap();
        assert_eq!(outcome.text, "### TASK\nSummarise the ticket from [EMAIL_HIDDEN]");
    }

    #[tokio::test]
    async fn test_analyzer_and_masker_are_replaceable() {
        let capture = Arc::new(CapturingProvider::default());
        let (router, _metrics, hub) = router(vec![capture.clone()]);
        let router = router
            .with_analyzer(Arc::new(FixedAnalyzer(false)))
            .with_masker(Arc::new(WordMasker("hunter2")));

        // long enough to pass the heuristic analyser, which is replaced here
        let mut request = reliable_request();
        request.task = "Rotate the password hunter2 across every environment today.".into();
        let outcome = router.process(&request, None).await.unwrap();

        assert_eq!(outcome.path, RoutePath::Provider);
        let (sent, issues) = capture.seen.lock().unwrap().clone().unwrap();
        assert_eq!(sent.task, "Rotate the password [HIDDEN] across every environment today.");
        assert_eq!(issues, vec!["sensitive data masked (WORD)".to_string()]);
        assert!(actions(&hub).contains(&"PII_MASKED".to_string()));
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("abc"), 0);
    }
}
