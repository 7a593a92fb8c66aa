use ferrous_forwarder_domain::{DomainError, Question};
use hickory_proto::op::{Message, Query};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::dns_message::{question_from_query, with_single_query};
use crate::ports::{Exchanged, ResponseCachePort};
use crate::services::{DomainRouter, SubnetAnnotator};

/// Resolves every question of an inbound query through cache and upstreams.
pub struct DispatchQueryUseCase {
    cache: Arc<dyn ResponseCachePort>,
    router: Arc<DomainRouter>,
    annotator: Arc<SubnetAnnotator>,
    attempt_timeout: Duration,
}

impl DispatchQueryUseCase {
    pub fn new(
        cache: Arc<dyn ResponseCachePort>,
        router: Arc<DomainRouter>,
        annotator: Arc<SubnetAnnotator>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            router,
            annotator,
            attempt_timeout,
        }
    }

    /// Returns one response per answered question, in question order, each
    /// carrying the request's transaction ID. Questions no upstream could
    /// answer produce nothing.
    pub async fn execute(&self, request: &Message) -> Vec<Message> {
        let mut request = request.clone();
        self.annotator.annotate(&mut request);

        let total = request.queries().len();
        let mut replies = Vec::with_capacity(total);

        for (index, query) in request.queries().iter().enumerate() {
            match self.resolve_question(&request, query).await {
                Ok(response) => replies.push(response),
                Err(e) => warn!(
                    id = request.id(),
                    position = index + 1,
                    total,
                    error = %e,
                    "Dropping unanswered question"
                ),
            }
        }

        replies
    }

    /// Answers one question of `request` from cache or upstreams. `request` is
    /// forwarded as given, minus its other questions.
    pub async fn resolve_question(
        &self,
        request: &Message,
        query: &Query,
    ) -> Result<Message, DomainError> {
        let request_id = request.id();
        let question = question_from_query(query);

        if let Some(mut cached) = self.cache.get(&question) {
            cached.set_id(request_id);
            debug!(
                id = request_id,
                domain = %question.name,
                qtype = question.qtype,
                "Query answered from cache"
            );
            return Ok(cached);
        }

        let sub_query = with_single_query(request, query);
        let exchanged = self.race_upstreams(&question, sub_query).await?;
        self.cache.put(&question, &exchanged.response);

        let mut response = exchanged.response;
        response.set_id(request_id);
        Ok(response)
    }

    /// Tries each routed upstream in order, giving every attempt its own
    /// timeout. A timed-out attempt keeps running; its late result is drained
    /// in the background and discarded.
    async fn race_upstreams(
        &self,
        question: &Question,
        query: Message,
    ) -> Result<Exchanged, DomainError> {
        let route = self.router.determine_route(question.routing_name());
        let query = Arc::new(query);

        for (position, upstream) in route.iter().enumerate() {
            let attempt_upstream = Arc::clone(upstream);
            let attempt_query = Arc::clone(&query);
            let mut attempt =
                tokio::spawn(async move { attempt_upstream.exchange(&attempt_query).await });

            tokio::select! {
                joined = &mut attempt => match joined {
                    Ok(Ok(exchanged)) => {
                        debug!(
                            domain = %question.name,
                            qtype = question.qtype,
                            upstream = upstream.name(),
                            elapsed_ms = exchanged.elapsed.as_millis() as u64,
                            "Query answered by upstream"
                        );
                        return Ok(exchanged);
                    }
                    Ok(Err(e)) => {
                        warn!(
                            domain = %question.name,
                            upstream = upstream.name(),
                            error = %e,
                            position,
                            "Upstream attempt failed, trying next"
                        );
                    }
                    Err(e) => {
                        warn!(
                            domain = %question.name,
                            upstream = upstream.name(),
                            error = %e,
                            position,
                            "Upstream attempt aborted, trying next"
                        );
                    }
                },
                _ = tokio::time::sleep(self.attempt_timeout) => {
                    warn!(
                        domain = %question.name,
                        upstream = upstream.name(),
                        timeout_ms = self.attempt_timeout.as_millis() as u64,
                        position,
                        "Upstream attempt timed out, trying next"
                    );
                    let upstream_name = upstream.name().to_string();
                    tokio::spawn(async move {
                        match attempt.await {
                            Ok(Ok(late)) => debug!(
                                upstream = %upstream_name,
                                elapsed_ms = late.elapsed.as_millis() as u64,
                                "Discarded late upstream response"
                            ),
                            Ok(Err(e)) => debug!(
                                upstream = %upstream_name,
                                error = %e,
                                "Late upstream attempt failed"
                            ),
                            Err(_) => {}
                        }
                    });
                }
            }
        }

        Err(DomainError::TransportAllServersUnreachable {
            domain: question.name.to_string(),
        })
    }
}
