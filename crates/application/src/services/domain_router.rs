use ferrous_forwarder_domain::question::strip_trailing_dots;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ports::Upstream;

/// Ordered candidate upstreams for one question.
pub type RouteList = SmallVec<[Arc<dyn Upstream>; 4]>;

/// Longest-suffix routing over a table fixed at startup.
///
/// The `""` key is the default route. Names equal to a loop domain (or
/// falling under one before a more specific route matches) never go to an
/// HTTPS upstream; when that leaves nothing the classic fallback is used.
pub struct DomainRouter {
    routes: FxHashMap<String, Arc<[Arc<dyn Upstream>]>>,
    loop_domains: Vec<String>,
    fallback: Arc<dyn Upstream>,
}

impl DomainRouter {
    pub fn new(
        routes: impl IntoIterator<Item = (String, Vec<Arc<dyn Upstream>>)>,
        loop_domains: Vec<String>,
        fallback: Arc<dyn Upstream>,
    ) -> Self {
        let routes = routes
            .into_iter()
            .map(|(suffix, upstreams)| {
                (
                    strip_trailing_dots(&suffix).to_ascii_lowercase(),
                    Arc::from(upstreams),
                )
            })
            .collect();
        let loop_domains = loop_domains
            .into_iter()
            .map(|d| strip_trailing_dots(&d).to_ascii_lowercase())
            .collect();
        Self {
            routes,
            loop_domains,
            fallback,
        }
    }

    pub fn determine_route(&self, name: &str) -> RouteList {
        let lowered = strip_trailing_dots(name).to_ascii_lowercase();
        let mut domain = lowered.as_str();
        let mut avoid_loop = false;
        let mut matched = None;

        while !domain.is_empty() {
            if self.loop_domains.iter().any(|d| d == domain) {
                avoid_loop = true;
            }
            if let Some(upstreams) = self.routes.get(domain) {
                matched = Some(upstreams);
                break;
            }
            match domain.find('.') {
                Some(idx) => domain = &domain[idx + 1..],
                None => break,
            }
        }

        let candidates: RouteList = match matched.or_else(|| self.routes.get("")) {
            Some(upstreams) => upstreams.iter().cloned().collect(),
            None => {
                warn!(domain = %lowered, "No route and no default route configured");
                RouteList::new()
            }
        };

        if !avoid_loop {
            return candidates;
        }

        let direct: RouteList = candidates
            .into_iter()
            .filter(|upstream| !upstream.uses_https())
            .collect();
        if direct.is_empty() {
            debug!(
                domain = %lowered,
                fallback = self.fallback.name(),
                "Loop domain has no direct upstream, using fallback"
            );
            let mut fallback = RouteList::new();
            fallback.push(Arc::clone(&self.fallback));
            fallback
        } else {
            direct
        }
    }

    pub fn loop_domains(&self) -> &[String] {
        &self.loop_domains
    }
}
