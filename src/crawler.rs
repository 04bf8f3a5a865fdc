//! Orchestration of a crawl run.
//!
//! A run starts from a seed target. For every target both collectors are asked for its
//! neighbors and the resulting [`Window`] is saved before the next target is chosen. In
//! [`CrawlMode::Coalescing`] the next target comes from the frontier of the stored graph, and the
//! run ends only when the frontier is exhausted or the optional target cap is reached.
//!
//! A target that cannot be resolved, or whose sources fail, is still saved as an empty window so
//! its node is stamped and never selected again. Storage failures end the run.

use crate::Result;
use crate::collect::{DependencyCollector, DependentsCollector, ManifestQueryClient, PageFetcher, ProviderResult};
use crate::graph::{GraphBackend, GraphStore, Window};
use crate::identity::RepositoryIdentity;
use core::fmt::{Display, Formatter};

const LOG_TARGET: &str = "   crawler";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Crawl the seed target only.
    Seeded,

    /// Keep crawling untargeted nodes from the stored graph until none are left.
    Coalescing,
}

/// What happened to a single target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The window of the target was collected and saved.
    Crawled { dependencies: usize, dependents: usize },

    /// The target could not be resolved to a repository. It was stamped with an empty window.
    Unresolvable,

    /// A source failed for the target. It was stamped with an empty window.
    Skipped,
}

/// Counters for a crawl run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub crawled: usize,
    pub unresolvable: usize,
    pub skipped: usize,

    /// Edges in the saved windows, including ones that were already stored.
    pub edges: usize,
}

impl CrawlSummary {
    /// Number of targets processed, whatever their outcome.
    #[must_use]
    pub const fn targets(&self) -> usize {
        self.crawled + self.unresolvable + self.skipped
    }

    fn record(&mut self, outcome: CrawlOutcome) {
        match outcome {
            CrawlOutcome::Crawled { dependencies, dependents } => {
                self.crawled += 1;
                self.edges += dependencies + dependents;
            }
            CrawlOutcome::Unresolvable => self.unresolvable += 1,
            CrawlOutcome::Skipped => self.skipped += 1,
        }
    }
}

impl Display for CrawlSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} target(s) crawled, {} unresolvable, {} skipped, {} edge(s) discovered",
            self.crawled, self.unresolvable, self.skipped, self.edges
        )
    }
}

/// Drives the collectors and commits their findings to the graph.
#[derive(Debug)]
pub struct Crawler<F, Q, B> {
    dependents: DependentsCollector<F>,
    dependencies: DependencyCollector<Q>,
    store: GraphStore<B>,
    max_targets: Option<usize>,
}

impl<F, Q, B> Crawler<F, Q, B>
where
    F: PageFetcher + 'static,
    Q: ManifestQueryClient + 'static,
    B: GraphBackend,
{
    pub const fn new(dependents: DependentsCollector<F>, dependencies: DependencyCollector<Q>, store: GraphStore<B>) -> Self {
        Self {
            dependents,
            dependencies,
            store,
            max_targets: None,
        }
    }

    /// Stop a coalescing run after `max_targets` targets.
    #[must_use]
    pub const fn with_max_targets(mut self, max_targets: Option<usize>) -> Self {
        self.max_targets = max_targets;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &GraphStore<B> {
        &self.store
    }

    /// Crawl `seed`, and in coalescing mode everything reachable from the frontier after it.
    pub async fn run(&mut self, seed: RepositoryIdentity, mode: CrawlMode) -> Result<CrawlSummary> {
        if mode == CrawlMode::Coalescing {
            log::warn!(target: LOG_TARGET, "Running in coalesce mode, the crawl may run forever");
        }

        let mut summary = CrawlSummary::default();
        let mut next = Some(seed);

        while let Some(target) = next.take() {
            let outcome = self.crawl_target(&target).await?;
            summary.record(outcome);

            if mode == CrawlMode::Seeded {
                break;
            }

            if let Some(max) = self.max_targets
                && summary.targets() >= max
            {
                log::info!(target: LOG_TARGET, "Reached the limit of {max} target(s)");
                break;
            }

            next = self.store.next_untargeted_node()?;
            if next.is_none() {
                log::info!(target: LOG_TARGET, "No untargeted nodes left, the frontier is exhausted");
            }
        }

        log::info!(target: LOG_TARGET, "Crawl finished: {summary}");
        Ok(summary)
    }

    /// Collect and save the window of a single target.
    pub async fn crawl_target(&mut self, target: &RepositoryIdentity) -> Result<CrawlOutcome> {
        log::info!(target: LOG_TARGET, "Crawling '{target}'");

        let dependencies = match self.dependencies.collect(target).await {
            ProviderResult::Found(dependencies) => dependencies,
            ProviderResult::NotFound => {
                log::warn!(target: LOG_TARGET, "Could not resolve '{target}', marking it as targeted without neighbors");
                self.store.save_window(&Window::empty(target.clone()))?;
                return Ok(CrawlOutcome::Unresolvable);
            }
            ProviderResult::Error(e) => return self.skip(target, "dependencies", &e),
        };

        let dependents = match self.dependents.collect(target).await {
            ProviderResult::Found(dependents) => dependents,
            ProviderResult::NotFound => Default::default(),
            ProviderResult::Error(e) => return self.skip(target, "dependents", &e),
        };

        let window = Window::new(target.clone(), dependencies, dependents);
        self.store.save_window(&window)?;

        log::info!(
            target: LOG_TARGET,
            "Saved '{target}' with {} dependencies and {} dependents",
            window.dependencies.len(),
            window.dependents.len()
        );

        Ok(CrawlOutcome::Crawled {
            dependencies: window.dependencies.len(),
            dependents: window.dependents.len(),
        })
    }

    /// Stamp a target whose sources failed, without saving anything learned about it.
    fn skip(&mut self, target: &RepositoryIdentity, source: &str, error: &ohno::AppError) -> Result<CrawlOutcome> {
        log::warn!(target: LOG_TARGET, "Skipping '{target}', could not collect its {source}: {error}");
        self.store.save_window(&Window::empty(target.clone()))?;
        Ok(CrawlOutcome::Skipped)
    }
}
