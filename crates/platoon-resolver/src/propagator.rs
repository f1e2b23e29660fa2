//! The fixpoint loop: build, resolve, align, repeat until the constraint set
//! stops changing.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use platoon_core::config::ResolutionConfig;
use platoon_core::constraint::Constraint;
use platoon_core::platform::PlatformRules;
use platoon_core::request::ResolutionRequest;
use platoon_core::version::VersionScheme;

use crate::alignment::{align, misaligned};
use crate::builder::{build, BuildOptions};
use crate::error::{ResolutionFailure, ResolveError};
use crate::graph::ResolvedGraph;
use crate::provider::MetadataProvider;
use crate::resolver::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Initial,
    Building,
    Resolving,
    Aligning,
    Iterating,
    Converged,
    Failed,
}

impl fmt::Display for ResolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initial => "initial",
            Self::Building => "building",
            Self::Resolving => "resolving",
            Self::Aligning => "aligning",
            Self::Iterating => "iterating",
            Self::Converged => "converged",
            Self::Failed => "failed",
        })
    }
}

/// Input to one pass of the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iteration {
    /// 1-based.
    pub number: usize,
    pub constraints: BTreeSet<Constraint>,
}

#[derive(Debug)]
pub enum Step {
    Converged(Box<ResolvedGraph>),
    Iterate(Iteration),
    Failed(ResolutionFailure),
}

/// Drives one resolution request to a fixpoint.
pub struct Propagator<P> {
    request: ResolutionRequest,
    rules: PlatformRules,
    initial: BTreeSet<Constraint>,
    provider: Arc<P>,
    config: ResolutionConfig,
    scheme: Arc<dyn VersionScheme>,
    state: ResolverState,
}

impl<P: MetadataProvider> Propagator<P> {
    /// Settings in the request's `[resolution]` table win over `config`.
    pub fn new(request: ResolutionRequest, provider: Arc<P>, config: &ResolutionConfig) -> Self {
        let config = config.with_overrides(&request.resolution);
        Self {
            rules: request.platform_rules(),
            initial: request.initial_constraints(),
            scheme: config.version_scheme.scheme(),
            request,
            provider,
            config,
            state: ResolverState::Initial,
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    /// Iteration 1 carries only the declared constraints.
    pub fn initial_iteration(&self) -> Iteration {
        Iteration {
            number: 1,
            constraints: self.initial.clone(),
        }
    }

    fn transition(&mut self, next: ResolverState) {
        tracing::debug!("Resolver state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, errors: Vec<ResolveError>) -> Step {
        self.transition(ResolverState::Failed);
        Step::Failed(ResolutionFailure::new(errors))
    }

    /// Run one build/resolve/align pass.
    pub async fn step(&mut self, iteration: &Iteration) -> Step {
        tracing::debug!(
            "Iteration {} with {} constraint(s)",
            iteration.number,
            iteration.constraints.len()
        );

        self.transition(ResolverState::Building);
        let options = BuildOptions {
            max_concurrent_lookups: self.config.max_concurrent_lookups,
        };
        let graph = build(
            &self.request.root.id,
            &self.request.dependencies,
            &iteration.constraints,
            &self.rules,
            &self.provider,
            &options,
        )
        .await;

        self.transition(ResolverState::Resolving);
        let resolution = resolve(&graph, &iteration.constraints, self.scheme.as_ref());
        if !resolution.is_ok() {
            return self.fail(resolution.errors);
        }

        self.transition(ResolverState::Aligning);
        let alignment = align(&resolution, &graph, &self.rules, self.scheme.as_ref());
        if !alignment.errors.is_empty() {
            return self.fail(alignment.errors);
        }

        let mut next = self.initial.clone();
        next.extend(alignment.constraints);

        if next == iteration.constraints {
            let errors = misaligned(&resolution, &graph, &alignment.platforms, self.scheme.as_ref());
            if !errors.is_empty() {
                return self.fail(errors);
            }
            self.transition(ResolverState::Converged);
            tracing::debug!(
                "Converged after {} iteration(s): {} module(s)",
                iteration.number,
                resolution.selections.len()
            );
            let resolved =
                ResolvedGraph::from_resolution(&graph, &resolution, alignment.platforms, iteration.number);
            return Step::Converged(Box::new(resolved));
        }

        if iteration.number >= self.config.max_iterations.max(1) {
            let oscillating: Vec<String> = next
                .symmetric_difference(&iteration.constraints)
                .map(ToString::to_string)
                .collect();
            tracing::warn!(
                "Alignment still changing after {} iteration(s)",
                iteration.number
            );
            return self.fail(vec![ResolveError::AlignmentNonConvergence {
                iterations: iteration.number,
                oscillating,
            }]);
        }

        self.transition(ResolverState::Iterating);
        Step::Iterate(Iteration {
            number: iteration.number + 1,
            constraints: next,
        })
    }

    /// Loop until convergence or failure.
    pub async fn run(&mut self) -> Result<ResolvedGraph, ResolutionFailure> {
        let mut iteration = self.initial_iteration();
        loop {
            match self.step(&iteration).await {
                Step::Converged(graph) => return Ok(*graph),
                Step::Iterate(next) => iteration = next,
                Step::Failed(failure) => return Err(failure),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platoon_core::dependency::Dependency;
    use platoon_core::descriptor::ModuleCatalog;
    use platoon_core::identity::ModuleVersion;
    use platoon_core::version::VersionSchemeKind;

    use crate::provider::InMemoryProvider;

    fn provider(catalog: &str) -> Arc<InMemoryProvider> {
        let catalog = ModuleCatalog::parse_toml(catalog).unwrap();
        Arc::new(InMemoryProvider::new(
            catalog,
            VersionSchemeKind::Maven.scheme(),
        ))
    }

    fn request() -> ResolutionRequest {
        ResolutionRequest::new(ModuleVersion::parse("com.example:app:1.0").unwrap())
            .with_dependency(Dependency::exact("org:a", "1.0").unwrap())
    }

    #[tokio::test]
    async fn converges_in_one_iteration_without_platforms() {
        let provider = provider(
            r#"
[[module]]
id = "org:a:1.0"
"#,
        );
        let mut propagator = Propagator::new(request(), provider, &ResolutionConfig::default());
        assert_eq!(propagator.state(), ResolverState::Initial);

        let first = propagator.initial_iteration();
        match propagator.step(&first).await {
            Step::Converged(graph) => {
                assert_eq!(graph.iterations(), 1);
                assert_eq!(graph.len(), 1);
            }
            other => panic!("expected convergence, got {other:?}"),
        }
        assert_eq!(propagator.state(), ResolverState::Converged);
    }

    #[tokio::test]
    async fn missing_module_fails() {
        let provider = provider("");
        let mut propagator = Propagator::new(request(), provider, &ResolutionConfig::default());
        let failure = propagator.run().await.unwrap_err();
        assert_eq!(propagator.state(), ResolverState::Failed);
        assert!(matches!(
            failure.errors[0],
            ResolveError::UnresolvedModule { .. }
        ));
    }

    #[test]
    fn request_overrides_config() {
        let mut request = request();
        request.resolution.max_iterations = Some(3);
        let propagator = Propagator::new(request, provider(""), &ResolutionConfig::default());
        assert_eq!(propagator.config().max_iterations, 3);
        assert_eq!(propagator.initial_iteration().number, 1);
    }
}
