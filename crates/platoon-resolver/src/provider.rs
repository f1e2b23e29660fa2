//! The metadata provider seam.
//!
//! The resolver never talks to repositories itself. It asks a
//! [`MetadataProvider`] for the descriptor matching a module and requirement,
//! and treats "not found" and "failed" as data rather than errors.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use platoon_core::descriptor::{ModuleCatalog, ModuleDescriptor};
use platoon_core::identity::ModuleIdentity;
use platoon_core::requirement::VersionRequirement;
use platoon_core::version::VersionScheme;

/// Outcome of a single lookup: a descriptor, `None` when nothing matches, or
/// a provider failure.
pub type LookupResult = Result<Option<Arc<ModuleDescriptor>>, LookupError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("metadata for {module} is unavailable: {message}")]
    Unavailable { module: String, message: String },
}

/// Source of module descriptors.
///
/// Exact and preferred requirements return the matching version. Ranges
/// return the highest available version inside the range.
pub trait MetadataProvider: Send + Sync + 'static {
    fn lookup(
        &self,
        id: &ModuleIdentity,
        requirement: &VersionRequirement,
    ) -> impl Future<Output = LookupResult> + Send;
}

/// Provider backed by descriptors loaded from module catalogs.
#[derive(Debug)]
pub struct InMemoryProvider {
    modules: HashMap<ModuleIdentity, Vec<Arc<ModuleDescriptor>>>,
    scheme: Arc<dyn VersionScheme>,
}

impl InMemoryProvider {
    pub fn new(catalog: ModuleCatalog, scheme: Arc<dyn VersionScheme>) -> Self {
        let mut modules: HashMap<ModuleIdentity, Vec<Arc<ModuleDescriptor>>> = HashMap::new();
        for descriptor in catalog.module {
            modules
                .entry(descriptor.identity().clone())
                .or_default()
                .push(Arc::new(descriptor));
        }
        Self { modules, scheme }
    }

    /// Published versions of a module, in catalog order.
    pub fn versions(&self, id: &ModuleIdentity) -> Vec<&str> {
        self.modules
            .get(id)
            .map(|ds| ds.iter().map(|d| d.version()).collect())
            .unwrap_or_default()
    }

    pub fn find(
        &self,
        id: &ModuleIdentity,
        requirement: &VersionRequirement,
    ) -> Option<Arc<ModuleDescriptor>> {
        let published = self.modules.get(id)?;
        let scheme = self.scheme.as_ref();
        match requirement {
            VersionRequirement::Exact(v) | VersionRequirement::Prefer(v) => published
                .iter()
                .find(|d| scheme.same(d.version(), v))
                .cloned(),
            VersionRequirement::Range(range) => {
                let matching: Vec<&str> = published
                    .iter()
                    .map(|d| d.version())
                    .filter(|v| range.contains(scheme, v))
                    .collect();
                let best = scheme.max_of(&matching)?;
                published.iter().find(|d| d.version() == best).cloned()
            }
        }
    }
}

impl MetadataProvider for InMemoryProvider {
    fn lookup(
        &self,
        id: &ModuleIdentity,
        requirement: &VersionRequirement,
    ) -> impl Future<Output = LookupResult> + Send {
        std::future::ready(Ok(self.find(id, requirement)))
    }
}
