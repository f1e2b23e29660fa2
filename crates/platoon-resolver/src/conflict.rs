//! Version conflict reporting.

use std::fmt;

use serde::Serialize;

use platoon_core::identity::ModuleIdentity;

use crate::resolver::ResolutionReason;

/// Every request whose version lost to the one selected.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// A single request that did not get the version it asked for.
#[derive(Debug, Clone, Serialize)]
pub struct VersionConflict {
    pub module: ModuleIdentity,
    pub requester: String,
    pub requested: String,
    pub resolved: String,
    pub reason: ResolutionReason,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: VersionConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Conflicts for one module.
    pub fn for_module<'a>(
        &'a self,
        id: &'a ModuleIdentity,
    ) -> impl Iterator<Item = &'a VersionConflict> + 'a {
        self.conflicts.iter().filter(move |c| c.module == *id)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requested {} but resolved {} ({}, by {})",
            self.module, self.requested, self.resolved, self.reason, self.requester
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let report = ConflictReport::new();
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
        assert_eq!(report.to_string(), "No version conflicts.");
    }

    #[test]
    fn report_with_conflicts() {
        let lib = ModuleIdentity::new("org.example", "lib");
        let mut report = ConflictReport::new();
        report.add(VersionConflict {
            module: lib.clone(),
            requester: "com.example:app:1.0".to_string(),
            requested: "1.0".to_string(),
            resolved: "2.0".to_string(),
            reason: ResolutionReason::ConflictResolved,
        });
        assert!(!report.is_empty());
        assert_eq!(report.len(), 1);
        assert_eq!(report.for_module(&lib).count(), 1);
        let s = report.to_string();
        assert!(s.contains("org.example:lib requested 1.0 but resolved 2.0"));
        assert!(s.contains("conflict-resolved"));
    }
}
