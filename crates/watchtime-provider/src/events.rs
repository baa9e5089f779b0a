//! Registry lifecycle events.
//!
//! Every mutation of the installed-provider set is announced on a broadcast
//! channel so other components (the update worker, API consumers) can react
//! without holding registry locks.

/// Announced on the registry's broadcast channel after a lifecycle mutation
/// has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A manifest import added these providers.
    Imported { ids: Vec<String> },
    /// A provider was deleted.
    Removed { id: String },
    /// The update checker swapped these providers to new versions.
    Updated { ids: Vec<String> },
    /// A provider's sandbox came up and passed its self-test.
    Loaded { id: String },
    /// A provider's sandbox failed to build or failed its self-test.
    LoadFailed { id: String },
    /// The user enabled a provider.
    Enabled { id: String },
    /// The user disabled a provider.
    Disabled { id: String },
}

impl RegistryEvent {
    /// Whether the update checker should re-run after this event.
    ///
    /// Only config-set mutations qualify. Option flips and load outcomes
    /// carry no version information, and `Updated` is the checker's own
    /// output and must never feed back into it.
    pub fn triggers_update_check(&self) -> bool {
        matches!(
            self,
            RegistryEvent::Imported { .. } | RegistryEvent::Removed { .. }
        )
    }

    /// The audit-log action name recorded for this event.
    pub fn action(&self) -> &'static str {
        match self {
            RegistryEvent::Imported { .. } => "imported",
            RegistryEvent::Removed { .. } => "removed",
            RegistryEvent::Updated { .. } => "updated",
            RegistryEvent::Loaded { .. } => "loaded",
            RegistryEvent::LoadFailed { .. } => "load_error",
            RegistryEvent::Enabled { .. } => "enabled",
            RegistryEvent::Disabled { .. } => "disabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_mutations_trigger_update_checks() {
        assert!(RegistryEvent::Imported {
            ids: vec!["nyaa".into()]
        }
        .triggers_update_check());
        assert!(RegistryEvent::Removed { id: "nyaa".into() }.triggers_update_check());
    }

    #[test]
    fn test_checker_output_never_retriggers_it() {
        assert!(!RegistryEvent::Updated {
            ids: vec!["nyaa".into()]
        }
        .triggers_update_check());
    }

    #[test]
    fn test_option_and_load_events_do_not_trigger_checks() {
        assert!(!RegistryEvent::Loaded { id: "nyaa".into() }.triggers_update_check());
        assert!(!RegistryEvent::LoadFailed { id: "nyaa".into() }.triggers_update_check());
        assert!(!RegistryEvent::Enabled { id: "nyaa".into() }.triggers_update_check());
        assert!(!RegistryEvent::Disabled { id: "nyaa".into() }.triggers_update_check());
    }

    #[test]
    fn test_audit_action_names() {
        assert_eq!(
            RegistryEvent::Imported { ids: Vec::new() }.action(),
            "imported"
        );
        assert_eq!(RegistryEvent::Removed { id: "x".into() }.action(), "removed");
        assert_eq!(RegistryEvent::Updated { ids: Vec::new() }.action(), "updated");
        assert_eq!(RegistryEvent::Loaded { id: "x".into() }.action(), "loaded");
        assert_eq!(
            RegistryEvent::LoadFailed { id: "x".into() }.action(),
            "load_error"
        );
        assert_eq!(RegistryEvent::Enabled { id: "x".into() }.action(), "enabled");
        assert_eq!(
            RegistryEvent::Disabled { id: "x".into() }.action(),
            "disabled"
        );
    }
}
