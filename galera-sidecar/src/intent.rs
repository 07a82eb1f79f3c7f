//! Lifecycle intents and the tokens persisted for them.

use std::fmt;

use crate::ARBITRATOR_SERVICE;

/// A lifecycle transition requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleIntent {
    Bootstrap,
    Join,
    SingleNode,
    Stop,
}

impl LifecycleIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleIntent::Bootstrap => "bootstrap",
            LifecycleIntent::Join => "join",
            LifecycleIntent::SingleNode => "single-node",
            LifecycleIntent::Stop => "stop",
        }
    }

    /// Marker written before the start command. `Stop` writes nothing.
    pub fn declared_state(&self) -> Option<DeclaredState> {
        match self {
            LifecycleIntent::Bootstrap => Some(DeclaredState::NeedsBootstrap),
            LifecycleIntent::Join => Some(DeclaredState::Clustered),
            LifecycleIntent::SingleNode => Some(DeclaredState::SingleNode),
            LifecycleIntent::Stop => None,
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            LifecycleIntent::Bootstrap => "cluster bootstrap successful",
            LifecycleIntent::Join => "join cluster successful",
            LifecycleIntent::SingleNode => "single node start successful",
            LifecycleIntent::Stop => "stop successful",
        }
    }
}

impl fmt::Display for LifecycleIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token read by the database's own startup scripts to pick a boot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredState {
    NeedsBootstrap,
    Clustered,
    SingleNode,
}

impl DeclaredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredState::NeedsBootstrap => "NEEDS_BOOTSTRAP",
            DeclaredState::Clustered => "CLUSTERED",
            DeclaredState::SingleNode => "SINGLE_NODE",
        }
    }
}

impl fmt::Display for DeclaredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the supervised process, fixed per node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_arbitrator(&self) -> bool {
        self.0 == ARBITRATOR_SERVICE
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ServiceName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_intents_declare_state() {
        assert_eq!(
            LifecycleIntent::Bootstrap.declared_state(),
            Some(DeclaredState::NeedsBootstrap)
        );
        assert_eq!(
            LifecycleIntent::Join.declared_state(),
            Some(DeclaredState::Clustered)
        );
        assert_eq!(
            LifecycleIntent::SingleNode.declared_state(),
            Some(DeclaredState::SingleNode)
        );
        assert_eq!(LifecycleIntent::Stop.declared_state(), None);
    }

    #[test]
    fn test_declared_state_tokens() {
        assert_eq!(DeclaredState::NeedsBootstrap.as_str(), "NEEDS_BOOTSTRAP");
        assert_eq!(DeclaredState::Clustered.as_str(), "CLUSTERED");
        assert_eq!(DeclaredState::SingleNode.as_str(), "SINGLE_NODE");
    }

    #[test]
    fn test_arbitrator_detection_is_exact() {
        assert!(ServiceName::from("garbd").is_arbitrator());
        assert!(!ServiceName::from("mysql").is_arbitrator());
        assert!(!ServiceName::from("GARBD").is_arbitrator());
        assert!(!ServiceName::from("garbd ").is_arbitrator());
    }
}
