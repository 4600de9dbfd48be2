use crate::types::DeliveryOutcome;
use serde::Serialize;

/// What a briefing run did, for the caller to log, print or alert on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub recipients: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Outcomes of the failed deliveries, with the provider's reason.
    pub failures: Vec<DeliveryOutcome>,
}

impl RunReport {
    pub fn from_outcomes(outcomes: &[DeliveryOutcome]) -> Self {
        let failures: Vec<DeliveryOutcome> = outcomes.iter().filter(|o| !o.success).cloned().collect();
        Self {
            recipients: outcomes.len(),
            succeeded: outcomes.len() - failures.len(),
            failed: failures.len(),
            failures,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Briefing sent to {}/{} users ({} failed)",
            self.succeeded, self.recipients, self.failed
        )
    }
}
