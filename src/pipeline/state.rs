//! Per-email lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

/// Lifecycle stage of one email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Checking subject and body.
    Validating,
    /// Waiting on the classifier.
    Classifying,
    /// A category handler is generating and sending the reply.
    Handling,
    /// The reply was accepted by the transport.
    Sent,
    /// The outcome was appended to the log.
    Logged,
    /// The email failed; it may still advance to `Logged` if a handler ran.
    Failed,
}

impl PipelineStage {
    pub fn can_transition_to(&self, target: PipelineStage) -> bool {
        use PipelineStage::*;

        matches!(
            (self, target),
            (Validating, Classifying)
                | (Validating, Failed)
                | (Classifying, Handling)
                | (Classifying, Failed)
                | (Handling, Sent)
                | (Handling, Failed)
                | (Sent, Logged)
                | (Failed, Logged)
        )
    }

    /// Only `Logged` is terminal; `Failed` may still advance to `Logged`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Logged)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validating => "validating",
            Self::Classifying => "classifying",
            Self::Handling => "handling",
            Self::Sent => "sent",
            Self::Logged => "logged",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A recorded stage change.
#[derive(Debug, Clone, Serialize)]
pub struct StageTransition {
    pub from: PipelineStage,
    pub to: PipelineStage,
    pub timestamp: DateTime<Utc>,
}

/// Tracks the stage of one email through the pipeline.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    email_id: String,
    stage: PipelineStage,
    transitions: Vec<StageTransition>,
}

impl Lifecycle {
    pub fn new(email_id: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            stage: PipelineStage::Validating,
            transitions: Vec::new(),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Stages visited so far, e.g. `validating > classifying > failed`.
    pub fn path(&self) -> String {
        let mut path = PipelineStage::Validating.to_string();
        for t in &self.transitions {
            path.push_str(" > ");
            path.push_str(&t.to.to_string());
        }
        path
    }

    /// Move to `target`. Illegal moves are logged and ignored.
    pub fn advance(&mut self, target: PipelineStage) -> bool {
        if !self.stage.can_transition_to(target) {
            warn!(
                email_id = %self.email_id,
                from = %self.stage,
                to = %target,
                "Ignoring illegal stage transition"
            );
            return false;
        }

        debug!(email_id = %self.email_id, from = %self.stage, to = %target, "Stage transition");
        self.transitions.push(StageTransition {
            from: self.stage,
            to: target,
            timestamp: Utc::now(),
        });
        self.stage = target;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_logged() {
        let mut lc = Lifecycle::new("1");
        assert!(lc.advance(PipelineStage::Classifying));
        assert!(lc.advance(PipelineStage::Handling));
        assert!(lc.advance(PipelineStage::Sent));
        assert!(lc.advance(PipelineStage::Logged));
        assert_eq!(lc.stage(), PipelineStage::Logged);
        assert_eq!(lc.path(), "validating > classifying > handling > sent > logged");
    }

    #[test]
    fn send_failure_still_reaches_logged() {
        let mut lc = Lifecycle::new("1");
        lc.advance(PipelineStage::Classifying);
        lc.advance(PipelineStage::Handling);
        assert!(lc.advance(PipelineStage::Failed));
        assert!(lc.advance(PipelineStage::Logged));
    }

    #[test]
    fn cannot_skip_classification() {
        let mut lc = Lifecycle::new("1");
        assert!(!lc.advance(PipelineStage::Handling));
        assert_eq!(lc.stage(), PipelineStage::Validating);
        assert_eq!(lc.path(), "validating");
    }

    #[test]
    fn logged_is_final() {
        for target in [
            PipelineStage::Validating,
            PipelineStage::Classifying,
            PipelineStage::Handling,
            PipelineStage::Sent,
            PipelineStage::Failed,
        ] {
            assert!(!PipelineStage::Logged.can_transition_to(target));
        }
        assert!(PipelineStage::Logged.is_terminal());
        assert!(!PipelineStage::Sent.is_terminal());
    }

    #[test]
    fn failed_is_not_terminal() {
        assert!(!PipelineStage::Failed.is_terminal());
        assert!(PipelineStage::Failed.can_transition_to(PipelineStage::Logged));
    }

    #[test]
    fn path_lists_visited_stages() {
        let mut lc = Lifecycle::new("1");
        lc.advance(PipelineStage::Classifying);
        lc.advance(PipelineStage::Failed);
        assert_eq!(lc.path(), "validating > classifying > failed");
    }
}
