use std::fmt;

/// One unit of the diagnostics channel: every failure that does not
/// abort the evaluation still produces a tagged, inspectable record
/// (not only a log line).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub stage_id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            stage_id: None,
            message: message.into(),
        }
    }

    pub fn for_stage(stage_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage_id: Some(stage_id.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stage_id {
            Some(id) => write!(f, "[stage {id}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
