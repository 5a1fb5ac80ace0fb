use std::fmt;
use std::str::FromStr;

/// Lifecycle of a remote workflow instance.
///
/// `Pending -> Running -> {Succeeded, Failed, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(status: &str) -> Result<Self, Self::Err> {
        match status.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(status.to_string()),
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_statuses_case_insensitively() {
        assert_eq!("Running".parse::<WorkflowStatus>(), Ok(WorkflowStatus::Running));
        assert_eq!("succeeded".parse::<WorkflowStatus>(), Ok(WorkflowStatus::Succeeded));
        assert_eq!(" CANCELLED ".parse::<WorkflowStatus>(), Ok(WorkflowStatus::Cancelled));
    }

    #[test]
    fn unknown_status_is_returned_verbatim() {
        assert_eq!("valid".parse::<WorkflowStatus>(), Err("valid".to_string()));
    }
}
