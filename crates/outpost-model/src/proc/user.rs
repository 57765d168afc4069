use serde::{Deserialize, Serialize};

/// Identity the process is meant to run as.
///
/// Carried as metadata only; process mechanics never act on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecUser {
    #[default]
    Restricted,
    Privileged,
}

impl ExecUser {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecUser::Restricted => "restricted",
            ExecUser::Privileged => "privileged",
        }
    }
}
