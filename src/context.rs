use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

/// what an authenticated operator may do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// loan officer, may read and write
    Officer,
    /// read-only access
    Auditor,
}

/// identity and authorization decision of the caller, supplied by the identity provider.
///
/// Passed explicitly into every book operation; nothing reads session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub operator: String,
    pub role: Role,
}

impl Caller {
    pub fn officer(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            role: Role::Officer,
        }
    }

    pub fn auditor(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            role: Role::Auditor,
        }
    }

    pub fn can_write(&self) -> bool {
        matches!(self.role, Role::Officer)
    }

    /// fail unless the caller may perform a write
    pub fn authorize(&self, action: &str) -> Result<()> {
        if self.can_write() {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                operator: self.operator.clone(),
                action: action.to_string(),
            })
        }
    }
}
