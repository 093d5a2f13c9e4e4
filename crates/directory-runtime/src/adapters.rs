//! # Runtime Adapters
//!
//! Standalone-mode implementations of the external ports. Production
//! deployments replace the logging gateway with an adapter speaking the
//! directory's actual protocol behind the same trait.

use dk_01_key_lifecycle::ports::{
    CreateKeyOutcome, CreatedKey, DirectoryGateway, GatewayError,
};
use shared_types::{ClaimId, ClaimReason, KeyRecord};
use tracing::info;

/// A gateway that acknowledges every call, for standalone operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDirectoryGateway;

impl LoggingDirectoryGateway {
    /// Create a standalone gateway.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DirectoryGateway for LoggingDirectoryGateway {
    fn create_key(&self, record: &KeyRecord) -> Result<CreatedKey, GatewayError> {
        info!(record = %record.id, key_type = ?record.key_type, "createKey acknowledged");
        Ok(CreatedKey::of(CreateKeyOutcome::Own))
    }

    fn delete_key(&self, record: &KeyRecord) -> Result<(), GatewayError> {
        info!(record = %record.id, "deleteKey acknowledged");
        Ok(())
    }

    fn close_claim(&self, claim: ClaimId, reason: ClaimReason) -> Result<(), GatewayError> {
        info!(%claim, ?reason, "closeClaim acknowledged");
        Ok(())
    }

    fn deny_claim(&self, claim: ClaimId, reason: ClaimReason) -> Result<(), GatewayError> {
        info!(%claim, ?reason, "denyClaim acknowledged");
        Ok(())
    }

    fn cancel_portability_claim(
        &self,
        claim: ClaimId,
        reason: ClaimReason,
    ) -> Result<(), GatewayError> {
        info!(%claim, ?reason, "cancelPortabilityClaim acknowledged");
        Ok(())
    }

    fn confirm_portability_claim(
        &self,
        claim: ClaimId,
        reason: ClaimReason,
    ) -> Result<(), GatewayError> {
        info!(%claim, ?reason, "confirmPortabilityClaim acknowledged");
        Ok(())
    }
}
