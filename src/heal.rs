use tracing::{info, instrument, warn};

use crate::{config::Config, error::HealError};

/// Heal the configured service.
///
/// Remediation is not performed yet: the action is validated and logged only.
#[instrument(skip_all)]
pub fn heal(config: &Config) -> Result<(), HealError> {
    let service = config.service_name.trim();
    if service.is_empty() {
        return Err(HealError::MissingServiceName);
    }

    info!("performing healing action: restarting service {service}");
    warn!("healing is not implemented, service {service} was left untouched");
    Ok(())
}
