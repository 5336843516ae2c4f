//! Canonical test configurations.

use crate::infrastructure::config::database::StoreBackend;
use crate::infrastructure::config::settings::Config;

/// Default config with an in-memory store and no pauses between requests.
pub fn fast() -> Config {
    let mut config = Config::default();
    config.database.backend = StoreBackend::Memory;
    config.schedule = config.schedule.without_pauses();
    config
}
