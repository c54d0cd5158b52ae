// ============================================================================
// ENTRY POINT
// ============================================================================

use encoder_dial::{Dashboard, DashboardConfig};

fn main() -> Result<(), encoder_dial::Error> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let config = DashboardConfig::default();
    log::info!(
        "polling encoder at {}:{} (unit {})",
        config.device.host,
        config.device.port,
        config.device.unit_id
    );
    Dashboard::new(config).run()
}
