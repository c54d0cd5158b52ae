use encoder_dial::{Dashboard, DashboardConfig, DialStyle, NeedleShape, SimulatedEncoder};

fn main() -> Result<(), encoder_dial::Error> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    // Triangle needle on the sparse 45-degree dial, with an occasional dropped link
    // so the status indicator and reconnect path can be seen.
    let config = DashboardConfig::builder()
        .style(DialStyle {
            tick_step: 45,
            needle: NeedleShape::Triangle,
            ..DialStyle::default()
        })
        .build();
    let encoder = SimulatedEncoder::new(config.device.registers).with_dropouts(0.0005);

    println!("Displaying a simulated encoder:");
    println!("- click the button or press D to switch the counting direction");
    println!("- the link drops now and then to show reconnection");
    Dashboard::new(config).run_with_link(encoder)
}
