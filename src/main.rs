use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use wan_route_audit::audit::AuditRun;
use wan_route_audit::audit::metric::AllowedMetricSet;
use wan_route_audit::collect::{gather_inputs, parse_devices, record_all};
use wan_route_audit::config::Config;
use wan_route_audit::report::AuditReport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Initialize logging; RUST_LOG directives take precedence over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(config.log_level).into())
                .from_env_lossy(),
        )
        .init();
    tracing::info!("WAN route audit starting...");
    tracing::info!(
        "{} device(s) in inventory, {} capture file(s)",
        config.devices.len(),
        config.captures.len()
    );

    let policy = AllowedMetricSet::new(config.allowed_metrics.iter().copied());
    tracing::info!("Allowed OSPF default-originate metrics: {:?}", policy.allowed());
    let mut run = AuditRun::new(Box::new(policy));
    tracing::info!("Run ID: {}", run.run_id());

    let inputs = gather_inputs(&config).await;
    let parsed = parse_devices(inputs).await;
    record_all(&mut run, parsed);

    let sites = run.compare_sites();
    let report = AuditReport::build(&run, sites);
    report.log_summary();
    report
        .write_json(&config.output_path, config.pretty)
        .await
        .inspect_err(|e| tracing::error!("{}", e.user_message()))?;

    tracing::info!(
        "Audit complete: {} comparison(s), {} unparseable device(s)",
        report.summary.len(),
        report.unparseable.len()
    );
    Ok(())
}
