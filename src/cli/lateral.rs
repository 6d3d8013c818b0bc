use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::commands::{EngineArgs, LateralArgs};
use super::settings::resolve_settings;
use crate::engine::{AuditScope, DriverOptions, ExploitationDriver};
use crate::errors::PatchyError;
use crate::gcp::{GcpServices, HttpMetadataClient, MetadataService, MetadataTokenSource};
use crate::models::report::ProbeMode;
use crate::reporting::{format_summary, write_report};

pub async fn handle_lateral(
    engine_args: EngineArgs,
    args: LateralArgs,
    cancel_token: CancellationToken,
) -> Result<(), PatchyError> {
    let settings = resolve_settings(&engine_args).await?;

    let metadata: Arc<dyn MetadataService> = Arc::new(HttpMetadataClient::new()?);
    // payload lookups run as the instance's default account
    let storage_credential = Arc::new(MetadataTokenSource::default_account(metadata.clone()));
    let services = GcpServices::live(metadata, storage_credential);

    let options = DriverOptions {
        probe_mode: if args.exploit { ProbeMode::Exploit } else { ProbeMode::Audit },
        audit_scope: if args.exhaustive { AuditScope::Exhaustive } else { AuditScope::FirstHit },
        project_override: settings.project.clone(),
    };
    info!(
        bucket = %settings.engine.bucket,
        mode = %options.probe_mode,
        persistence = settings.engine.persistence,
        "Starting lateral movement"
    );

    let driver = ExploitationDriver::new(settings.engine, services)?
        .with_cancel_token(cancel_token);
    let report = driver.run(&options).await?;

    println!("{}", format_summary(&report));
    if let Some(path) = &settings.report {
        write_report(&report, path).await?;
    }
    Ok(())
}
