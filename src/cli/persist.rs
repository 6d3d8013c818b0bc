use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::commands::{EngineArgs, PersistArgs};
use super::settings::resolve_settings;
use crate::engine::{load_static, ExploitationDriver};
use crate::errors::PatchyError;
use crate::gcp::{GcpServices, HttpMetadataClient, MetadataService};
use crate::reporting::{format_summary, write_report};

pub async fn handle_persist(
    engine_args: EngineArgs,
    args: PersistArgs,
    cancel_token: CancellationToken,
) -> Result<(), PatchyError> {
    let mut settings = resolve_settings(&engine_args).await?;
    settings.engine.persistence = true;

    let credential = load_static(&PathBuf::from(&args.creds)).await?;
    info!(account = %credential.identity.email, bucket = %settings.engine.bucket, "Installing persistence");

    // the key's own account reads the payload generations
    let metadata: Arc<dyn MetadataService> = Arc::new(HttpMetadataClient::new()?);
    let services = GcpServices::live(metadata, credential.identity.credential.clone());

    let driver = ExploitationDriver::new(settings.engine, services)?
        .with_cancel_token(cancel_token);
    let report = driver
        .run_with_credential(credential, settings.project.as_deref())
        .await?;

    println!("{}", format_summary(&report));
    if let Some(path) = &settings.report {
        write_report(&report, path).await?;
    }
    Ok(())
}
