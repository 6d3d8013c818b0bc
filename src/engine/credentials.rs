use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::PatchyError;
use crate::gcp::key_file::{KeyFileTokenSource, ServiceAccountKey};
use crate::gcp::metadata::{fetch_account_token, MetadataService};
use crate::gcp::token::{StaticTokenSource, TokenSource};
use crate::models::identity::Identity;

const SERVICE_ACCOUNTS_PATH: &str = "instance/service-accounts/";

/// Enumerates the service accounts attached to the current instance.
pub struct CredentialSource {
    metadata: Arc<dyn MetadataService>,
}

impl CredentialSource {
    pub fn new(metadata: Arc<dyn MetadataService>) -> Self {
        Self { metadata }
    }

    /// Every attached account with a freshly minted token, in listing order.
    ///
    /// Fails as a whole if any lookup fails; a partial list is never returned.
    pub async fn enumerate(&self) -> Result<Vec<Identity>, PatchyError> {
        let listing = self.metadata.get(SERVICE_ACCOUNTS_PATH).await?;
        let mut identities: Vec<Identity> = Vec::new();

        for line in listing.lines() {
            let principal = line.trim().trim_end_matches('/');
            if principal.is_empty() {
                continue;
            }

            let token = fetch_account_token(self.metadata.as_ref(), principal).await?;
            let email = self.metadata
                .get(&format!("{}{}/email", SERVICE_ACCOUNTS_PATH, principal))
                .await?
                .trim()
                .to_string();
            if email.is_empty() {
                return Err(PatchyError::Metadata(format!("empty email for principal {}", principal)));
            }

            // `default/` aliases one of the named accounts
            if identities.iter().any(|i| i.email == email) {
                debug!(principal, email = %email, "Skipping alias of an already listed account");
                continue;
            }

            let expires_at = token.expires_at;
            let mut identity = Identity::new(email, Arc::new(StaticTokenSource::new(token)));
            if let Some(exp) = expires_at {
                identity = identity.with_expiry(exp);
            }
            debug!(principal, email = %identity.email, "Discovered service account");
            identities.push(identity);
        }

        info!(count = identities.len(), "Enumerated instance service accounts");
        Ok(identities)
    }
}

/// A credential loaded from a service account key file.
pub struct StaticCredential {
    pub identity: Identity,
    /// Project the key belongs to, if the file says.
    pub project_id: Option<String>,
}

/// Load a key file. The identity name is the file's `client_email`.
pub async fn load_static(path: &Path) -> Result<StaticCredential, PatchyError> {
    let key = ServiceAccountKey::load(path).await?;
    let email = key.client_email.clone();
    let project_id = key.project_id.clone().filter(|p| !p.is_empty());
    let source: Arc<dyn TokenSource> = Arc::new(KeyFileTokenSource::new(key));

    info!(account = %email, "Loaded service account key file");
    Ok(StaticCredential {
        identity: Identity::new(email, source),
        project_id,
    })
}
