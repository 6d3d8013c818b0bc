pub mod asset;
pub mod http;
pub mod iam;
pub mod key_file;
pub mod metadata;
pub mod osconfig;
pub mod storage;
pub mod token;

use std::sync::Arc;

pub use asset::{AssetClient, PolicySearch, PolicySearchStream};
pub use iam::{IamClient, RoleService};
pub use metadata::{HttpMetadataClient, MetadataService, MetadataTokenSource};
pub use osconfig::{OsConfigClient, PatchResponse, PatchService};
pub use storage::{GcsClient, ObjectStore};
pub use token::{AccessToken, StaticTokenSource, TokenSource};

/// Every remote collaborator of a run.
#[derive(Clone)]
pub struct GcpServices {
    pub metadata: Arc<dyn MetadataService>,
    pub storage: Arc<dyn ObjectStore>,
    pub policy_search: Arc<dyn PolicySearch>,
    pub roles: Arc<dyn RoleService>,
    pub patch: Arc<dyn PatchService>,
}

impl GcpServices {
    /// Production clients. Payload lookups authenticate as `storage_credential`.
    pub fn live(
        metadata: Arc<dyn MetadataService>,
        storage_credential: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            metadata,
            storage: Arc::new(GcsClient::new(storage_credential)),
            policy_search: Arc::new(AssetClient::new()),
            roles: Arc::new(IamClient::new()),
            patch: Arc::new(OsConfigClient::new()),
        }
    }
}
