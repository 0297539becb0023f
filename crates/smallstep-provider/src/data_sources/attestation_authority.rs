//! `smallstep_attestation_authority` data source

use async_trait::async_trait;
use tracing::debug;

use smallstep_client::Client;
use smallstep_core::{Schema, Value};

use crate::data_sources::{lookup_schema, not_found};
use crate::error::Result;
use crate::resource::{Context, DataSource, StepResult, encode_model};
use crate::resources::attestation_authority::{
    self, AttestationAuthorityModel, AttestationAuthorityResource,
};
use crate::resources::identity;
use crate::respond::Fetched;

pub struct AttestationAuthorityDataSource {
    resource: AttestationAuthorityResource,
}

impl AttestationAuthorityDataSource {
    pub fn new(client: Client) -> Self {
        Self {
            resource: AttestationAuthorityResource::new(client),
        }
    }
}

#[async_trait]
impl DataSource for AttestationAuthorityDataSource {
    fn type_name(&self) -> &'static str {
        attestation_authority::TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        Ok(lookup_schema(attestation_authority::schema()?, &["id"], &[]))
    }

    async fn read(&self, ctx: &Context, config: &Value) -> StepResult<Value> {
        let id = identity(config, "id")?;
        debug!(data_source = attestation_authority::TYPE_NAME, id, "looking up");
        match self.resource.fetch(ctx, id).await? {
            Fetched::Found(found) => {
                encode_model(&AttestationAuthorityModel::from_api(&found, &Value::Null))
            }
            Fetched::Gone => Err(not_found("Attestation authority", "id", id).into()),
        }
    }
}
