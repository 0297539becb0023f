//! `smallstep_provisioner` data source

use async_trait::async_trait;
use tracing::debug;

use smallstep_client::Client;
use smallstep_core::{Schema, Value};

use crate::data_sources::{lookup_key, lookup_schema, not_found};
use crate::error::Result;
use crate::resource::{Context, DataSource, StepResult};
use crate::resources::identity;
use crate::resources::provisioner::{self, ProvisionerResource};
use crate::respond::Fetched;

const KEYS: [&str; 2] = ["id", "name"];

/// Look up a provisioner of an authority by id or name
pub struct ProvisionerDataSource {
    resource: ProvisionerResource,
}

impl ProvisionerDataSource {
    pub fn new(client: Client) -> Self {
        Self {
            resource: ProvisionerResource::new(client),
        }
    }
}

#[async_trait]
impl DataSource for ProvisionerDataSource {
    fn type_name(&self) -> &'static str {
        provisioner::TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        Ok(lookup_schema(provisioner::schema()?, &["authority_id"], &KEYS))
    }

    async fn read(&self, ctx: &Context, config: &Value) -> StepResult<Value> {
        let authority_id = identity(config, "authority_id")?;
        let (key, value) = lookup_key(config, &KEYS)?;
        debug!(data_source = provisioner::TYPE_NAME, authority_id, key, value, "looking up");
        match self.resource.fetch(ctx, authority_id, value).await? {
            Fetched::Found(found) => self.resource.state(&found, authority_id, &Value::Null),
            Fetched::Gone => Err(not_found("Provisioner", key, value).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smallstep_client::MockServer;
    use smallstep_core::Requiredness;

    fn seed(server: &MockServer) {
        server.seed(
            "/authorities/a1/provisioners/p1",
            json!({
                "id": "p1",
                "name": "tfprovider-acme",
                "type": "ACME",
                "authorityID": "a1",
                "createdAt": "2024-05-01T10:00:00Z",
                "challenges": ["http-01"],
                "requireEAB": false,
                "forceCN": false
            }),
        );
    }

    #[tokio::test]
    async fn test_lookup_by_name() {
        let server = MockServer::new();
        seed(&server);
        let data_source = ProvisionerDataSource::new(server.client());
        let config = Value::from_json(&json!({"authority_id": "a1", "name": "tfprovider-acme"}));
        let found = data_source.read(&Context::new(), &config).await.unwrap();
        assert_eq!(found.get("id").as_str(), Some("p1"));
        assert_eq!(found.get("authority_id").as_str(), Some("a1"));
        assert_eq!(found.get("type").as_str(), Some("ACME"));
    }

    #[test]
    fn test_authority_id_is_required() {
        let data_source = ProvisionerDataSource::new(MockServer::new().client());
        let schema = data_source.schema().unwrap();
        assert_eq!(
            schema.get("authority_id").unwrap().requiredness,
            Requiredness::Required
        );
        assert_eq!(schema.get("type").unwrap().requiredness, Requiredness::Computed);
    }
}
