//! `smallstep_collection` data source

use async_trait::async_trait;
use tracing::debug;

use smallstep_client::Client;
use smallstep_core::{Schema, Value};

use crate::data_sources::{lookup_schema, not_found};
use crate::error::Result;
use crate::resource::{Context, DataSource, StepResult, encode_model};
use crate::resources::collection::{self, CollectionModel, CollectionResource};
use crate::resources::identity;
use crate::respond::Fetched;

pub struct CollectionDataSource {
    resource: CollectionResource,
}

impl CollectionDataSource {
    pub fn new(client: Client) -> Self {
        Self {
            resource: CollectionResource::new(client),
        }
    }
}

#[async_trait]
impl DataSource for CollectionDataSource {
    fn type_name(&self) -> &'static str {
        collection::TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        Ok(lookup_schema(collection::schema()?, &["slug"], &[]))
    }

    async fn read(&self, ctx: &Context, config: &Value) -> StepResult<Value> {
        let slug = identity(config, "slug")?;
        debug!(data_source = collection::TYPE_NAME, slug, "looking up");
        match self.resource.fetch(ctx, slug).await? {
            Fetched::Found(found) => encode_model(&CollectionModel::from_api(&found, &Value::Null)),
            Fetched::Gone => Err(not_found("Collection", "slug", slug).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smallstep_client::MockServer;

    #[tokio::test]
    async fn test_lookup_reports_instance_count() {
        let server = MockServer::new();
        server.seed(
            "/collections/tfprovider-hosts",
            json!({
                "slug": "tfprovider-hosts",
                "displayName": "Hosts",
                "createdAt": "2024-05-01T10:00:00Z",
                "updatedAt": "2024-05-01T10:00:00Z"
            }),
        );
        server.seed(
            "/collections/tfprovider-hosts/instances/web",
            json!({"id": "web", "data": {"hostname": "web"}}),
        );

        let data_source = CollectionDataSource::new(server.client());
        let config = Value::from_json(&json!({"slug": "tfprovider-hosts"}));
        let found = data_source.read(&Context::new(), &config).await.unwrap();
        assert_eq!(found.get("display_name").as_str(), Some("Hosts"));
        assert_eq!(found.get("instance_count").as_i64(), Some(1));
        assert!(found.get("schema_uri").is_null());
    }
}
