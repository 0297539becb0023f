//! `smallstep_collection`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20231208::models::{Collection, NewCollection};
use smallstep_core::bridge::to_optional_string;
use smallstep_core::{
    Attr, AttrPath, Attribute, Diagnostic, ErrorKind, Schema, SchemaBuilder, Value,
};

use crate::error::Result;
use crate::resource::{Context, Resource, StepResult, decode_model, encode_model, import_single};
use crate::resources::common::timestamp;
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_collection";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionModel {
    pub slug: Attr<String>,
    pub display_name: Attr<String>,
    pub schema_uri: Attr<String>,
    pub instance_count: Attr<i64>,
    pub created_at: Attr<String>,
    pub updated_at: Attr<String>,
}

impl CollectionModel {
    pub fn from_api(api: &Collection, prior: &Value) -> Self {
        Self {
            slug: Attr::Known(api.slug.clone()),
            display_name: to_optional_string(
                api.display_name.clone(),
                prior,
                &AttrPath::root("display_name"),
            ),
            schema_uri: to_optional_string(api.schema_uri.clone(), prior, &AttrPath::root("schema_uri")),
            instance_count: Attr::Known(api.instance_count),
            created_at: Attr::Known(timestamp(&api.created_at)),
            updated_at: Attr::Known(timestamp(&api.updated_at)),
        }
    }

    pub fn to_api(&self) -> NewCollection {
        NewCollection {
            display_name: self.display_name.to_option(),
            schema_uri: self.schema_uri.to_option(),
        }
    }
}

pub fn schema() -> Result<Schema> {
    Ok(SchemaBuilder::for_component("collection")?
        .attr("slug", Attribute::string().required().requires_replace())
        .attr("display_name", Attribute::string().optional())
        .attr_as("schema_uri", "schemaURI", Attribute::string().optional())
        .attr("instance_count", Attribute::int().computed())
        .attr("created_at", Attribute::string().computed().use_state_for_unknown())
        .attr("updated_at", Attribute::string().computed())
        .build())
}

/// Collections are created and replaced with PUT on their slug
pub struct CollectionResource {
    client: Client,
}

impl CollectionResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub(crate) async fn fetch(&self, ctx: &Context, slug: &str) -> StepResult<Fetched<Collection>> {
        let resource = format!("collection {}", slug);
        let response = self
            .client
            .v20231208()
            .get_collection(&ctx.cancel, slug)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        Ok(fetched("read", &resource, &response)?)
    }

    async fn put(&self, ctx: &Context, operation: &str, planned: &Value) -> StepResult<Value> {
        let model: CollectionModel = decode_model(planned)?;
        let slug = identity(planned, "slug")?;
        let resource = format!("collection {}", slug);
        debug!(resource = TYPE_NAME, slug, operation, "writing");

        let response = self
            .client
            .v20231208()
            .put_collection(&ctx.cancel, slug, &model.to_api())
            .await
            .map_err(|e| client_error(operation, &resource, &e))?;
        expect_status(operation, &resource, &response, status::OK)?;
        let collection: Collection = decode_body(operation, &resource, &response)?;

        info!(resource = TYPE_NAME, slug, operation, "done");
        encode_model(&CollectionModel::from_api(&collection, planned))
    }
}

#[async_trait]
impl Resource for CollectionResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        self.put(ctx, "create", planned).await
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let slug = identity(state, "slug")?;
        debug!(resource = TYPE_NAME, slug, "reading");
        match self.fetch(ctx, slug).await? {
            Fetched::Found(collection) => {
                encode_model(&CollectionModel::from_api(&collection, state)).map(Some)
            }
            Fetched::Gone => {
                warn!(resource = TYPE_NAME, slug, "not found, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, planned: &Value, _prior: &Value) -> StepResult<Value> {
        self.put(ctx, "update", planned).await
    }

    /// Refuses to delete a collection that still holds instances
    async fn delete(&self, ctx: &Context, state: &Value) -> StepResult<()> {
        let slug = identity(state, "slug")?;
        let resource = format!("collection {}", slug);

        let collection = match self.fetch(ctx, slug).await? {
            Fetched::Found(collection) => collection,
            Fetched::Gone => {
                debug!(resource = TYPE_NAME, slug, "already gone");
                return Ok(());
            }
        };
        if collection.instance_count > 0 {
            return Err(Diagnostic::error(
                "Collection is not empty",
                format!(
                    "Cannot delete {}: it still holds {} instance(s). Remove them first.",
                    resource, collection.instance_count
                ),
            )
            .with_kind(ErrorKind::DeletePrecondition)
            .into());
        }

        debug!(resource = TYPE_NAME, slug, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_collection(&ctx.cancel, slug)
            .await
            .map_err(|e| client_error("delete", &resource, &e))?;
        deleted("delete", &resource, &response)?;
        info!(resource = TYPE_NAME, slug, "deleted");
        Ok(())
    }

    fn import_state(&self, id: &str) -> StepResult<Value> {
        import_single("slug", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use smallstep_client::MockServer;

    #[test]
    fn test_empty_display_name_reads_as_null() {
        let api = Collection {
            slug: "tfprovider-devices".to_string(),
            display_name: Some(String::new()),
            schema_uri: None,
            instance_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let model = CollectionModel::from_api(&api, &Value::Null);
        assert!(model.display_name.is_null());
        assert_eq!(model.instance_count, Attr::Known(0));
    }

    #[tokio::test]
    async fn test_delete_refuses_non_empty_collection() {
        let server = MockServer::new();
        server.seed(
            "/collections/tfprovider-devices",
            json!({
                "slug": "tfprovider-devices",
                "displayName": "",
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            }),
        );
        server.seed("/collections/tfprovider-devices/instances/i1", json!({"id": "i1", "data": {}}));

        let resource = CollectionResource::new(server.client());
        let state = Value::object([("slug", Value::string("tfprovider-devices"))]);
        let diags = resource.delete(&Context::new(), &state).await.unwrap_err();

        assert_eq!(diags.error_kind(), Some(ErrorKind::DeletePrecondition));
        assert_eq!(server.counts().deletes, 0);
        assert!(server.contains("/collections/tfprovider-devices"));
    }

    #[tokio::test]
    async fn test_delete_of_missing_collection_succeeds() {
        let server = MockServer::new();
        let resource = CollectionResource::new(server.client());
        let state = Value::object([("slug", Value::string("gone"))]);
        resource.delete(&Context::new(), &state).await.unwrap();
    }
}
