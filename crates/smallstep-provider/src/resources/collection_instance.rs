//! `smallstep_collection_instance`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20231208::models::{CollectionInstance, NewCollectionInstance};
use smallstep_core::bridge::{parse_json_attr, to_json_string};
use smallstep_core::{Attr, AttrPath, Attribute, Schema, SchemaBuilder, Value};

use crate::error::Result;
use crate::resource::{
    Context, Resource, StepResult, decode_model, encode_model, import_composite,
};
use crate::resources::common::timestamp;
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_collection_instance";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionInstanceModel {
    pub collection_slug: Attr<String>,
    pub id: Attr<String>,
    /// JSON document
    pub data: Attr<String>,
    /// JSON document
    pub out_data: Attr<String>,
    pub created_at: Attr<String>,
    pub updated_at: Attr<String>,
}

impl CollectionInstanceModel {
    pub fn from_api(api: &CollectionInstance, collection_slug: &str, prior: &Value) -> Self {
        Self {
            collection_slug: Attr::Known(collection_slug.to_string()),
            id: Attr::Known(api.id.clone()),
            data: to_json_string(Some(&api.data), prior, &AttrPath::root("data")),
            out_data: to_json_string(api.out_data.as_ref(), &Value::Null, &AttrPath::root("out_data")),
            created_at: Attr::Known(timestamp(&api.created_at)),
            updated_at: Attr::Known(timestamp(&api.updated_at)),
        }
    }

    pub fn to_api(&self) -> StepResult<NewCollectionInstance> {
        let data = parse_json_attr(&self.data, &AttrPath::root("data"))?;
        Ok(NewCollectionInstance {
            data: data.unwrap_or_else(|| serde_json::json!({})),
        })
    }
}

pub fn schema() -> Result<Schema> {
    Ok(SchemaBuilder::for_component("collectionInstance")?
        .attr(
            "collection_slug",
            Attribute::string()
                .required()
                .requires_replace()
                .describe("The slug of the collection holding the instance."),
        )
        .attr("id", Attribute::string().required().requires_replace())
        .attr(
            "data",
            Attribute::string()
                .required()
                .describe("An arbitrary JSON object, as a JSON-encoded string."),
        )
        .attr("out_data", Attribute::string().computed())
        .attr("created_at", Attribute::string().computed().use_state_for_unknown())
        .attr("updated_at", Attribute::string().computed())
        .build())
}

pub struct CollectionInstanceResource {
    client: Client,
}

impl CollectionInstanceResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn put(&self, ctx: &Context, operation: &str, planned: &Value) -> StepResult<Value> {
        let model: CollectionInstanceModel = decode_model(planned)?;
        let request = model.to_api()?;
        let collection_slug = identity(planned, "collection_slug")?;
        let id = identity(planned, "id")?;
        let resource = format!("collection instance {}/{}", collection_slug, id);
        debug!(resource = TYPE_NAME, collection_slug, id, operation, "writing");

        let response = self
            .client
            .v20231208()
            .put_collection_instance(&ctx.cancel, collection_slug, id, &request)
            .await
            .map_err(|e| client_error(operation, &resource, &e))?;
        expect_status(operation, &resource, &response, status::OK)?;
        let instance: CollectionInstance = decode_body(operation, &resource, &response)?;

        info!(resource = TYPE_NAME, collection_slug, id, operation, "done");
        encode_model(&CollectionInstanceModel::from_api(&instance, collection_slug, planned))
    }
}

#[async_trait]
impl Resource for CollectionInstanceResource {
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
        let collection_slug = identity(state, "collection_slug")?;
        let id = identity(state, "id")?;
        let resource = format!("collection instance {}/{}", collection_slug, id);
        debug!(resource = TYPE_NAME, collection_slug, id, "reading");
        let response = self
            .client
            .v20231208()
            .get_collection_instance(&ctx.cancel, collection_slug, id)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        match fetched::<CollectionInstance>("read", &resource, &response)? {
            Fetched::Found(instance) => {
                encode_model(&CollectionInstanceModel::from_api(&instance, collection_slug, state))
                    .map(Some)
            }
            Fetched::Gone => {
                warn!(resource = TYPE_NAME, collection_slug, id, "not found, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, planned: &Value, _prior: &Value) -> StepResult<Value> {
        self.put(ctx, "update", planned).await
    }

    async fn delete(&self, ctx: &Context, state: &Value) -> StepResult<()> {
        let collection_slug = identity(state, "collection_slug")?;
        let id = identity(state, "id")?;
        let resource = format!("collection instance {}/{}", collection_slug, id);
        debug!(resource = TYPE_NAME, collection_slug, id, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_collection_instance(&ctx.cancel, collection_slug, id)
            .await
            .map_err(|e| client_error("delete", &resource, &e))?;
        deleted("delete", &resource, &response)?;
        info!(resource = TYPE_NAME, collection_slug, id, "deleted");
        Ok(())
    }

    fn import_state(&self, id: &str) -> StepResult<Value> {
        import_composite(&["collection_slug", "id"], id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn instance() -> CollectionInstance {
        CollectionInstance {
            id: "host-1".to_string(),
            data: json!({"os": "linux", "tags": ["a"]}),
            out_data: Some(json!({"os": "linux", "tags": ["a"], "enrolled": true})),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_data_keeps_user_formatting() {
        let written = "{\n  \"tags\": [\"a\"],\n  \"os\": \"linux\"\n}";
        let prior = Value::object([("data", Value::string(written))]);
        let model = CollectionInstanceModel::from_api(&instance(), "devices", &prior);
        assert_eq!(model.data.as_deref(), Some(written));
    }

    #[test]
    fn test_out_data_follows_server() {
        let model = CollectionInstanceModel::from_api(&instance(), "devices", &Value::Null);
        let out: serde_json::Value = serde_json::from_str(model.out_data.as_deref().unwrap()).unwrap();
        assert_eq!(out["enrolled"], true);
    }

    #[test]
    fn test_invalid_data_is_reported() {
        let model = CollectionInstanceModel {
            data: Attr::Known("{not json".to_string()),
            ..Default::default()
        };
        let diags = model.to_api().unwrap_err();
        assert!(diags.to_string().contains("Invalid JSON"));
    }
}
