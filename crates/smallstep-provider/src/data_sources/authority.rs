//! `smallstep_authority` data source

use async_trait::async_trait;
use tracing::debug;

use smallstep_client::Client;
use smallstep_core::{Schema, Value};

use crate::data_sources::{lookup_key, lookup_schema, not_found};
use crate::error::Result;
use crate::resource::{Context, DataSource, StepResult, encode_model};
use crate::resources::authority::{self, AuthorityModel, AuthorityResource};
use crate::respond::Fetched;

const KEYS: [&str; 2] = ["id", "domain"];

/// Look up an authority by id or domain
pub struct AuthorityDataSource {
    resource: AuthorityResource,
}

impl AuthorityDataSource {
    pub fn new(client: Client) -> Self {
        Self {
            resource: AuthorityResource::new(client),
        }
    }
}

#[async_trait]
impl DataSource for AuthorityDataSource {
    fn type_name(&self) -> &'static str {
        authority::TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let mut schema = lookup_schema(authority::schema()?, &[], &KEYS);
        // issuers are write-only on the resource
        schema.attributes.remove("intermediate_issuer");
        schema.attributes.remove("root_issuer");
        Ok(schema)
    }

    async fn read(&self, ctx: &Context, config: &Value) -> StepResult<Value> {
        let (key, value) = lookup_key(config, &KEYS)?;
        debug!(data_source = authority::TYPE_NAME, key, value, "looking up");
        match self.resource.fetch(ctx, value).await? {
            Fetched::Found(found) => {
                let mut state = encode_model(&AuthorityModel::from_api(&found, &Value::Null)?)?;
                if let Value::Object(fields) = &mut state {
                    fields.remove("intermediate_issuer");
                    fields.remove("root_issuer");
                }
                Ok(state)
            }
            Fetched::Gone => Err(not_found("Authority", key, value).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smallstep_client::MockServer;
    use smallstep_core::ErrorKind;

    #[tokio::test]
    async fn test_lookup_by_domain() {
        let server = MockServer::new();
        let resource = AuthorityResource::new(server.client());
        let planned = Value::from_json(&json!({
            "subdomain": "tfprovider-lookup",
            "name": "Lookup Authority",
            "type": "devops",
            "admin_emails": ["a@x"]
        }));
        let state = crate::resource::Resource::create(&resource, &Context::new(), &planned)
            .await
            .unwrap();

        let data_source = AuthorityDataSource::new(server.client());
        let config = Value::from_json(&json!({"domain": state.get("domain").to_json()}));
        let found = data_source.read(&Context::new(), &config).await.unwrap();
        assert_eq!(found.get("id"), state.get("id"));
        assert_eq!(found.get("fingerprint"), state.get("fingerprint"));
        assert!(found.as_object().unwrap().get("root_issuer").is_none());
    }

    #[tokio::test]
    async fn test_missing_authority_is_an_error() {
        let data_source = AuthorityDataSource::new(MockServer::new().client());
        let config = Value::from_json(&json!({"id": "00000000-0000-0000-0000-000000000000"}));
        let diags = data_source.read(&Context::new(), &config).await.unwrap_err();
        assert_eq!(diags.error_kind(), Some(ErrorKind::ResponseError));
        assert!(diags.to_string().contains("no authority with id"));
    }
}
