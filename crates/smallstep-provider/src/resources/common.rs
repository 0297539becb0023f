//! Building blocks shared by several resources
//!
//! Endpoint certificate/key/reload info and hooks appear on endpoint
//! configurations, device collection accounts, workloads and strategy
//! credentials; certificate fields on accounts, workloads and strategies.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use smallstep_client::ClientError;
use smallstep_client::Union;
use smallstep_client::v20231208::models::{
    CERTIFICATE_FIELD_DEVICE_METADATA, CERTIFICATE_FIELD_STATIC, CertificateFieldDeviceMetadata,
    CertificateFieldListDeviceMetadata, CertificateFieldListStatic, CertificateFieldStatic,
    CertificateFields, EndpointCertificateInfo, EndpointHook, EndpointHooks, EndpointKeyInfo,
    EndpointReloadInfo,
};
use smallstep_core::bridge::{
    to_duration_string, to_int_ptr, to_int64_ptr, to_optional_int, to_optional_list,
    to_optional_string,
};
use smallstep_core::{
    Attr, AttrPath, Attribute, Diagnostic, Diagnostics, ElementKind, ErrorKind, SchemaBuilder,
    Value,
};

use crate::error::Result;

pub const CERTIFICATE_TYPES: [&str; 3] = ["X509", "SSH_USER", "SSH_HOST"];
pub const KEY_TYPES: [&str; 8] = [
    "DEFAULT",
    "ECDSA_P256",
    "ECDSA_P384",
    "ECDSA_P521",
    "RSA_2048",
    "RSA_3072",
    "RSA_4096",
    "ED25519",
];
pub const KEY_FORMATS: [&str; 6] = ["DEFAULT", "OPENSSH", "PKCS1", "PKCS8", "TSS2", "CMS"];
pub const RELOAD_METHODS: [&str; 3] = ["AUTOMATIC", "SIGNAL", "DBUS"];

/// Timestamps are stored as RFC 3339 in UTC
pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn set_to_vec(set: &Attr<BTreeSet<String>>) -> Option<Vec<String>> {
    set.as_known().map(|items| items.iter().cloned().collect())
}

/// Check that exactly one polymorphic branch is set and that it is the one
/// `discriminator` selects
pub fn select_branch(
    discriminator_attr: &str,
    discriminator: &str,
    expected: &str,
    branches: &[(&str, bool)],
) -> std::result::Result<(), Diagnostic> {
    let set: Vec<&str> = branches
        .iter()
        .filter(|(_, present)| *present)
        .map(|(name, _)| *name)
        .collect();
    let names: Vec<&str> = branches.iter().map(|(name, _)| *name).collect();

    if set.len() != 1 {
        return Err(Diagnostic::error(
            "Invalid attribute combination",
            format!(
                "Exactly one of [{}] must be set, found {}",
                names.join(", "),
                set.len()
            ),
        )
        .with_kind(ErrorKind::ParseError)
        .at(&AttrPath::root(discriminator_attr)));
    }
    if set[0] != expected {
        return Err(Diagnostic::error(
            "Invalid attribute combination",
            format!(
                "{} \"{}\" requires the {} block, but {} is set",
                discriminator_attr, discriminator, expected, set[0]
            ),
        )
        .with_kind(ErrorKind::ParseError)
        .at(&AttrPath::root(discriminator_attr)));
    }
    Ok(())
}

/// A union payload did not match the variant its discriminator names
pub fn union_error(discriminator_attr: &str, discriminator: &str, err: &ClientError) -> Diagnostic {
    Diagnostic::error(
        "Failed to parse API response",
        format!("{} \"{}\": {}", discriminator_attr, discriminator, err),
    )
    .with_kind(ErrorKind::ParseError)
    .at(&AttrPath::root(discriminator_attr))
}

pub(crate) fn encode_variant<T: Serialize>(variant: &T, path: &AttrPath) -> std::result::Result<Union, Diagnostic> {
    Union::from_variant(variant).map_err(|e| {
        Diagnostic::error("Failed to encode request", e.to_string())
            .with_kind(ErrorKind::ParseError)
            .at(path)
    })
}

// ============ Certificate info ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateInfoModel {
    #[serde(rename = "type")]
    pub kind: Attr<String>,
    pub duration: Attr<String>,
    pub crt_file: Attr<String>,
    pub key_file: Attr<String>,
    pub root_file: Attr<String>,
    pub uid: Attr<i64>,
    pub gid: Attr<i64>,
    pub mode: Attr<i64>,
}

impl CertificateInfoModel {
    pub fn schema() -> Result<BTreeMap<String, Attribute>> {
        Ok(SchemaBuilder::for_component("endpointCertificateInfo")?
            .attr("type", Attribute::string().required().one_of(CERTIFICATE_TYPES))
            .attr("duration", Attribute::string().optional_computed().use_state_for_unknown())
            .attr("crt_file", Attribute::string().optional())
            .attr("key_file", Attribute::string().optional())
            .attr("root_file", Attribute::string().optional())
            .attr("uid", Attribute::int().optional())
            .attr("gid", Attribute::int().optional())
            .attr("mode", Attribute::int().optional())
            .attributes())
    }

    pub fn from_api(api: &EndpointCertificateInfo, prior: &Value, path: &AttrPath) -> Self {
        Self {
            kind: Attr::Known(api.kind.clone()),
            duration: to_duration_string(api.duration.clone(), prior, &path.child("duration")),
            crt_file: to_optional_string(api.crt_file.clone(), prior, &path.child("crt_file")),
            key_file: to_optional_string(api.key_file.clone(), prior, &path.child("key_file")),
            root_file: to_optional_string(api.root_file.clone(), prior, &path.child("root_file")),
            uid: to_optional_int(to_int64_ptr(api.uid), prior, &path.child("uid")),
            gid: to_optional_int(to_int64_ptr(api.gid), prior, &path.child("gid")),
            mode: to_optional_int(to_int64_ptr(api.mode), prior, &path.child("mode")),
        }
    }

    pub fn to_api(&self, path: &AttrPath) -> std::result::Result<EndpointCertificateInfo, Diagnostics> {
        let mut diags = Diagnostics::new();
        let mut narrow = |value: &Attr<i64>, name: &str| {
            to_int_ptr(value.to_option(), &path.child(name)).unwrap_or_else(|d| {
                diags.push(d);
                None
            })
        };
        let uid = narrow(&self.uid, "uid");
        let gid = narrow(&self.gid, "gid");
        let mode = narrow(&self.mode, "mode");

        diags.into_result(EndpointCertificateInfo {
            kind: self.kind.to_option().unwrap_or_default(),
            duration: self.duration.to_option(),
            crt_file: self.crt_file.to_option(),
            key_file: self.key_file.to_option(),
            root_file: self.root_file.to_option(),
            uid,
            gid,
            mode,
        })
    }
}

// ============ Key info ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyInfoModel {
    #[serde(rename = "type")]
    pub kind: Attr<String>,
    pub format: Attr<String>,
    pub pub_file: Attr<String>,
}

impl KeyInfoModel {
    pub fn schema() -> Result<BTreeMap<String, Attribute>> {
        Ok(SchemaBuilder::for_component("endpointKeyInfo")?
            .attr(
                "type",
                Attribute::string()
                    .optional_computed()
                    .use_state_for_unknown()
                    .one_of(KEY_TYPES),
            )
            .attr(
                "format",
                Attribute::string()
                    .optional_computed()
                    .use_state_for_unknown()
                    .one_of(KEY_FORMATS),
            )
            .attr("pub_file", Attribute::string().optional())
            .attributes())
    }

    /// The server fills in `DEFAULT` type and format when the block is omitted
    pub fn attribute() -> Result<Attribute> {
        Ok(Attribute::object(Self::schema()?)
            .optional_computed()
            .use_state_for_unknown())
    }

    pub fn from_api(api: Option<&EndpointKeyInfo>, prior: &Value, path: &AttrPath) -> Attr<Self> {
        match api {
            None => Attr::Null,
            Some(api) => Attr::Known(Self {
                kind: to_optional_string(api.kind.clone(), prior, &path.child("type")),
                format: to_optional_string(api.format.clone(), prior, &path.child("format")),
                pub_file: to_optional_string(api.pub_file.clone(), prior, &path.child("pub_file")),
            }),
        }
    }

    pub fn to_api(&self) -> EndpointKeyInfo {
        EndpointKeyInfo {
            kind: self.kind.to_option(),
            format: self.format.to_option(),
            pub_file: self.pub_file.to_option(),
        }
    }
}

// ============ Reload info ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadInfoModel {
    pub method: Attr<String>,
    pub pid_file: Attr<String>,
    pub signal: Attr<i64>,
    pub unit_name: Attr<String>,
}

impl ReloadInfoModel {
    pub fn schema() -> Result<BTreeMap<String, Attribute>> {
        Ok(SchemaBuilder::for_component("endpointReloadInfo")?
            .attr("method", Attribute::string().required().one_of(RELOAD_METHODS))
            .attr("pid_file", Attribute::string().optional())
            .attr("signal", Attribute::int().optional())
            .attr("unit_name", Attribute::string().optional())
            .attributes())
    }

    pub fn from_api(api: Option<&EndpointReloadInfo>, prior: &Value, path: &AttrPath) -> Attr<Self> {
        match api {
            None => Attr::Null,
            Some(api) => Attr::Known(Self {
                method: Attr::Known(api.method.clone()),
                pid_file: to_optional_string(api.pid_file.clone(), prior, &path.child("pid_file")),
                signal: to_optional_int(to_int64_ptr(api.signal), prior, &path.child("signal")),
                unit_name: to_optional_string(api.unit_name.clone(), prior, &path.child("unit_name")),
            }),
        }
    }

    pub fn to_api(&self, path: &AttrPath) -> std::result::Result<EndpointReloadInfo, Diagnostic> {
        Ok(EndpointReloadInfo {
            method: self.method.to_option().unwrap_or_default(),
            pid_file: self.pid_file.to_option(),
            signal: to_int_ptr(self.signal.to_option(), &path.child("signal"))?,
            unit_name: self.unit_name.to_option(),
        })
    }
}

// ============ Hooks ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookModel {
    pub shell: Attr<String>,
    pub before: Attr<Vec<String>>,
    pub after: Attr<Vec<String>>,
    pub on_error: Attr<Vec<String>>,
}

impl HookModel {
    fn schema() -> Result<BTreeMap<String, Attribute>> {
        Ok(SchemaBuilder::for_component("endpointHook")?
            .attr("shell", Attribute::string().optional())
            .attr("before", Attribute::list(ElementKind::String).optional())
            .attr("after", Attribute::list(ElementKind::String).optional())
            .attr("on_error", Attribute::list(ElementKind::String).optional())
            .attributes())
    }

    fn from_api(api: Option<&EndpointHook>, prior: &Value, path: &AttrPath) -> Attr<Self> {
        api.map_or(Attr::Null, |api| {
            Attr::Known(Self {
                shell: to_optional_string(api.shell.clone(), prior, &path.child("shell")),
                before: to_optional_list(api.before.clone(), prior, &path.child("before")),
                after: to_optional_list(api.after.clone(), prior, &path.child("after")),
                on_error: to_optional_list(api.on_error.clone(), prior, &path.child("on_error")),
            })
        })
    }

    fn to_api(&self) -> EndpointHook {
        EndpointHook {
            shell: self.shell.to_option(),
            before: self.before.to_option(),
            after: self.after.to_option(),
            on_error: self.on_error.to_option(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksModel {
    pub sign: Attr<HookModel>,
    pub renew: Attr<HookModel>,
}

impl HooksModel {
    pub fn schema() -> Result<BTreeMap<String, Attribute>> {
        let builder = SchemaBuilder::for_component("endpointHooks")?;
        let hook = HookModel::schema()?;
        Ok(builder
            .attr_as(
                "sign",
                "sign",
                Attribute::object(hook.clone())
                    .optional()
                    .describe("The commands to run when a certificate is signed."),
            )
            .attr_as(
                "renew",
                "renew",
                Attribute::object(hook)
                    .optional()
                    .describe("The commands to run when a certificate is renewed."),
            )
            .attributes())
    }

    pub fn from_api(api: Option<&EndpointHooks>, prior: &Value, path: &AttrPath) -> Attr<Self> {
        api.map_or(Attr::Null, |api| {
            Attr::Known(Self {
                sign: HookModel::from_api(api.sign.as_ref(), prior, &path.child("sign")),
                renew: HookModel::from_api(api.renew.as_ref(), prior, &path.child("renew")),
            })
        })
    }

    pub fn to_api(&self) -> EndpointHooks {
        EndpointHooks {
            sign: self.sign.as_known().map(HookModel::to_api),
            renew: self.renew.as_known().map(HookModel::to_api),
        }
    }
}

// ============ Certificate fields ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateFieldModel {
    #[serde(rename = "static")]
    pub value: Attr<String>,
    pub device_metadata: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateFieldListModel {
    #[serde(rename = "static")]
    pub values: Attr<Vec<String>>,
    pub device_metadata: Attr<Vec<String>>,
}

/// List-valued certificate fields, in schema order
const LIST_FIELDS: [&str; 8] = [
    "sans",
    "organization",
    "organizational_unit",
    "locality",
    "province",
    "country",
    "street_address",
    "postal_code",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateFieldsModel {
    pub common_name: Attr<CertificateFieldModel>,
    pub sans: Attr<CertificateFieldListModel>,
    pub organization: Attr<CertificateFieldListModel>,
    pub organizational_unit: Attr<CertificateFieldListModel>,
    pub locality: Attr<CertificateFieldListModel>,
    pub province: Attr<CertificateFieldListModel>,
    pub country: Attr<CertificateFieldListModel>,
    pub street_address: Attr<CertificateFieldListModel>,
    pub postal_code: Attr<CertificateFieldListModel>,
}

fn field_branches(kind: Attribute, list_kind: Attribute, component: &str) -> Result<BTreeMap<String, Attribute>> {
    Ok(SchemaBuilder::for_component(component)?
        .attr_as("static", "static", kind.optional().exactly_one_of(["device_metadata"]))
        .attr("device_metadata", list_kind.optional().exactly_one_of(["static"]))
        .attributes())
}

impl CertificateFieldsModel {
    pub fn schema() -> Result<BTreeMap<String, Attribute>> {
        let single = field_branches(Attribute::string(), Attribute::string(), "certificateField")?;
        let list = field_branches(
            Attribute::list(ElementKind::String),
            Attribute::list(ElementKind::String),
            "certificateFieldList",
        )?;

        let mut builder = SchemaBuilder::for_component("certificateFields")?
            .attr("common_name", Attribute::object(single).optional().describe(
                "The certificate's common name, either static or taken from device metadata.",
            ));
        for name in LIST_FIELDS {
            builder = builder.attr(
                name,
                Attribute::object(list.clone()).optional().describe(format!(
                    "The certificate's {}, either static or taken from device metadata.",
                    name.replace('_', " ")
                )),
            );
        }
        Ok(builder.attributes())
    }

    fn lists(&self) -> [(&'static str, &Attr<CertificateFieldListModel>); 8] {
        [
            ("sans", &self.sans),
            ("organization", &self.organization),
            ("organizational_unit", &self.organizational_unit),
            ("locality", &self.locality),
            ("province", &self.province),
            ("country", &self.country),
            ("street_address", &self.street_address),
            ("postal_code", &self.postal_code),
        ]
    }

    pub fn from_api(
        api: Option<&CertificateFields>,
        prior: &Value,
        path: &AttrPath,
    ) -> std::result::Result<Attr<Self>, Diagnostic> {
        let Some(api) = api else {
            return Ok(Attr::Null);
        };

        let common_name = match &api.common_name {
            None => Attr::Null,
            Some(union) => {
                let field_path = path.child("common_name");
                Attr::Known(single_from_api(union, prior, &field_path)?)
            }
        };

        let list = |union: &Option<Union>, name: &str| -> std::result::Result<_, Diagnostic> {
            match union {
                None => Ok(Attr::Null),
                Some(union) => list_from_api(union, prior, &path.child(name)).map(Attr::Known),
            }
        };

        Ok(Attr::Known(Self {
            common_name,
            sans: list(&api.sans, "sans")?,
            organization: list(&api.organization, "organization")?,
            organizational_unit: list(&api.organizational_unit, "organizational_unit")?,
            locality: list(&api.locality, "locality")?,
            province: list(&api.province, "province")?,
            country: list(&api.country, "country")?,
            street_address: list(&api.street_address, "street_address")?,
            postal_code: list(&api.postal_code, "postal_code")?,
        }))
    }

    pub fn to_api(&self, path: &AttrPath) -> std::result::Result<CertificateFields, Diagnostics> {
        let mut diags = Diagnostics::new();

        let common_name = self.common_name.as_known().and_then(|field| {
            single_to_api(field, &path.child("common_name"))
                .map_err(|d| diags.push(d))
                .ok()
        });

        let mut lists: BTreeMap<&str, Union> = BTreeMap::new();
        for (name, field) in self.lists() {
            if let Some(field) = field.as_known() {
                match list_to_api(field, &path.child(name)) {
                    Ok(union) => {
                        lists.insert(name, union);
                    }
                    Err(d) => diags.push(d),
                }
            }
        }

        diags.into_result(CertificateFields {
            common_name,
            sans: lists.remove("sans"),
            organization: lists.remove("organization"),
            organizational_unit: lists.remove("organizational_unit"),
            locality: lists.remove("locality"),
            province: lists.remove("province"),
            country: lists.remove("country"),
            street_address: lists.remove("street_address"),
            postal_code: lists.remove("postal_code"),
        })
    }
}

fn field_parse_error(path: &AttrPath, detail: impl Into<String>) -> Diagnostic {
    Diagnostic::error("Failed to parse certificate field", detail)
        .with_kind(ErrorKind::ParseError)
        .at(path)
}

fn single_from_api(
    union: &Union,
    prior: &Value,
    path: &AttrPath,
) -> std::result::Result<CertificateFieldModel, Diagnostic> {
    if union.contains_key(CERTIFICATE_FIELD_STATIC) {
        let field: CertificateFieldStatic = union
            .as_variant("static certificate field")
            .map_err(|e| field_parse_error(path, e.to_string()))?;
        Ok(CertificateFieldModel {
            value: to_optional_string(Some(field.value), prior, &path.child("static")),
            device_metadata: Attr::Null,
        })
    } else if union.contains_key(CERTIFICATE_FIELD_DEVICE_METADATA) {
        let field: CertificateFieldDeviceMetadata = union
            .as_variant("device metadata certificate field")
            .map_err(|e| field_parse_error(path, e.to_string()))?;
        Ok(CertificateFieldModel {
            value: Attr::Null,
            device_metadata: to_optional_string(
                Some(field.device_metadata),
                prior,
                &path.child("device_metadata"),
            ),
        })
    } else {
        Err(field_parse_error(path, "neither static nor deviceMetadata is set"))
    }
}

fn list_from_api(
    union: &Union,
    prior: &Value,
    path: &AttrPath,
) -> std::result::Result<CertificateFieldListModel, Diagnostic> {
    if union.contains_key(CERTIFICATE_FIELD_STATIC) {
        let field: CertificateFieldListStatic = union
            .as_variant("static certificate field list")
            .map_err(|e| field_parse_error(path, e.to_string()))?;
        Ok(CertificateFieldListModel {
            values: to_optional_list(Some(field.values), prior, &path.child("static")),
            device_metadata: Attr::Null,
        })
    } else if union.contains_key(CERTIFICATE_FIELD_DEVICE_METADATA) {
        let field: CertificateFieldListDeviceMetadata = union
            .as_variant("device metadata certificate field list")
            .map_err(|e| field_parse_error(path, e.to_string()))?;
        Ok(CertificateFieldListModel {
            values: Attr::Null,
            device_metadata: to_optional_list(
                Some(field.device_metadata),
                prior,
                &path.child("device_metadata"),
            ),
        })
    } else {
        Err(field_parse_error(path, "neither static nor deviceMetadata is set"))
    }
}

fn one_branch(path: &AttrPath, has_static: bool, has_metadata: bool) -> std::result::Result<bool, Diagnostic> {
    match (has_static, has_metadata) {
        (true, false) => Ok(true),
        (false, true) => Ok(false),
        (both, _) => Err(Diagnostic::error(
            "Invalid attribute combination",
            format!(
                "{}: exactly one of static or device_metadata must be set, found {}",
                path,
                if both { 2 } else { 0 }
            ),
        )
        .with_kind(ErrorKind::ParseError)
        .at(path)),
    }
}

fn single_to_api(field: &CertificateFieldModel, path: &AttrPath) -> std::result::Result<Union, Diagnostic> {
    if one_branch(path, field.value.is_known(), field.device_metadata.is_known())? {
        encode_variant(
            &CertificateFieldStatic {
                value: field.value.to_option().unwrap_or_default(),
            },
            path,
        )
    } else {
        encode_variant(
            &CertificateFieldDeviceMetadata {
                device_metadata: field.device_metadata.to_option().unwrap_or_default(),
            },
            path,
        )
    }
}

fn list_to_api(field: &CertificateFieldListModel, path: &AttrPath) -> std::result::Result<Union, Diagnostic> {
    if one_branch(path, field.values.is_known(), field.device_metadata.is_known())? {
        encode_variant(
            &CertificateFieldListStatic {
                values: field.values.to_option().unwrap_or_default(),
            },
            path,
        )
    } else {
        encode_variant(
            &CertificateFieldListDeviceMetadata {
                device_metadata: field.device_metadata.to_option().unwrap_or_default(),
            },
            path,
        )
    }
}
