//! Subcommand implementations. Each returns the JSON document printed on
//! stdout.

use std::sync::Arc;

use adminkit_db::filter::{self, CompileOptions};
use adminkit_db::{Db, Page};
use adminkit_pipeline::Pipeline;
use adminkit_security::SecurityContext;
use anyhow::Context;
use privilege_resolver::PrivilegeResolverModule;
use privilege_resolver_sdk::PrivilegeResolverClient;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::config::AppConfig;

fn parse_filter(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).context("filter is not valid JSON")
}

fn resolver(cfg: &AppConfig) -> PrivilegeResolverModule {
    PrivilegeResolverModule::from_static(&cfg.privilege_resolver, cfg.privileges.clone())
}

/// Registered entities with their table and field names.
///
/// # Errors
/// Fails if the entity descriptors do not validate.
pub fn entities(cfg: &AppConfig) -> anyhow::Result<Value> {
    let registry = cfg.metadata()?;
    let mut names: Vec<&str> = registry.names().collect();
    names.sort_unstable();
    let listed = names
        .into_iter()
        .filter_map(|name| registry.get(name))
        .map(|meta| {
            json!({
                "name": meta.name(),
                "table": meta.table(),
                "unrestricted": meta.is_unrestricted(),
                "fields": meta.fields().iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();
    Ok(Value::Array(listed))
}

/// Compile `raw` against `entity` and show the SQL with its parameters.
///
/// # Errors
/// Fails on invalid JSON, an unknown entity or a malformed filter.
pub fn compile(cfg: &AppConfig, entity: &str, raw: &str) -> anyhow::Result<Value> {
    let registry = cfg.metadata()?;
    let meta = registry
        .get(entity)
        .with_context(|| format!("unknown entity '{entity}'"))?;
    let compiled = filter::compile(
        &parse_filter(raw)?,
        &meta,
        &registry,
        CompileOptions {
            max_depth: cfg.pipeline.max_filter_depth,
        },
    )?;
    Ok(json!({
        "sql": compiled.to_sql(),
        "params": compiled.params(),
        "fragments": compiled
            .fragments_with_params()
            .into_iter()
            .map(|(sql, params)| json!({"sql": sql, "params": params}))
            .collect::<Vec<_>>(),
    }))
}

/// Resolve the privileges of `user` acting in `org`.
///
/// # Errors
/// Fails if the user has no active assignment or the hierarchy is invalid.
pub async fn resolve(cfg: &AppConfig, user: Uuid, org: Uuid) -> anyhow::Result<Value> {
    let ctx = SecurityContext::builder()
        .principal_id(user)
        .active_org_id(org)
        .build();
    let privileges = resolver(cfg).client().resolve(&ctx).await?;
    Ok(serde_json::to_value(privileges)?)
}

/// Run a scoped query through the full pipeline.
///
/// # Errors
/// Fails on connection errors or any pipeline error.
pub async fn query(
    cfg: &AppConfig,
    entity: &str,
    raw: &str,
    ctx: &SecurityContext,
    page: Page,
) -> anyhow::Result<Value> {
    let metadata = Arc::new(cfg.metadata()?);
    let db = Db::connect(&cfg.database.url, cfg.database.connect_opts()).await?;
    let pipeline = Pipeline::builder(db, metadata, resolver(cfg).client())
        .config(cfg.pipeline.clone())
        .build();
    let outcome = pipeline.query(ctx, entity, &parse_filter(raw)?, page).await?;
    Ok(serde_json::to_value(outcome)?)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use adminkit_db::{EntityDescriptor, FieldDescriptor, FieldTag};
    use adminkit_security::DataRange;
    use privilege_resolver::config::StaticSourceConfig;
    use privilege_resolver_sdk::{DataPrivilege, Organization, Role, RoleAssignment};

    use super::*;

    const ORG: Uuid = Uuid::from_u128(0x10);
    const CHILD: Uuid = Uuid::from_u128(0x11);
    const USER: Uuid = Uuid::from_u128(0xa1);

    fn config() -> AppConfig {
        AppConfig {
            entities: vec![
                EntityDescriptor::new("user")
                    .table("users")
                    .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey))
                    .field(FieldDescriptor::new("age"))
                    .field(FieldDescriptor::new("org_id").tag(FieldTag::OwnerOrg)),
                EntityDescriptor::new("setting")
                    .unrestricted()
                    .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey)),
            ],
            privileges: StaticSourceConfig {
                organizations: vec![
                    Organization::new(ORG, "root", None),
                    Organization::new(CHILD, "child", Some(ORG)),
                ],
                roles: vec![Role {
                    id: Uuid::from_u128(1),
                    code: "viewer".to_owned(),
                    name: "Viewer".to_owned(),
                    operation_permissions: vec!["user:read".to_owned()],
                    data_privileges: vec![DataPrivilege::new(
                        ORG,
                        DataRange::CurrentFollowing,
                        DataRange::Current,
                    )],
                }],
                assignments: vec![RoleAssignment::new(USER, Uuid::from_u128(1))],
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn lists_entities_by_name() {
        let out = entities(&config()).unwrap();
        assert_eq!(out[0]["name"], "setting");
        assert_eq!(out[1]["table"], "users");
        assert_eq!(out[1]["fields"], json!(["id", "age", "org_id"]));
    }

    #[test]
    fn compiles_filter_to_sql() {
        let out = compile(&config(), "user", r#"{"age": {"$gte": 18, "$lt": 65}}"#).unwrap();
        assert_eq!(out["params"], json!([18, 65]));
        assert!(out["sql"].as_str().unwrap().contains("users.age"), "{out}");
    }

    #[test]
    fn compile_rejects_unknown_entity_and_bad_json() {
        let err = compile(&config(), "order", "{}").unwrap_err();
        assert!(err.to_string().contains("unknown entity 'order'"));
        let err = compile(&config(), "user", "{age").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn resolves_privileges_from_config() {
        let out = resolve(&config(), USER, ORG).await.unwrap();
        assert_eq!(out["readableOrgIds"], json!([ORG, CHILD]));
        assert_eq!(out["writableOrgIds"], json!([ORG]));

        let err = resolve(&config(), Uuid::from_u128(0xb0), ORG).await.unwrap_err();
        assert!(err.to_string().contains("no valid role assignment"), "{err}");
    }
}
