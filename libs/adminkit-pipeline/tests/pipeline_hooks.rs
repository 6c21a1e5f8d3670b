#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use adminkit_db::{Page, Record};
use adminkit_pipeline::builtin::names;
use adminkit_pipeline::{
    AfterFind, AuditEvent, AuditSink, BeforeCreate, CallbackRegistry, LifecycleRegistry, Phase,
    Pipeline, PipelineError, Processor, callback_fn,
};
use adminkit_security::SecurityContext;
use async_trait::async_trait;
use common::{A, ALICE, Fixture, ROOT, ctx, ids, record};
use parking_lot::Mutex;
use serde_json::{Value, json};

#[tokio::test]
async fn failing_callback_rolls_back_the_insert() {
    let fx = Fixture::new("hooks_rollback").await;
    let callbacks = Arc::new(CallbackRegistry::with_builtins());
    callbacks
        .register(
            Processor::new(
                Phase::Create,
                "app:reject",
                callback_fn(|_| anyhow::bail!("quota exceeded")),
            )
            .after(names::CREATE),
        )
        .unwrap();
    let pipeline = fx.pipeline_with(callbacks, LifecycleRegistry::new());

    let err = pipeline
        .create(&ctx(ALICE, A), "user", record(json!({"id": "n1"})))
        .await
        .unwrap_err();
    match err {
        PipelineError::Hook { name, message } => {
            assert_eq!(name, "app:reject");
            assert_eq!(message, "quota exceeded");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let rows = pipeline
        .query(&ctx(ROOT, A), "user", &json!({"id": "n1"}), Page::default())
        .await
        .unwrap();
    assert!(rows.rows.is_empty());
}

#[tokio::test]
async fn callbacks_can_narrow_the_filter_and_short_circuit() {
    let fx = Fixture::new("hooks_filter").await;
    let callbacks = Arc::new(CallbackRegistry::with_builtins());
    callbacks
        .register(
            Processor::new(
                Phase::Query,
                "app:only_adults",
                callback_fn(|scope| {
                    let table = scope.meta().table().to_owned();
                    scope.filter_mut().push_fragment(adminkit_db::Predicate::Compare {
                        column: adminkit_db::filter::ColumnRef::new(table, "age"),
                        op: adminkit_db::filter::CompareOp::Gte,
                        value: json!(18),
                    });
                    Ok(())
                }),
            )
            .after(names::INJECT_SCOPE),
        )
        .unwrap();
    let pipeline = fx.pipeline_with(callbacks.clone(), LifecycleRegistry::new());

    let out = pipeline
        .query(&ctx(ALICE, A), "user", &json!({}), Page::default())
        .await
        .unwrap();
    assert_eq!(ids(&out.rows), ["u1", "u4"]);

    callbacks
        .register(
            Processor::new(
                Phase::Query,
                "app:maintenance",
                callback_fn(|scope| {
                    scope.skip_rest();
                    Ok(())
                }),
            )
            .before(names::QUERY),
        )
        .unwrap();
    let out = pipeline
        .query(&ctx(ALICE, A), "user", &json!({}), Page::default())
        .await
        .unwrap();
    assert!(out.rows.is_empty());
    assert_eq!(
        callbacks.names(Phase::Query)[..5],
        [
            names::COMPILE_FILTER,
            names::INJECT_SCOPE,
            "app:only_adults",
            names::EXCLUDE_DELETED,
            "app:maintenance",
        ]
    );
}

#[tokio::test]
async fn removed_builtin_no_longer_runs() {
    let fx = Fixture::new("hooks_remove").await;
    let callbacks = Arc::new(CallbackRegistry::with_builtins());
    callbacks.remove(Phase::Query, names::REDACT_SECRETS).unwrap();
    let pipeline = fx.pipeline_with(callbacks, LifecycleRegistry::new());

    let out = pipeline
        .query(&ctx(ALICE, A), "user", &json!({"id": "u1"}), Page::default())
        .await
        .unwrap();
    assert_eq!(out.rows[0]["password"], json!("secret"));
}

struct TitleCase;

impl BeforeCreate for TitleCase {
    fn before_create(&self, record: &mut Record, _ctx: &SecurityContext) -> anyhow::Result<()> {
        let Some(Value::String(name)) = record.get_mut("name") else {
            anyhow::bail!("name is required");
        };
        *name = name.to_uppercase();
        Ok(())
    }
}

struct Greeting;

impl AfterFind for Greeting {
    fn after_find(&self, record: &mut Record, ctx: &SecurityContext) -> anyhow::Result<()> {
        let viewer = ctx.principal_id();
        record.insert("viewer".to_owned(), json!(viewer.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn lifecycle_capabilities_run_for_their_entity() {
    let fx = Fixture::new("hooks_lifecycle").await;
    let lifecycle = LifecycleRegistry::new()
        .on_before_create("user", Arc::new(TitleCase))
        .on_after_find("user", Arc::new(Greeting));
    let pipeline = fx.pipeline_with(Arc::new(CallbackRegistry::with_builtins()), lifecycle);

    pipeline
        .create(&ctx(ALICE, A), "user", record(json!({"id": "n1", "name": "ada"})))
        .await
        .unwrap();
    let out = pipeline
        .query(&ctx(ALICE, A), "user", &json!({"id": "n1"}), Page::default())
        .await
        .unwrap();
    assert_eq!(out.rows[0]["name"], json!("ADA"));
    assert_eq!(out.rows[0]["viewer"], json!(ALICE.to_string()));

    let err = pipeline
        .create(&ctx(ALICE, A), "user", record(json!({"id": "n2"})))
        .await
        .unwrap_err();
    assert!(
        matches!(err, PipelineError::Hook { ref name, .. } if name == names::BEFORE_CREATE),
        "{err:?}"
    );

    // other entities have no capability registered
    pipeline
        .create(&ctx(ALICE, A), "dept", record(json!({"id": "d1"})))
        .await
        .unwrap();
}

#[derive(Default)]
struct Collecting {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditSink for Collecting {
    async fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

#[tokio::test]
async fn audit_receives_one_event_per_operation() {
    let fx = Fixture::new("hooks_audit").await;
    let sink = Arc::new(Collecting::default());
    let pipeline = Pipeline::builder(fx.db.clone(), fx.metadata.clone(), fx.resolver.client())
        .audit(sink.clone())
        .build();

    pipeline
        .query(&ctx(ALICE, A), "user", &json!({}), Page::default())
        .await
        .unwrap();
    pipeline
        .update(&ctx(ALICE, A), "user", &json!({"id": "u1"}), record(json!({"age": 31})))
        .await
        .unwrap();

    let events = sink.events.lock();
    assert_eq!(events.len(), 2);
    assert_eq!((events[0].phase, events[0].rows), (Phase::Query, 3));
    assert_eq!((events[1].phase, events[1].rows), (Phase::Update, 1));
    assert_eq!(events[1].principal_id, ALICE);
}
