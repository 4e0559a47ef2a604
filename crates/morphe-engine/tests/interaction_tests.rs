mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use morphe_engine::meta::{
    ClassDescriptor, ClassKind, CommandLog, ExecutionContext, InteractionInitiatedBy,
    MethodDescriptor, MixedIn, ObjectMember, TypeRef, TypeRegistry, Where,
};
use morphe_engine::{InteractionError, ManagedObject, MetaModelConfig, SpecificationLoader, Value};

use common::*;

const USER: InteractionInitiatedBy = InteractionInitiatedBy::User;
const FRAMEWORK: InteractionInitiatedBy = InteractionInitiatedBy::Framework;

// ============================================================================
// Visibility and usability
// ============================================================================

#[test]
fn test_hide_method_hides_action() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let close = order.get_action("close", MixedIn::Excluded).unwrap();

    let draft = order_object("draft");
    let open = order_object("open");
    assert!(close.is_visible(&draft, USER, Where::Anywhere).is_vetoed());
    assert!(close.is_visible(&open, USER, Where::Anywhere).is_allowed());
    assert!(close.is_visible(&draft, FRAMEWORK, Where::Anywhere).is_allowed());
}

#[test]
fn test_disable_method_reason() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let close = order.get_action("close", MixedIn::Excluded).unwrap();

    let target = order_object("open");
    assert!(close.is_usable(&target, USER, Where::ObjectForms).is_allowed());

    close.execute(&target, &[], &ExecutionContext::user()).unwrap();
    let consent = close.is_usable(&target, USER, Where::ObjectForms);
    assert_eq!(consent.reason(), Some("Already closed"));
    assert!(close.is_usable(&target, FRAMEWORK, Where::ObjectForms).is_allowed());
}

// ============================================================================
// Validity
// ============================================================================

#[test]
fn test_argument_validation() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let add_line = order.get_action("addLine", MixedIn::Excluded).unwrap();
    let target = order_object("open");

    let valid = add_line.is_argument_set_valid(&target, &[Value::text("Pen"), Value::Int(2)], USER);
    assert!(valid.is_allowed());

    let blank = add_line.is_argument_set_valid(&target, &[Value::text(" "), Value::Int(2)], USER);
    assert_eq!(blank.reason(), Some("Description required"));

    let zero = add_line.is_argument_set_valid(&target, &[Value::text("Pen"), Value::Int(0)], USER);
    assert_eq!(zero.reason(), Some("Quantity must be positive"));

    let missing = add_line.is_argument_set_valid(&target, &[Value::Null, Value::Int(1)], USER);
    assert_eq!(
        missing.reason(),
        Some("'description' is mandatory; Description required")
    );

    let short = add_line.is_argument_set_valid(&target, &[Value::text("Pen")], USER);
    assert_eq!(short.reason(), Some("Expected 2 arguments, got 1"));
}

#[test]
fn test_argument_set_results_per_parameter() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let add_line = order.get_action("addLine", MixedIn::Excluded).unwrap();
    let head = add_line
        .core()
        .interaction_head(&order_object("open"))
        .unwrap();

    // The action as a whole is not consulted while a parameter vetoes
    let results = add_line.argument_set_validity(&head, &[Value::text(""), Value::Int(-1)], USER);
    let vetoing: Vec<bool> = results.iter().map(|r| r.is_vetoing()).collect();
    assert_eq!(vetoing, vec![true, false]);

    let results = add_line.argument_set_validity(&head, &[Value::text("Pen"), Value::Int(-1)], USER);
    let vetoing: Vec<bool> = results.iter().map(|r| r.is_vetoing()).collect();
    assert_eq!(vetoing, vec![false, false, true]);
    assert_eq!(
        results.first_vetoing().unwrap().reason().as_deref(),
        Some("Quantity must be positive")
    );
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn test_rule_checking_fails_fast() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let close = order.get_action("close", MixedIn::Excluded).unwrap();
    let add_line = order.get_action("addLine", MixedIn::Excluded).unwrap();
    let ctx = ExecutionContext::user();

    let draft = order_object("draft");
    let hidden = close.execute_with_rule_checking(&draft, &[], &ctx).unwrap_err();
    assert!(matches!(hidden, InteractionError::Hidden { .. }));
    assert_eq!(hidden.reason(), None);
    assert!(!*order_of(&draft).unwrap().closed.lock());

    let target = order_object("open");
    assert_eq!(close.execute_with_rule_checking(&target, &[], &ctx).unwrap(), Value::Empty);
    let disabled = close.execute_with_rule_checking(&target, &[], &ctx).unwrap_err();
    assert!(matches!(disabled, InteractionError::Disabled { .. }));
    assert_eq!(disabled.reason(), Some("Already closed"));
    assert!(!disabled.is_recoverable());

    let invalid = add_line
        .execute_with_rule_checking(&target, &[Value::text("Pen"), Value::Int(0)], &ctx)
        .unwrap_err();
    assert!(invalid.is_recoverable());
    assert_eq!(invalid.to_string(), "Quantity must be positive");
    assert!(order_of(&target).unwrap().lines.lock().is_empty());
}

// ============================================================================
// Job fixture: counts how often each supporting method runs
// ============================================================================

/// Job payload; the flags drive the supporting methods
struct Job {
    hidden: bool,
    disabled: bool,
    fails: bool,
}

#[derive(Default)]
struct JobCalls {
    disable: AtomicUsize,
    validate: AtomicUsize,
    run: AtomicUsize,
}

impl JobCalls {
    fn counts(&self) -> (usize, usize, usize) {
        (
            self.disable.load(Ordering::SeqCst),
            self.validate.load(Ordering::SeqCst),
            self.run.load(Ordering::SeqCst),
        )
    }
}

fn job_object(hidden: bool, disabled: bool, fails: bool) -> ManagedObject {
    ManagedObject::new(
        "Job",
        Job {
            hidden,
            disabled,
            fails,
        },
    )
}

fn job_of(target: &ManagedObject) -> Result<&Job, String> {
    target.downcast_ref::<Job>().ok_or_else(|| "not a job".to_string())
}

fn job_loader(calls: &Arc<JobCalls>) -> Arc<SpecificationLoader> {
    init_tracing();
    let (disable, validate, run) = (calls.clone(), calls.clone(), calls.clone());
    let registry = TypeRegistry::new();
    register_all(
        &registry,
        vec![ClassDescriptor::new("Job", ClassKind::Entity)
            .with_logical_type_name("ops.Job")
            .with_method(MethodDescriptor::new("run").with_handle(move |target, _| {
                run.run.fetch_add(1, Ordering::SeqCst);
                if job_of(target)?.fails {
                    Err("boom".to_string())
                } else {
                    Ok(Value::Empty)
                }
            }))
            .with_method(
                MethodDescriptor::new("hideRun")
                    .returning(TypeRef::scalar("bool"))
                    .with_handle(|target, _| Ok(Value::Bool(job_of(target)?.hidden))),
            )
            .with_method(
                MethodDescriptor::new("disableRun")
                    .returning(TypeRef::scalar("String"))
                    .with_handle(move |target, _| {
                        disable.disable.fetch_add(1, Ordering::SeqCst);
                        if job_of(target)?.disabled {
                            Ok(Value::text("Job is paused"))
                        } else {
                            Ok(Value::Null)
                        }
                    }),
            )
            .with_method(
                MethodDescriptor::new("validateRun")
                    .returning(TypeRef::scalar("String"))
                    .with_handle(move |_, _| {
                        validate.validate.fetch_add(1, Ordering::SeqCst);
                        Ok(Value::Null)
                    }),
            )],
    );
    SpecificationLoader::new(registry, MetaModelConfig::default())
}

#[test]
fn test_hidden_action_skips_remaining_checks() {
    let calls = Arc::new(JobCalls::default());
    let loader = job_loader(&calls);
    let run = loader
        .specification("Job")
        .unwrap()
        .get_action("run", MixedIn::Excluded)
        .unwrap();

    let err = run
        .execute_with_rule_checking(&job_object(true, false, false), &[], &ExecutionContext::user())
        .unwrap_err();
    assert!(matches!(err, InteractionError::Hidden { .. }));
    assert_eq!(calls.counts(), (0, 0, 0));
}

#[test]
fn test_disabled_action_skips_validation_and_invocation() {
    let calls = Arc::new(JobCalls::default());
    let loader = job_loader(&calls);
    let run = loader
        .specification("Job")
        .unwrap()
        .get_action("run", MixedIn::Excluded)
        .unwrap();

    let err = run
        .execute_with_rule_checking(&job_object(false, true, false), &[], &ExecutionContext::user())
        .unwrap_err();
    assert_eq!(err.reason(), Some("Job is paused"));
    assert_eq!(calls.counts(), (1, 0, 0));

    run.execute_with_rule_checking(&job_object(false, false, false), &[], &ExecutionContext::user())
        .unwrap();
    assert_eq!(calls.counts(), (2, 1, 1));
}

#[test]
fn test_failed_invocation_is_still_recorded() {
    let calls = Arc::new(JobCalls::default());
    let loader = job_loader(&calls);
    let run = loader
        .specification("Job")
        .unwrap()
        .get_action("run", MixedIn::Excluded)
        .unwrap();
    let log = CommandLog::new();

    let err = run
        .execute(&job_object(false, false, true), &[], &ExecutionContext::user().with_recorder(&log))
        .unwrap_err();
    assert!(matches!(err, InteractionError::Invocation { .. }));
    assert_eq!(calls.counts(), (0, 0, 1));

    let records = log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identifier.to_string(), "ops.Job#run()");
    assert_eq!(records[0].owner_class, "Job");
}

#[test]
fn test_framework_bypasses_visibility_and_usability() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let close = order.get_action("close", MixedIn::Excluded).unwrap();
    let draft = order_object("draft");

    close
        .execute_with_rule_checking(&draft, &[], &ExecutionContext::framework())
        .unwrap();
    assert!(*order_of(&draft).unwrap().closed.lock());
}

#[test]
fn test_execute_returns_result() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let add_line = order.get_action("addLine", MixedIn::Excluded).unwrap();
    let recalculate = order.get_action("recalculate", MixedIn::Excluded).unwrap();
    let target = order_object("open");
    let ctx = ExecutionContext::user();

    let result = add_line
        .execute(&target, &[Value::text("Pen"), Value::Int(3)], &ctx)
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(recalculate.execute(&target, &[], &ctx).unwrap(), Value::Int(1));
    assert_eq!(order_of(&target).unwrap().lines.lock()[0], "Pen x3");
}

#[test]
fn test_execute_without_rule_checking_ignores_validation() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let add_line = order.get_action("addLine", MixedIn::Excluded).unwrap();
    let target = order_object("open");

    add_line
        .execute(&target, &[Value::text("Pen"), Value::Int(0)], &ExecutionContext::user())
        .unwrap();
    assert_eq!(order_of(&target).unwrap().lines.lock().len(), 1);
}

#[test]
fn test_commands_recorded_unless_pass_through() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let add_line = order.get_action("addLine", MixedIn::Excluded).unwrap();
    let target = order_object("open");
    let log = CommandLog::new();
    let arguments = [Value::text("Pen"), Value::Int(1)];

    let ctx = ExecutionContext::user().with_recorder(&log);
    add_line.execute_with_rule_checking(&target, &arguments, &ctx).unwrap();
    add_line
        .execute_with_rule_checking(&target, &arguments, &ctx.pass_through())
        .unwrap();

    let records = log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identifier.to_string(), "shop.Order#addLine(String,i64)");
    assert_eq!(records[0].owner_class, "Order");
    assert_eq!(records[0].arguments, arguments.to_vec());
    assert_eq!(records[0].initiated_by, USER);
}

#[test]
fn test_rejected_execution_is_not_recorded() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let add_line = order.get_action("addLine", MixedIn::Excluded).unwrap();
    let log = CommandLog::new();

    let ctx = ExecutionContext::user().with_recorder(&log);
    assert!(add_line
        .execute_with_rule_checking(&order_object("open"), &[Value::text(""), Value::Int(1)], &ctx)
        .is_err());
    assert!(log.is_empty());
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_property_get_and_set() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let status = order.get_association("status", MixedIn::Excluded).unwrap();
    let status = status.as_one_to_one().unwrap();
    let target = order_object("open");
    let log = CommandLog::new();
    let ctx = ExecutionContext::user().with_recorder(&log);

    assert_eq!(status.get(&target).unwrap(), Value::text("open"));
    assert!(status.is_modifiable());
    assert!(!status.is_optional());

    let err = status
        .set_with_rule_checking(&target, Value::text("cancelled"), &ctx)
        .unwrap_err();
    assert_eq!(err.reason(), Some("Use close instead"));

    let err = status
        .set_with_rule_checking(&target, Value::Null, &ctx)
        .unwrap_err();
    assert_eq!(err.reason(), Some("'status' is mandatory"));
    assert!(log.is_empty());

    status
        .set_with_rule_checking(&target, Value::text("shipped"), &ctx)
        .unwrap();
    assert_eq!(status.get(&target).unwrap(), Value::text("shipped"));
    assert_eq!(log.records()[0].arguments, vec![Value::text("shipped")]);
    assert_eq!(log.records()[0].identifier.to_string(), "shop.Order#status");
}

#[test]
fn test_property_value_validity_consent() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let status = order.properties(MixedIn::Excluded).remove(0);
    let target = order_object("open");

    assert!(status
        .is_associated_value_valid(&target, &Value::text("shipped"), USER)
        .is_allowed());
    assert_eq!(
        status
            .is_associated_value_valid(&target, &Value::text("cancelled"), USER)
            .reason(),
        Some("Use close instead")
    );
}

#[test]
fn test_property_without_setter_cannot_be_modified() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let closed = order.get_association("closed", MixedIn::Excluded).unwrap();
    let closed = closed.as_one_to_one().unwrap();
    let target = order_object("open");

    assert!(!closed.is_modifiable());
    assert_eq!(closed.get(&target).unwrap(), Value::Bool(false));
    let err = closed
        .set_with_rule_checking(&target, Value::Bool(true), &ExecutionContext::user())
        .unwrap_err();
    assert!(matches!(err, InteractionError::Disabled { .. }));
    assert_eq!(err.reason(), Some("Property cannot be modified"));
}

#[test]
fn test_collection_get() {
    let loader = shop_loader();
    let order = loader.specification("Order").unwrap();
    let lines = order.get_association("lines", MixedIn::Excluded).unwrap();
    let target = order_object("open");
    order_of(&target).unwrap().lines.lock().push("Pen x1".to_string());

    assert_eq!(
        lines.get(&target).unwrap(),
        Value::List(vec![Value::text("Pen x1")])
    );
}
