//! Shared fixtures: a small order domain described through class descriptors
#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use morphe_engine::meta::{
    ClassDescriptor, ClassKind, ConstructorDescriptor, MethodDescriptor, ParameterDescriptor,
    TypeRef, TypeRegistry,
};
use morphe_engine::{ManagedObject, MetaModelConfig, SpecificationLoader, Value};

// ============================================================================
// Domain
// ============================================================================

/// Order payload
pub struct Order {
    pub status: Mutex<String>,
    pub lines: Mutex<Vec<String>>,
    pub closed: Mutex<bool>,
}

/// Payload shared by every order mixin
pub struct OrderMixin {
    pub order: ManagedObject,
}

/// Money payload
pub struct Money {
    pub cents: i64,
}

pub fn order_object(status: &str) -> ManagedObject {
    ManagedObject::new(
        "Order",
        Order {
            status: Mutex::new(status.to_string()),
            lines: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        },
    )
}

pub fn money_object(cents: i64) -> ManagedObject {
    ManagedObject::new("Money", Money { cents })
}

pub fn order_of(target: &ManagedObject) -> Result<&Order, String> {
    target
        .downcast_ref::<Order>()
        .ok_or_else(|| format!("{} is not an order", target.class_name()))
}

fn mixin_order(target: &ManagedObject) -> Result<&Order, String> {
    let mixin = target
        .downcast_ref::<OrderMixin>()
        .ok_or_else(|| format!("{} is not an order mixin", target.class_name()))?;
    order_of(&mixin.order)
}

fn text(value: Option<&Value>) -> String {
    value.and_then(Value::as_text).unwrap_or_default().to_string()
}

// ============================================================================
// Class descriptors
// ============================================================================

pub fn order_class() -> ClassDescriptor {
    ClassDescriptor::new("Order", ClassKind::Entity)
        .with_logical_type_name("shop.Order")
        .with_method(
            MethodDescriptor::new("getStatus")
                .returning(TypeRef::scalar("String"))
                .with_metadata_text("sequence", "1")
                .with_handle(|target, _| Ok(Value::text(order_of(target)?.status.lock().clone()))),
        )
        .with_method(
            MethodDescriptor::new("setStatus")
                .with_param("status", TypeRef::scalar("String"))
                .with_handle(|target, args| {
                    *order_of(target)?.status.lock() = text(args.first());
                    Ok(Value::Empty)
                }),
        )
        .with_method(
            MethodDescriptor::new("validateStatus")
                .with_param("status", TypeRef::scalar("String"))
                .returning(TypeRef::scalar("String"))
                .with_handle(|_, args| {
                    if text(args.first()) == "cancelled" {
                        Ok(Value::text("Use close instead"))
                    } else {
                        Ok(Value::Null)
                    }
                }),
        )
        .with_method(
            MethodDescriptor::new("isClosed")
                .returning(TypeRef::scalar("bool"))
                .with_metadata_text("sequence", "2")
                .with_handle(|target, _| Ok(Value::Bool(*order_of(target)?.closed.lock()))),
        )
        .with_method(
            MethodDescriptor::new("getParent")
                .returning(TypeRef::class("Order"))
                .with_metadata_flag("optional")
                .with_handle(|_, _| Ok(Value::Null)),
        )
        .with_method(
            MethodDescriptor::new("getLines")
                .returning(TypeRef::collection_of(TypeRef::class("OrderLine")))
                .with_handle(|target, _| {
                    let lines = order_of(target)?.lines.lock().iter().cloned().map(Value::text).collect();
                    Ok(Value::List(lines))
                }),
        )
        .with_method(
            MethodDescriptor::new("close")
                .with_metadata_text("sequence", "2.0")
                .with_handle(|target, _| {
                    *order_of(target)?.closed.lock() = true;
                    Ok(Value::Empty)
                }),
        )
        .with_method(
            MethodDescriptor::new("hideClose")
                .returning(TypeRef::scalar("bool"))
                .with_handle(|target, _| Ok(Value::Bool(order_of(target)?.status.lock().as_str() == "draft"))),
        )
        .with_method(
            MethodDescriptor::new("disableClose")
                .returning(TypeRef::scalar("String"))
                .with_handle(|target, _| {
                    if *order_of(target)?.closed.lock() {
                        Ok(Value::text("Already closed"))
                    } else {
                        Ok(Value::Null)
                    }
                }),
        )
        .with_method(
            MethodDescriptor::new("addLine")
                .with_param("description", TypeRef::scalar("String"))
                .with_param("quantity", TypeRef::scalar("i64"))
                .with_metadata_text("sequence", "1.0")
                .with_handle(|target, args| {
                    let description = text(args.first());
                    let quantity = args.get(1).and_then(Value::as_int).unwrap_or_default();
                    order_of(target)?
                        .lines
                        .lock()
                        .push(format!("{} x{}", description, quantity));
                    Ok(Value::Empty)
                }),
        )
        .with_method(
            MethodDescriptor::new("validateAddLine")
                .with_param("description", TypeRef::scalar("String"))
                .with_param("quantity", TypeRef::scalar("i64"))
                .returning(TypeRef::scalar("String"))
                .with_handle(|_, args| {
                    match args.get(1).and_then(Value::as_int) {
                        Some(quantity) if quantity <= 0 => Ok(Value::text("Quantity must be positive")),
                        _ => Ok(Value::Null),
                    }
                }),
        )
        .with_method(
            MethodDescriptor::new("validate0AddLine")
                .with_param("description", TypeRef::scalar("String"))
                .returning(TypeRef::scalar("String"))
                .with_handle(|_, args| {
                    if text(args.first()).trim().is_empty() {
                        Ok(Value::text("Description required"))
                    } else {
                        Ok(Value::Null)
                    }
                }),
        )
        .with_method(
            MethodDescriptor::new("recalculate")
                .returning(TypeRef::scalar("i64"))
                .with_metadata_text("sequence", "1.1")
                .with_metadata_text("semantics", "idempotent")
                .with_handle(|target, _| Ok(Value::Int(order_of(target)?.lines.lock().len() as i64))),
        )
        .with_method(
            MethodDescriptor::new("hideNothing")
                .returning(TypeRef::scalar("bool"))
                .with_handle(|_, _| Ok(Value::Bool(false))),
        )
        .with_method(
            MethodDescriptor::new("toString")
                .returning(TypeRef::scalar("String"))
                .with_handle(|_, _| Ok(Value::text("Order"))),
        )
}

pub fn order_line_class() -> ClassDescriptor {
    ClassDescriptor::new("OrderLine", ClassKind::Entity).with_method(
        MethodDescriptor::new("getDescription")
            .returning(TypeRef::scalar("String"))
            .with_handle(|_, _| Ok(Value::text("line"))),
    )
}

fn order_mixin_constructor(mixin_class: &'static str) -> ConstructorDescriptor {
    ConstructorDescriptor::new()
        .with_param("order", TypeRef::class("Order"))
        .with_handle(move |args| match args.first() {
            Some(Value::Object(order)) => Ok(ManagedObject::new(
                mixin_class,
                OrderMixin {
                    order: order.clone(),
                },
            )),
            _ => Err("expected an order".to_string()),
        })
}

/// Contributes the `changeStatus` action
pub fn change_status_mixin() -> ClassDescriptor {
    ClassDescriptor::new("Order_changeStatus", ClassKind::Mixin)
        .with_constructor(order_mixin_constructor("Order_changeStatus"))
        .with_method(
            MethodDescriptor::new("act")
                .with_parameter(ParameterDescriptor::new("newStatus", TypeRef::scalar("String")))
                .with_metadata_text("sequence", "3")
                .with_handle(|target, args| {
                    *mixin_order(target)?.status.lock() = text(args.first());
                    Ok(Value::Empty)
                }),
        )
        .with_method(
            MethodDescriptor::new("validate0Act")
                .with_param("newStatus", TypeRef::scalar("String"))
                .returning(TypeRef::scalar("String"))
                .with_handle(|_, args| {
                    if text(args.first()).is_empty() {
                        Ok(Value::text("Status required"))
                    } else {
                        Ok(Value::Null)
                    }
                }),
        )
}

/// Contributes the read-only `summary` property
pub fn summary_mixin() -> ClassDescriptor {
    ClassDescriptor::new("Order_summary", ClassKind::Mixin)
        .with_constructor(order_mixin_constructor("Order_summary"))
        .with_method(
            MethodDescriptor::new("act")
                .returning(TypeRef::scalar("String"))
                .with_metadata_text("semantics", "safe")
                .with_handle(|target, _| {
                    let order = mixin_order(target)?;
                    Ok(Value::text(format!(
                        "{} order, {} lines",
                        order.status.lock(),
                        order.lines.lock().len()
                    )))
                }),
        )
}

/// Contributes the `relatedOrders` collection under an explicit name
pub fn related_orders_mixin() -> ClassDescriptor {
    ClassDescriptor::new("Order_relatedOrders", ClassKind::Mixin)
        .with_constructor(order_mixin_constructor("Order_relatedOrders"))
        .with_method(
            MethodDescriptor::new("act")
                .returning(TypeRef::collection_of(TypeRef::class("Order")))
                .with_metadata_text("semantics", "safe")
                .with_metadata_text("named", "Related")
                .with_handle(|_, _| Ok(Value::List(Vec::new()))),
        )
}

/// Clashes with the declared `close` action
pub fn close_mixin() -> ClassDescriptor {
    ClassDescriptor::new("Order_close", ClassKind::Mixin)
        .with_constructor(order_mixin_constructor("Order_close"))
        .with_method(MethodDescriptor::new("act").with_handle(|_, _| Ok(Value::Empty)))
}

pub fn money_class() -> ClassDescriptor {
    ClassDescriptor::new("Money", ClassKind::Value).with_method(
        MethodDescriptor::new("getCents")
            .returning(TypeRef::scalar("i64"))
            .with_handle(|target, _| {
                let money = target.downcast_ref::<Money>().ok_or("not money")?;
                Ok(Value::Int(money.cents))
            }),
    )
}

fn money_mixin_constructor(mixin_class: &'static str) -> ConstructorDescriptor {
    ConstructorDescriptor::new()
        .with_param("money", TypeRef::class("Money"))
        .with_handle(move |args| match args.first() {
            Some(Value::Object(money)) => Ok(ManagedObject::new(mixin_class, money.clone())),
            _ => Err("expected money".to_string()),
        })
}

/// Returns the mixee type, so it applies to the value type
pub fn doubled_mixin() -> ClassDescriptor {
    ClassDescriptor::new("Money_doubled", ClassKind::Mixin)
        .with_constructor(money_mixin_constructor("Money_doubled"))
        .with_method(
            MethodDescriptor::new("act")
                .returning(TypeRef::class("Money"))
                .with_metadata_text("semantics", "safe")
                .with_handle(|target, _| {
                    let money = target.downcast_ref::<ManagedObject>().ok_or("not a money mixin")?;
                    let cents = money.downcast_ref::<Money>().ok_or("not money")?.cents;
                    Ok(Value::Object(money_object(cents * 2)))
                }),
        )
}

/// Returns text, so it does not apply to the value type
pub fn label_mixin() -> ClassDescriptor {
    ClassDescriptor::new("Money_label", ClassKind::Mixin)
        .with_constructor(money_mixin_constructor("Money_label"))
        .with_method(
            MethodDescriptor::new("act")
                .returning(TypeRef::scalar("String"))
                .with_metadata_text("semantics", "safe")
                .with_handle(|_, _| Ok(Value::text("money"))),
        )
}

/// Party <- Customer <- VipCustomer, Customer implements Auditable
pub fn party_classes() -> Vec<ClassDescriptor> {
    vec![
        ClassDescriptor::new("Party", ClassKind::Abstract)
            .with_metadata_text("named", "Legal party")
            .with_method(
                MethodDescriptor::new("getName")
                    .returning(TypeRef::scalar("String"))
                    .with_handle(|_, _| Ok(Value::text("Acme"))),
            ),
        ClassDescriptor::new("Auditable", ClassKind::Interface),
        ClassDescriptor::new("Customer", ClassKind::Entity)
            .extends("Party")
            .implements("Auditable")
            .with_method(
                MethodDescriptor::new("getBestOrder")
                    .returning(TypeRef::class("Order"))
                    .with_handle(|_, _| Ok(Value::Null)),
            ),
        ClassDescriptor::new("VipCustomer", ClassKind::Entity).extends("Customer"),
    ]
}

// ============================================================================
// Loaders
// ============================================================================

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn register_all(registry: &TypeRegistry, classes: Vec<ClassDescriptor>) {
    for class in classes {
        registry.register(class).expect("fixture classes register");
    }
}

/// The order domain with all of its mixins
pub fn shop_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    let mut classes = vec![
        order_class(),
        order_line_class(),
        change_status_mixin(),
        summary_mixin(),
        related_orders_mixin(),
        close_mixin(),
        money_class(),
        doubled_mixin(),
        label_mixin(),
    ];
    classes.extend(party_classes());
    register_all(&registry, classes);
    registry
}

pub fn shop_loader() -> Arc<SpecificationLoader> {
    init_tracing();
    SpecificationLoader::new(shop_registry(), MetaModelConfig::default())
}

pub fn ids<T: morphe_engine::meta::ObjectMember>(members: &[T]) -> Vec<String> {
    members.iter().map(|m| m.id().to_string()).collect()
}
