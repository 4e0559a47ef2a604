mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use morphe_engine::meta::{
    ClassDescriptor, ClassKind, IntrospectionState, MethodDescriptor, MixedIn, TypeRef,
    TypeRegistry,
};
use morphe_engine::{MetaModelConfig, SpecificationLoader};

use common::*;

const THREADS: usize = 8;

#[test]
fn test_concurrent_first_access_introspects_once() {
    let loader = shop_loader();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let loader = loader.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let order = loader.specification("Order").unwrap();
                (order.clone(), ids(&order.actions(MixedIn::Included)))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let (first, expected) = &results[0];
    for (order, actions) in &results {
        assert!(Arc::ptr_eq(order, first));
        assert_eq!(actions, expected);
    }
    assert_eq!(expected, &vec!["addLine", "recalculate", "close", "changeStatus"]);

    let stats = loader.stats();
    let fully_introspected = loader
        .cached_specifications()
        .iter()
        .filter(|s| s.introspection_state() == IntrospectionState::FullyIntrospected)
        .count();
    assert_eq!(stats.mixin_scans, 1);
    assert_eq!(stats.member_stages, fully_introspected);
}

#[test]
fn test_concurrent_mutual_references_do_not_deadlock() {
    init_tracing();
    let registry = TypeRegistry::new();
    register_all(
        &registry,
        vec![
            ClassDescriptor::new("Left", ClassKind::Entity).with_method(
                MethodDescriptor::new("getRight").returning(TypeRef::class("Right")),
            ),
            ClassDescriptor::new("Right", ClassKind::Entity).with_method(
                MethodDescriptor::new("getLeft").returning(TypeRef::class("Left")),
            ),
        ],
    );
    let loader = SpecificationLoader::new(registry, MetaModelConfig::default());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let loader = loader.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let name = if i % 2 == 0 { "Left" } else { "Right" };
                barrier.wait();
                let spec = loader.specification(name).unwrap();
                ids(&spec.associations(MixedIn::Included))
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let expected = if i % 2 == 0 { "right" } else { "left" };
        assert_eq!(handle.join().unwrap(), vec![expected]);
    }
    assert_eq!(loader.stats().member_stages, 2);
}

#[test]
fn test_concurrent_hierarchy_loading() {
    let loader = shop_loader();
    let barrier = Arc::new(Barrier::new(THREADS));
    let names = ["Customer", "VipCustomer", "Party", "Auditable"];

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let loader = loader.clone();
            let barrier = barrier.clone();
            let name = names[i % names.len()];
            thread::spawn(move || {
                barrier.wait();
                loader.specification(name).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let party = loader.lookup_cached("Party").unwrap();
    let direct: Vec<String> = party
        .subclasses(morphe_engine::meta::Depth::Direct)
        .iter()
        .map(|s| s.class().name().to_string())
        .collect();
    assert_eq!(direct, vec!["Customer"]);
    assert_eq!(loader.stats().type_stages, names.len() + 1);
}
