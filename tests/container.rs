use dicon::{
    Bind, Config, Container,
    DefaultScope::{Multiton, Singleton, Unscoped},
    DiAware as _, ImportErrorKind, InstantiateErrorKind, Key, Module, RegistryBuilder, ResolveErrorKind,
};
use std::sync::{
    atomic::{AtomicBool, AtomicU8, Ordering},
    Arc, Mutex,
};

#[derive(Debug)]
struct A(Arc<B>);
#[derive(Debug)]
struct B(Arc<A>);

#[derive(Debug)]
struct Counter(u8);
struct Service(Arc<Counter>);

fn container(modules: &[Module]) -> Container {
    let builder = modules
        .iter()
        .try_fold(RegistryBuilder::new(), |builder, module| builder.import(module))
        .unwrap();
    Container::new(builder.build())
}

#[test]
fn test_unscoped_distinct_instances() {
    let container = container(&[Module::new("test").provide(Bind::new(), Unscoped, |_| Ok(Counter(0)))]);

    let first = container.instance::<Counter>(()).unwrap();
    let second = container.instance::<Counter>(()).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_singleton_same_instance() {
    let container = container(&[Module::new("test")
        .provide(Bind::new(), Singleton, |_| Ok(Counter(0)))
        .provide(Bind::new(), Unscoped, |di| Ok(Service(di.instance(())?)))]);

    let first = container.instance::<Service>(()).unwrap();
    let second = container.instance::<Service>(()).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.0, &second.0));
    assert!(Arc::ptr_eq(&first.0, &container.instance::<Counter>(()).unwrap()));
}

#[test]
fn test_tags_are_distinct_bindings() {
    let container = container(&[Module::new("test")
        .provide(Bind::new(), Singleton, |_| Ok(Counter(0)))
        .provide(Bind::tagged("one"), Singleton, |_| Ok(Counter(1)))
        .provide(Bind::tagged(String::from("two")), Singleton, |_| Ok(Counter(2)))]);

    assert_eq!(container.instance::<Counter>(()).unwrap().0, 0);
    assert_eq!(container.instance::<Counter>("one").unwrap().0, 1);
    assert_eq!(container.instance::<Counter>(Some("two")).unwrap().0, 2);
    assert_eq!(container.instance::<Counter>(None::<&str>).unwrap().0, 0);
}

#[test]
fn test_dependency_loop() {
    let container = container(&[Module::new("test")
        .provide(Bind::new(), Singleton, |di| Ok(A(di.instance(())?)))
        .provide(Bind::new(), Singleton, |di| Ok(B(di.instance(())?)))]);

    let Err(ResolveErrorKind::DependencyLoop { cycle }) = container.instance::<A>(()) else {
        panic!("dependency loop expected");
    };
    assert_eq!(
        cycle,
        [
            Key::of::<A, (), ()>(None),
            Key::of::<B, (), ()>(None),
            Key::of::<A, (), ()>(None),
        ]
    );
    assert_eq!(
        ResolveErrorKind::DependencyLoop { cycle }.to_string(),
        "Dependency loop detected: A -> B -> A"
    );

    // Slots released by the failure are claimed again by the next retrieval
    assert!(container.instance::<B>(()).unwrap_err().is_dependency_loop());
}

#[test]
fn test_dependency_loop_through_or_none() {
    let container = container(&[Module::new("test")
        .provide(Bind::new(), Unscoped, |di| {
            Ok(A(di.instance_or_none(())?.ok_or_else(|| anyhow::anyhow!("no B"))?))
        })
        .provide(Bind::new(), Unscoped, |di| Ok(B(di.instance(())?)))]);

    assert!(container.instance::<A>(()).unwrap_err().is_dependency_loop());
}

#[test]
fn test_not_found() {
    let container = container(&[]);

    let Err(ResolveErrorKind::NotFound { key }) = container.instance::<Counter>("missing") else {
        panic!("not found expected");
    };
    assert_eq!(key, Key::of::<Counter, (), ()>(Some("missing".into())));
    assert!(container.instance_or_none::<Counter>(()).unwrap().is_none());
}

#[test]
fn test_or_none_propagates_nested_not_found() {
    let container = container(&[Module::new("test").provide(Bind::new(), Unscoped, |di| Ok(Service(di.instance(())?)))]);

    let Err(ResolveErrorKind::NotFound { key }) = container.instance_or_none::<Service>(()) else {
        panic!("nested not found expected");
    };
    assert_eq!(key, Key::of::<Counter, (), ()>(None));
}

#[test]
fn test_failure_then_retry() {
    let fail = Arc::new(AtomicBool::new(true));
    let container = container(&[Module::new("test").provide(Bind::new(), Singleton, {
        let fail = fail.clone();
        move |_| {
            if fail.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("not ready").into());
            }
            Ok(Counter(1))
        }
    })]);

    let Err(ResolveErrorKind::Instantiate { key, source }) = container.instance::<Counter>(()) else {
        panic!("instantiate error expected");
    };
    assert_eq!(key, Key::of::<Counter, (), ()>(None));
    assert_eq!(source.to_string(), "not ready");

    fail.store(false, Ordering::SeqCst);
    assert_eq!(container.instance::<Counter>(()).unwrap().0, 1);
}

#[test]
fn test_count_scenario() {
    let count = Arc::new(AtomicU8::new(0));
    let container = container(&[Module::new("test")
        .instance(Bind::tagged("count"), 42u32)
        .provide(Bind::new(), Unscoped, {
            let count = count.clone();
            move |di| {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(format!("{}", di.instance::<u32>("count")?))
            }
        })]);

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(*container.instance::<String>(()).unwrap(), "42");
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_tagged_singleton_created_once() {
    let calls = Arc::new(AtomicU8::new(0));
    let container = container(&[Module::new("test").provide(Bind::tagged("count"), Singleton, {
        let calls = calls.clone();
        move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42i32)
        }
    })]);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(*container.instance::<i32>("count").unwrap(), 42);
    assert_eq!(*container.instance::<i32>("count").unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_factory_argument_and_singleton_keeps_first() {
    let container = container(&[Module::new("test")
        .factory(Bind::new(), Unscoped, |_, value: u8| Ok(Counter(value)))
        .factory(Bind::tagged("first"), Singleton, |_, value: u8| Ok(Counter(value)))]);

    let factory = container.factory::<Counter, u8>(()).unwrap();
    assert_eq!(factory.call(1).unwrap().0, 1);
    assert_eq!(factory.call(2).unwrap().0, 2);

    assert_eq!(container.instance_with::<Counter, _>("first", 1u8).unwrap().0, 1);
    assert_eq!(container.instance_with::<Counter, _>("first", 2u8).unwrap().0, 1);
}

#[test]
fn test_import_idempotent() {
    let calls = Arc::new(AtomicU8::new(0));
    let shared = Module::new("shared").provide(Bind::new(), Singleton, {
        let calls = calls.clone();
        move |_| Ok(Counter(calls.fetch_add(1, Ordering::SeqCst)))
    });

    let container = container(&[
        shared.clone(),
        Module::new("first").import_once(shared.clone()),
        Module::new("second").import_once(shared),
    ]);

    assert_eq!(container.registry().len(), 1);
    assert_eq!(container.instance::<Counter>(()).unwrap().0, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_module_name_reused() {
    struct Database;
    struct Cache;

    let result = RegistryBuilder::new()
        .import(&Module::new("app").provide(Bind::new(), Singleton, |_| Ok(Database)))
        .unwrap()
        .import(&Module::new("app").provide(Bind::new(), Singleton, |_| Ok(Cache)));

    let Err(ImportErrorKind::ModuleConflict { name }) = result else {
        panic!("module conflict expected");
    };
    assert_eq!(name, "app");
}

#[test]
fn test_override() {
    let registry = RegistryBuilder::new()
        .import(&Module::new("production").provide(Bind::new(), Singleton, |_| Ok(Counter(0))))
        .unwrap()
        .build();

    let container = Container::new(
        RegistryBuilder::extend(&registry)
            .import(&Module::new("tests").provide(Bind::new().overrides(), Singleton, |_| Ok(Counter(1))))
            .unwrap()
            .build(),
    );
    assert_eq!(container.instance::<Counter>(()).unwrap().0, 1);

    let result = RegistryBuilder::extend(&registry).import(&Module::new("tests").provide(Bind::new(), Singleton, |_| Ok(Counter(1))));
    assert!(matches!(result, Err(ImportErrorKind::BindingConflict { .. })));

    let result = RegistryBuilder::new().import(&Module::new("tests").provide(Bind::new().overrides(), Singleton, |_| Ok(Counter(1))));
    assert!(matches!(result, Err(ImportErrorKind::NothingToOverride { .. })));
}

#[test]
fn test_silent_override() {
    let container = Container::new(
        RegistryBuilder::with_config(Config {
            allow_silent_override: true,
            ..Config::default()
        })
        .import(&Module::new("first").provide(Bind::new(), Singleton, |_| Ok(Counter(0))))
        .unwrap()
        .import(&Module::new("second").provide(Bind::new(), Singleton, |_| Ok(Counter(1))))
        .unwrap()
        .build(),
    );

    assert_eq!(container.instance::<Counter>(()).unwrap().0, 1);
}

#[test]
fn test_finalizers_on_close() {
    let finalized = Arc::new(Mutex::new(Vec::new()));
    let module = Module::new("test")
        .provide(Bind::new(), Singleton, |_| Ok(Counter(0)))
        .provide(Bind::new(), Singleton, |di| Ok(Service(di.instance(())?)))
        .provide(Bind::tagged("unscoped"), Unscoped, |_| Ok(Counter(1)))
        .add_finalizer(None::<&str>, {
            let finalized = finalized.clone();
            move |counter: Arc<Counter>| finalized.lock().unwrap().push(format!("Counter({})", counter.0))
        })
        .add_finalizer("unscoped", {
            let finalized = finalized.clone();
            move |counter: Arc<Counter>| finalized.lock().unwrap().push(format!("Unscoped({})", counter.0))
        })
        .add_finalizer((), {
            let finalized = finalized.clone();
            move |_: Arc<Service>| finalized.lock().unwrap().push(String::from("Service"))
        });
    let container = container(&[module]);

    container.instance::<Service>(()).unwrap();
    container.instance::<Counter>("unscoped").unwrap();
    container.close();

    // Dependencies are created first, so finalized last
    assert_eq!(*finalized.lock().unwrap(), ["Service", "Counter(0)"]);

    // Closing again finalizes nothing
    container.close();
    assert_eq!(finalized.lock().unwrap().len(), 2);
}

#[test]
fn test_finalizers_on_drop() {
    let finalized = Arc::new(AtomicBool::new(false));
    {
        let container = container(&[Module::new("test")
            .provide(Bind::new(), Multiton, |_| Ok(Counter(0)))
            .add_finalizer((), {
                let finalized = finalized.clone();
                move |_: Arc<Counter>| finalized.store(true, Ordering::SeqCst)
            })]);
        container.instance::<Counter>(()).unwrap();
    }

    assert!(finalized.load(Ordering::SeqCst));
}

#[test]
fn test_containers_are_isolated() {
    let module = Module::new("test").provide(Bind::new(), Singleton, |_| Ok(Counter(0)));
    let first = container(&[module.clone()]);
    let second = container(&[module]);

    assert!(!Arc::ptr_eq(
        &first.instance::<Counter>(()).unwrap(),
        &second.instance::<Counter>(()).unwrap()
    ));
}

#[test]
fn test_custom_error_through_question_mark() {
    let container = container(&[Module::new("test").provide(Bind::new(), Unscoped, |_| {
        let value: u8 = "256".parse().map_err(anyhow::Error::from)?;
        Ok(Counter(value))
    })]);

    let err = container.instance::<Counter>(()).unwrap_err();
    assert!(matches!(err, ResolveErrorKind::Instantiate { .. }));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_instantiate_error_converts() {
    let err: InstantiateErrorKind = ResolveErrorKind::NotFound {
        key: Key::of::<Counter, (), ()>(None),
    }
    .into();

    assert_eq!(err.to_string(), "No binding found for Counter");
}
