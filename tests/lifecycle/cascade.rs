//! Cascading delete under both policies.

use resource_registry::{
    Api, CallContext, CascadePolicy, EngineOptions, InMemoryStore, Project, Registry,
    RegistryError, Spec, Version,
};

use crate::support::{seed_hierarchy, FaultyStore, API, PROJECT, SPEC, VERSION};

fn registry(store: &FaultyStore, cascade: CascadePolicy) -> Registry<FaultyStore> {
    Registry::with_options(
        store.clone(),
        EngineOptions {
            cascade,
            ..Default::default()
        },
    )
}

#[test]
fn deleting_a_project_removes_every_descendant() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    seed_hierarchy(&registry);
    registry
        .create(&ctx, "", "other", &Project::default())
        .unwrap();
    registry
        .create(&ctx, "projects/other", "petstore", &Api::default())
        .unwrap();

    registry.delete(&ctx, PROJECT).unwrap();

    assert!(registry.get::<Project>(&ctx, PROJECT).unwrap_err().is_not_found());
    assert!(registry.get::<Api>(&ctx, API).unwrap_err().is_not_found());
    assert!(registry.get::<Version>(&ctx, VERSION).unwrap_err().is_not_found());
    assert!(registry.get::<Spec>(&ctx, SPEC).unwrap_err().is_not_found());

    // Siblings sharing an id prefix survive.
    registry.get::<Project>(&ctx, "projects/other").unwrap();
    registry
        .get::<Api>(&ctx, "projects/other/apis/petstore")
        .unwrap();
    assert_eq!(registry.provider().len(), 2);
}

#[test]
fn deleting_a_middle_resource_keeps_its_ancestors() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    seed_hierarchy(&registry);

    registry.delete(&ctx, API).unwrap();

    registry.get::<Project>(&ctx, PROJECT).unwrap();
    assert!(registry.get::<Version>(&ctx, VERSION).unwrap_err().is_not_found());
    assert!(registry.get::<Spec>(&ctx, SPEC).unwrap_err().is_not_found());
}

#[test]
fn prefix_does_not_match_longer_ids() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    registry.create(&ctx, "", "demo", &Project::default()).unwrap();
    registry.create(&ctx, "", "demo2", &Project::default()).unwrap();
    registry
        .create(&ctx, "projects/demo2", "api", &Api::default())
        .unwrap();

    registry.delete(&ctx, PROJECT).unwrap();
    registry
        .get::<Api>(&ctx, "projects/demo2/apis/api")
        .unwrap();
}

#[test]
fn abort_policy_keeps_the_parent_when_a_child_fails() {
    let store = FaultyStore::new();
    let registry = registry(&store, CascadePolicy::Abort);
    let ctx = CallContext::new();
    seed_hierarchy(&registry);
    store.fail_delete_of(VERSION);

    let err = registry.delete(&ctx, PROJECT).unwrap_err();
    assert!(matches!(err, RegistryError::Internal { .. }), "got {err}");
    assert!(std::error::Error::source(&err).is_some());

    // Deepest kinds go first, so the spec is already gone.
    assert!(!store.contains("Spec", SPEC));
    assert!(store.contains("Version", VERSION));
    assert!(store.contains("Api", API));
    assert!(store.contains("Project", PROJECT));
    assert_eq!(store.inner().open_handles(), 0);
}

#[test]
fn abort_policy_delete_can_be_retried() {
    let store = FaultyStore::new();
    let registry = registry(&store, CascadePolicy::Abort);
    let ctx = CallContext::new();
    seed_hierarchy(&registry);
    store.fail_delete_of(VERSION);
    registry.delete(&ctx, PROJECT).unwrap_err();

    // Same data, no injected faults.
    let retry = Registry::new(store.inner().clone());
    retry.delete(&ctx, PROJECT).unwrap();
    assert!(retry.provider().is_empty());
}

#[test]
fn best_effort_policy_deletes_the_parent_anyway() {
    let store = FaultyStore::new();
    let registry = registry(&store, CascadePolicy::BestEffort);
    let ctx = CallContext::new();
    seed_hierarchy(&registry);
    store.fail_delete_of(VERSION);

    registry.delete(&ctx, PROJECT).unwrap();

    assert!(!store.contains("Project", PROJECT));
    assert!(!store.contains("Api", API));
    assert!(!store.contains("Spec", SPEC));
    // The orphan is what best effort leaves behind.
    assert!(store.contains("Version", VERSION));
}

#[test]
fn best_effort_still_reports_a_failed_parent_deletion() {
    let store = FaultyStore::new();
    let registry = registry(&store, CascadePolicy::BestEffort);
    let ctx = CallContext::new();
    seed_hierarchy(&registry);
    store.fail_delete_of(PROJECT);

    let err = registry.delete(&ctx, PROJECT).unwrap_err();
    assert!(matches!(err, RegistryError::Internal { .. }));
    assert!(!store.contains("Api", API));
}

#[test]
fn delete_of_absent_target_touches_nothing() {
    let store = FaultyStore::new();
    let registry = registry(&store, CascadePolicy::Abort);
    let err = registry
        .delete(&CallContext::new(), "projects/missing")
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.delete_calls(), 0);
}
