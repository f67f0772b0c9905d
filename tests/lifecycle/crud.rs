//! Create, get and update state transitions.

use resource_registry::{
    Api, CallContext, InMemoryStore, Project, Registry, RegistryError, Spec, UpdateMask, Version,
};

use crate::support::{seed_hierarchy, API, PROJECT, SPEC, VERSION};

fn project(display_name: &str, description: &str) -> Project {
    Project {
        display_name: display_name.into(),
        description: description.into(),
        ..Default::default()
    }
}

#[test]
fn create_twice_is_already_exists_and_keeps_the_original() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    let first = registry
        .create(&ctx, "", "demo", &project("First", ""))
        .unwrap();

    let err = registry
        .create(&ctx, "", "demo", &project("Second", ""))
        .unwrap_err();
    assert!(err.is_already_exists(), "got {err}");

    let stored: Project = registry.get(&ctx, PROJECT).unwrap();
    assert_eq!(stored.display_name, "First");
    assert_eq!(stored.meta.create_time, first.meta.create_time);
}

#[test]
fn successive_updates_keep_create_time_and_advance_update_time() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    let created = registry.create(&ctx, "", "demo", &project("a", "")).unwrap();

    let mut previous = created.meta.update_time;
    for round in 0..5 {
        let updated = registry
            .update(
                &ctx,
                PROJECT,
                &project(&format!("round {round}"), ""),
                &UpdateMask::all(),
                false,
            )
            .unwrap();
        assert_eq!(updated.meta.create_time, created.meta.create_time);
        assert!(updated.meta.update_time > previous);
        assert!(updated.meta.update_time >= updated.meta.create_time);
        previous = updated.meta.update_time;
    }

    let stored: Project = registry.get(&ctx, PROJECT).unwrap();
    assert_eq!(stored.display_name, "round 4");
    assert_eq!(stored.meta.update_time, previous);
}

#[test]
fn caller_supplied_timestamps_are_ignored() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    let mut input = project("a", "");
    input.meta.create_time = chrono::DateTime::<chrono::Utc>::MIN_UTC;
    input.meta.name = "projects/other".into();

    let created = registry.create(&ctx, "", "demo", &input).unwrap();
    assert_eq!(created.meta.name, PROJECT);
    assert_ne!(created.meta.create_time, chrono::DateTime::<chrono::Utc>::MIN_UTC);
}

#[test]
fn update_mask_selects_fields() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    registry
        .create(&ctx, "", "demo", &project("Demo", "old"))
        .unwrap();

    let updated = registry
        .update(
            &ctx,
            PROJECT,
            &project("ignored", "new"),
            &UpdateMask::parse("description"),
            false,
        )
        .unwrap();
    assert_eq!(updated.display_name, "Demo");
    assert_eq!(updated.description, "new");
}

#[test]
fn unknown_mask_path_is_invalid_and_writes_nothing() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    let created = registry.create(&ctx, "", "demo", &project("a", "")).unwrap();

    let err = registry
        .update(&ctx, PROJECT, &project("b", ""), &UpdateMask::parse("owner"), false)
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let stored: Project = registry.get(&ctx, PROJECT).unwrap();
    assert_eq!(stored, created);
}

#[test]
fn operations_on_absent_keys_are_not_found() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();

    assert!(registry.get::<Project>(&ctx, "projects/nope").unwrap_err().is_not_found());
    assert!(registry
        .update(&ctx, "projects/nope", &project("", ""), &UpdateMask::all(), false)
        .unwrap_err()
        .is_not_found());
    assert!(registry.delete(&ctx, "projects/nope").unwrap_err().is_not_found());

    registry.create(&ctx, "", "gone", &project("", "")).unwrap();
    registry.delete(&ctx, "projects/gone").unwrap();
    assert!(registry.get::<Project>(&ctx, "projects/gone").unwrap_err().is_not_found());
    assert!(registry.delete(&ctx, "projects/gone").unwrap_err().is_not_found());
}

#[test]
fn malformed_names_are_invalid_arguments() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();

    for name in ["", "projects", "projects/", "projects/Demo", "widgets/x", "projects/a/b"] {
        let err = registry.get::<Project>(&ctx, name).unwrap_err();
        assert!(err.is_invalid_argument(), "{name:?} gave {err}");
    }
    assert!(registry
        .create(&ctx, "projects/demo", "x", &project("", ""))
        .unwrap_err()
        .is_invalid_argument());
    assert!(registry
        .create(&ctx, "", "-bad", &project("", ""))
        .unwrap_err()
        .is_invalid_argument());
}

#[test]
fn children_need_an_existing_parent() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();

    let err = registry.create(&ctx, PROJECT, "petstore", &Api::default()).unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));

    let err = registry.create(&ctx, "", "petstore", &Api::default()).unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn ids_and_names_are_filled_in_for_every_kind() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    seed_hierarchy(&registry);

    let api: Api = registry.get(&ctx, API).unwrap();
    assert_eq!((api.project_id.as_str(), api.api_id.as_str()), ("demo", "petstore"));

    let version: Version = registry.get(&ctx, VERSION).unwrap();
    assert_eq!(version.version_id, "v1");
    assert_eq!(version.meta.name, VERSION);

    let spec: Spec = registry.get(&ctx, SPEC).unwrap();
    assert_eq!(spec.spec_id, "openapi.yaml");
    assert_eq!(spec.size_bytes, 14);
    assert_eq!(spec.hash.len(), 64);
    assert_eq!(spec.contents, b"openapi: 3.0.0");
}

#[test]
fn spec_derived_fields_follow_content_updates() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    seed_hierarchy(&registry);
    let before: Spec = registry.get(&ctx, SPEC).unwrap();

    let after = registry
        .update(
            &ctx,
            SPEC,
            &Spec {
                contents: b"openapi: 3.1.0\ninfo: {}".to_vec(),
                size_bytes: 1,
                hash: "forged".into(),
                ..Default::default()
            },
            &UpdateMask::parse("contents"),
            false,
        )
        .unwrap();
    assert_eq!(after.size_bytes, 23);
    assert_ne!(after.hash, before.hash);
    assert_ne!(after.hash, "forged");
    assert_eq!(after.style, "openapi/v3");
}

#[test]
fn allow_missing_creates_through_update() {
    let registry = Registry::new(InMemoryStore::new());
    let ctx = CallContext::new();
    seed_hierarchy(&registry);

    let name = format!("{VERSION}/specs/openapi.json");
    let created = registry
        .update(
            &ctx,
            &name,
            &Spec {
                style: "openapi/v3".into(),
                ..Default::default()
            },
            &UpdateMask::all(),
            true,
        )
        .unwrap();
    assert_eq!(created.meta.create_time, created.meta.update_time);
    assert_eq!(created.spec_id, "openapi.json");

    let orphan = registry
        .update(
            &ctx,
            "projects/demo/apis/missing/versions/v1",
            &Version::default(),
            &UpdateMask::all(),
            true,
        )
        .unwrap_err();
    assert!(orphan.is_not_found());
}
