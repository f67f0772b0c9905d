//! Create, get, update and delete.

use tracing::{debug, instrument, warn};

use super::{decode, encode, exists, next_update_time, now, Registry};
use crate::config::CascadePolicy;
use crate::context::CallContext;
use crate::error::RegistryError;
use crate::models::{Resource, UpdateMask};
use crate::names::{parse_parent, ResourceName};
use crate::store::{ScanQuery, Store, StoreError, StoreKey, StoreProvider};

impl<P: StoreProvider> Registry<P> {
    /// Create a resource named `id` under `parent`.
    ///
    /// Fails with already-exists if the name is taken, and with not-found if
    /// the parent does not exist. Timestamps in `input` are ignored.
    #[instrument(skip(self, ctx, input), fields(kind = %R::KIND))]
    pub fn create<R: Resource>(
        &self,
        ctx: &CallContext,
        parent: &str,
        id: &str,
        input: &R,
    ) -> Result<R, RegistryError> {
        let parent = parse_parent(parent, R::KIND)?;
        let name = match &parent {
            Some(parent) => parent.child(R::KIND, id)?,
            None => ResourceName::project(id)?,
        };

        let store = self.connect(ctx)?;
        if let Some(parent) = &parent {
            require_parent(&store, ctx, parent)?;
        }
        if exists(&store, ctx, &name.key())? {
            return Err(RegistryError::AlreadyExists(format!(
                "{} already exists",
                name
            )));
        }

        let record = fresh_record(&name, input);
        store.put(ctx, &name.key(), encode(&record)?)?;
        debug!(name = %name, "created");
        Ok(record)
    }

    #[instrument(skip(self, ctx), fields(kind = %R::KIND))]
    pub fn get<R: Resource>(&self, ctx: &CallContext, name: &str) -> Result<R, RegistryError> {
        let name = ResourceName::parse_kind(name, R::KIND)?;
        let store = self.connect(ctx)?;
        let bytes = store
            .get(ctx, &name.key())
            .map_err(|e| RegistryError::from_store(e, name.as_str()))?;
        decode(&bytes)
    }

    /// Apply the fields of `input` selected by `mask` to an existing resource.
    ///
    /// With `allow_missing`, an absent resource is created from `input`
    /// instead of failing with not-found.
    #[instrument(skip(self, ctx, input), fields(kind = %R::KIND))]
    pub fn update<R: Resource>(
        &self,
        ctx: &CallContext,
        name: &str,
        input: &R,
        mask: &UpdateMask,
        allow_missing: bool,
    ) -> Result<R, RegistryError> {
        let name = ResourceName::parse_kind(name, R::KIND)?;
        let store = self.connect(ctx)?;

        let current = match store.get(ctx, &name.key()) {
            Ok(bytes) => Some(decode::<R>(&bytes)?),
            Err(StoreError::NoSuchKey) => None,
            Err(err) => return Err(err.into()),
        };

        let record = match current {
            Some(current) => {
                let mut next = current.clone();
                mask.apply(&mut next, input)?;
                next.assign_name(&name);
                next.meta_mut().create_time = current.meta().create_time;
                next.meta_mut().update_time = next_update_time(current.meta().update_time);
                next.refresh_derived();
                next
            }
            None if allow_missing => {
                if let Some(parent) = name.parent() {
                    require_parent(&store, ctx, &parent)?;
                }
                debug!(name = %name, "update of missing resource creates it");
                fresh_record(&name, input)
            }
            None => return Err(RegistryError::NotFound(format!("{} not found", name))),
        };

        store.put(ctx, &name.key(), encode(&record)?)?;
        debug!(name = %name, "updated");
        Ok(record)
    }

    /// Delete a resource of any kind together with everything nested below it.
    ///
    /// Descendants go first, deepest kind first. What a failed descendant
    /// deletion does depends on the configured [`CascadePolicy`]; an
    /// interrupted call always stops immediately.
    #[instrument(skip(self, ctx))]
    pub fn delete(&self, ctx: &CallContext, name: &str) -> Result<(), RegistryError> {
        let name = ResourceName::parse(name)?;
        let store = self.connect(ctx)?;
        store
            .get(ctx, &name.key())
            .map_err(|e| RegistryError::from_store(e, name.as_str()))?;

        let prefix = name.descendant_prefix();
        let mut failed = 0usize;
        for kind in name.kind().descendants() {
            let keys = match descendant_keys(&store, ctx, kind.entity(), &prefix) {
                Ok(keys) => keys,
                Err(err) => {
                    self.cascade_failure(&name, kind.entity(), err)?;
                    failed += 1;
                    continue;
                }
            };
            debug!(name = %name, kind = %kind, count = keys.len(), "deleting descendants");
            for key in keys {
                if let Err(err) = store.delete(ctx, &key) {
                    self.cascade_failure(&name, &key.name, err)?;
                    failed += 1;
                }
            }
        }

        store.delete(ctx, &name.key())?;
        if failed > 0 {
            warn!(name = %name, failed, "deleted with descendants left behind");
        } else {
            debug!(name = %name, "deleted");
        }
        Ok(())
    }

    /// Decide whether a failed descendant deletion stops the cascade.
    fn cascade_failure(
        &self,
        target: &ResourceName,
        what: &str,
        err: StoreError,
    ) -> Result<(), RegistryError> {
        if let StoreError::Interrupted(reason) = err {
            return Err(reason.into());
        }
        match self.options.cascade {
            CascadePolicy::Abort => Err(RegistryError::internal_with(
                format!("deleting {} under {}", what, target),
                err,
            )),
            CascadePolicy::BestEffort => {
                warn!(resource = %target, what, error = %err, "descendant deletion failed");
                Ok(())
            }
        }
    }
}

/// A new record for `name` built from the caller's fields.
fn fresh_record<R: Resource>(name: &ResourceName, input: &R) -> R {
    let mut record = input.clone();
    record.assign_name(name);
    let created = now();
    record.meta_mut().create_time = created;
    record.meta_mut().update_time = created;
    record.refresh_derived();
    record
}

fn require_parent<S: Store>(
    store: &S,
    ctx: &CallContext,
    parent: &ResourceName,
) -> Result<(), RegistryError> {
    if exists(store, ctx, &parent.key())? {
        Ok(())
    } else {
        Err(RegistryError::NotFound(format!("parent {} not found", parent)))
    }
}

/// Keys of every record of `kind` whose name starts with `prefix`.
fn descendant_keys<S: Store>(
    store: &S,
    ctx: &CallContext,
    kind: &str,
    prefix: &str,
) -> Result<Vec<StoreKey>, StoreError> {
    store
        .scan(ctx, ScanQuery::new(kind).prefix(prefix).distinct())?
        .map(|item| item.map(|item| item.key))
        .collect()
}
