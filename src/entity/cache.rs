use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{Entity, EntityDescriptor};

type DescriptorMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Descriptors already built for one store, keyed by entity type.
///
/// Each store owns its own cache, so the verified-exists flag on a descriptor
/// is scoped to one database.
#[derive(Default)]
pub struct EntityCache {
    descriptors: RwLock<DescriptorMap>,
}

impl EntityCache {
    /// Shared descriptor for `T`, built on first use.
    #[must_use]
    pub fn describe<T: Entity>(&self) -> Arc<EntityDescriptor<T>> {
        let key = TypeId::of::<T>();
        {
            let map = match self.descriptors.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(found) = map.get(&key).and_then(|d| downcast::<T>(d)) {
                return found;
            }
        }

        let mut map = match self.descriptors.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = map
            .entry(key)
            .or_insert_with(|| Arc::new(T::describe()) as Arc<dyn Any + Send + Sync>);
        downcast::<T>(entry).unwrap_or_else(|| {
            // Unreachable while keys are `TypeId`s; replace rather than panic.
            let fresh = Arc::new(T::describe());
            *entry = Arc::clone(&fresh) as Arc<dyn Any + Send + Sync>;
            fresh
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self.descriptors.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn downcast<T: Entity>(
    descriptor: &Arc<dyn Any + Send + Sync>,
) -> Option<Arc<EntityDescriptor<T>>> {
    Arc::clone(descriptor)
        .downcast::<EntityDescriptor<T>>()
        .ok()
}

impl std::fmt::Debug for EntityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCache")
            .field("descriptors", &self.len())
            .finish()
    }
}
