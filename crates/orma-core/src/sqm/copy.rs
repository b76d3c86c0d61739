use by_address::ByAddress;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

/// Memoizes node copies during one deep copy of an expression tree.
///
/// Shared nodes (parameters, from-element paths) are copied exactly once per
/// context, so the copy preserves the original's sharing. A context is used by
/// one copy operation on one thread and then dropped.
#[derive(Default)]
pub struct SqmCopyContext {
    /// One identity-keyed map per node type. The key holds the original alive
    /// so its address is not reused while the context exists.
    copies: HashMap<TypeId, Box<dyn Any>>,
}

type CopyMap<T> = HashMap<ByAddress<Arc<T>>, Arc<T>>;

impl SqmCopyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the copy of `original`, invoking `producer` only the first time
    /// `original` is seen by this context.
    pub fn copy<T, F>(&mut self, original: &Arc<T>, producer: F) -> Arc<T>
    where
        T: 'static,
        F: FnOnce(&mut Self) -> T,
    {
        if let Some(copy) = self.get_copy(original) {
            return copy;
        }

        let copy = Arc::new(producer(self));
        self.map_mut::<T>()
            .insert(ByAddress(original.clone()), copy.clone());
        copy
    }

    /// Returns the copy registered for `original`, if any.
    pub fn get_copy<T: 'static>(&self, original: &Arc<T>) -> Option<Arc<T>> {
        self.copies
            .get(&TypeId::of::<T>())
            .and_then(|map| map.downcast_ref::<CopyMap<T>>())
            .and_then(|map| map.get(&ByAddress(original.clone())))
            .cloned()
    }

    /// Returns the copy registered for `original`.
    ///
    /// # Panics
    ///
    /// Panics if `original` has not been copied yet. Nodes that reference a
    /// shared node are copied after it, so a missing copy is a tree-building
    /// bug.
    #[track_caller]
    pub fn expect_copy<T: std::fmt::Debug + 'static>(&self, original: &Arc<T>) -> Arc<T> {
        match self.get_copy(original) {
            Some(copy) => copy,
            None => panic!("no copy registered for {original:?}"),
        }
    }

    fn map_mut<T: 'static>(&mut self) -> &mut CopyMap<T> {
        let map = self
            .copies
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(CopyMap::<T>::new()));

        match map.downcast_mut::<CopyMap<T>>() {
            Some(map) => map,
            None => unreachable!("copy map keyed by its node type"),
        }
    }
}

impl std::fmt::Debug for SqmCopyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqmCopyContext")
            .field("node_types", &self.copies.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_is_memoized() {
        let original = Arc::new(String::from("node"));
        let mut cx = SqmCopyContext::new();
        let mut calls = 0;

        let a = cx.copy(&original, |_| {
            calls += 1;
            (*original).clone()
        });
        let b = cx.copy(&original, |_| {
            calls += 1;
            (*original).clone()
        });

        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &original));
    }

    #[test]
    fn get_copy_before_copy_is_none() {
        let original = Arc::new(1_u32);
        let cx = SqmCopyContext::new();
        assert!(cx.get_copy(&original).is_none());
    }

    #[test]
    fn equal_values_are_distinct_nodes() {
        let a = Arc::new(7_u32);
        let b = Arc::new(7_u32);
        let mut cx = SqmCopyContext::new();

        let ca = cx.copy(&a, |_| 7);
        let cb = cx.copy(&b, |_| 7);
        assert!(!Arc::ptr_eq(&ca, &cb));
    }

    #[test]
    #[should_panic(expected = "no copy registered")]
    fn expect_copy_panics_when_missing() {
        let original = Arc::new(1_u32);
        SqmCopyContext::new().expect_copy(&original);
    }
}
