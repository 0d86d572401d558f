//! Component traits and type-erased pool access

use std::any::Any;

use super::{ComponentRegistry, EntityId, Signature};

/// Marker trait for plain data records attachable to an entity.
///
/// Zero-sized implementors are flag components: their presence lives only in
/// the entity signature and they never take pool storage.
pub trait Component: 'static {}

/// Type-erased view of a component pool, used where the manager only knows a
/// component id (destroy, bulk signature application, diagnostics).
pub trait ComponentStorage {
    /// Appends a default-initialized slot for `entity_id`
    fn add_default(&mut self, entity_id: EntityId);
    fn remove(&mut self, entity_id: EntityId) -> bool;
    fn has(&self, entity_id: EntityId) -> bool;
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Whether the stored type is zero-sized
    fn is_flag(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A compile-time list of component types, written as a tuple.
///
/// `(Position,)`, `(Position, Size)` and so on resolve to a [`Signature`]
/// through the runtime registry.
pub trait ComponentSet {
    /// Type names, in declaration order
    fn type_names() -> Vec<&'static str>;

    /// `None` if any member type is unregistered
    fn signature(registry: &ComponentRegistry) -> Option<Signature>;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn type_names() -> Vec<&'static str> {
                vec![$(std::any::type_name::<$name>()),+]
            }

            fn signature(registry: &ComponentRegistry) -> Option<Signature> {
                let mut signature = Signature::EMPTY;
                $(signature.insert(registry.id_of::<$name>()?);)+
                Some(signature)
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    struct Health(u32);
    impl Component for Health {}

    struct Armor;
    impl Component for Armor {}

    struct Speed(f32);
    impl Component for Speed {}

    #[test]
    fn test_component_set_signature() {
        let mut registry = ComponentRegistry::new();
        let health = registry.register::<Health>("Health").unwrap();
        let armor = registry.register::<Armor>("Armor").unwrap();

        let sig = <(Health, Armor)>::signature(&registry).unwrap();
        assert!(sig.test(health));
        assert!(sig.test(armor));
        assert_eq!(sig.count(), 2);

        assert!(<(Health, Speed)>::signature(&registry).is_none());
        assert_eq!(<(Speed,)>::type_names().len(), 1);

        let _ = (Health(1).0, Speed(1.0).0);
    }
}
