//! Signature filters for iteration

use log::error;

use super::{Component, ComponentRegistry, ComponentSet, Signature};

/// Decides whether an entity with a given signature is visited
pub trait Filter {
    fn matches(&self, signature: Signature) -> bool;
}

impl<F: Fn(Signature) -> bool> Filter for F {
    #[inline]
    fn matches(&self, signature: Signature) -> bool {
        self(signature)
    }
}

/// Matches entities owning every component in `with` and none in `without`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Query {
    pub with: Signature,
    pub without: Signature,
}

impl Query {
    /// Matches every live entity
    pub const ALL: Query = Query {
        with: Signature::EMPTY,
        without: Signature::EMPTY,
    };

    /// Matches nothing: no signature can hold all bits while excluding all bits
    pub const NONE: Query = Query {
        with: Signature::from_bits(u64::MAX),
        without: Signature::from_bits(u64::MAX),
    };

    pub const fn new(with: Signature, without: Signature) -> Self {
        Self { with, without }
    }

    pub const fn with_signature(with: Signature) -> Self {
        Self {
            with,
            without: Signature::EMPTY,
        }
    }
}

impl Filter for Query {
    #[inline]
    fn matches(&self, signature: Signature) -> bool {
        signature.has_all(self.with) && !signature.intersects(self.without)
    }
}

/// Builds a [`Query`] from component types
pub struct QueryBuilder<'r> {
    registry: &'r ComponentRegistry,
    query: Query,
    valid: bool,
}

impl<'r> QueryBuilder<'r> {
    pub fn new(registry: &'r ComponentRegistry) -> Self {
        Self {
            registry,
            query: Query::ALL,
            valid: true,
        }
    }

    pub fn with<C: ComponentSet>(mut self) -> Self {
        match C::signature(self.registry) {
            Some(signature) => self.query.with = self.query.with | signature,
            None => self.invalidate(C::type_names()),
        }
        self
    }

    pub fn without<C: ComponentSet>(mut self) -> Self {
        match C::signature(self.registry) {
            Some(signature) => self.query.without = self.query.without | signature,
            None => self.invalidate(C::type_names()),
        }
        self
    }

    /// Shorthand for a single required component
    pub fn with_component<T: Component>(self) -> Self {
        self.with::<(T,)>()
    }

    /// A query naming an unregistered type matches nothing
    pub fn build(self) -> Query {
        if self.valid {
            self.query
        } else {
            Query::NONE
        }
    }

    fn invalidate(&mut self, names: Vec<&'static str>) {
        error!("query names unregistered component types {names:?}");
        self.valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    impl Component for Position {}

    struct Hidden;
    impl Component for Hidden {}

    struct Unknown;
    impl Component for Unknown {}

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>("Position").unwrap();
        registry.register::<Hidden>("Hidden").unwrap();
        registry
    }

    #[test]
    fn test_with_without() {
        let registry = registry();
        let query = QueryBuilder::new(&registry)
            .with_component::<Position>()
            .without::<(Hidden,)>()
            .build();

        assert!(query.matches(Signature::EMPTY.with(0)));
        assert!(!query.matches(Signature::EMPTY.with(0).with(1)));
        assert!(!query.matches(Signature::EMPTY));
    }

    #[test]
    fn test_unregistered_matches_nothing() {
        let registry = registry();
        let query = QueryBuilder::new(&registry).with::<(Unknown,)>().build();
        assert_eq!(query, Query::NONE);
        assert!(!query.matches(Signature::EMPTY));
        assert!(!query.matches(Signature::from_bits(u64::MAX)));
    }

    #[test]
    fn test_closure_filter() {
        let filter = |signature: Signature| signature.count() == 2;
        assert!(filter.matches(Signature::from_bits(0b11)));
        assert!(Query::ALL.matches(Signature::EMPTY));
    }
}
