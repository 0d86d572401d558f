//! Named component signatures used to stamp out entities

use log::debug;

use super::Signature;

pub type PrototypeId = u16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    pub id: PrototypeId,
    pub name: String,
    pub signature: Signature,
}

#[derive(Debug, Default)]
pub struct PrototypeRegistry {
    prototypes: Vec<Prototype>,
}

impl PrototypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `name`, replacing the signature if it already exists
    pub fn define(&mut self, name: &str, signature: Signature) -> PrototypeId {
        if let Some(existing) = self.prototypes.iter_mut().find(|p| p.name == name) {
            existing.signature = signature;
            debug!("redefined prototype `{name}` as {signature:?}");
            return existing.id;
        }

        let id = self.prototypes.len() as PrototypeId;
        self.prototypes.push(Prototype {
            id,
            name: name.to_owned(),
            signature,
        });
        debug!("defined prototype `{name}` as id {id} with {signature:?}");
        id
    }

    pub fn get(&self, id: PrototypeId) -> Option<&Prototype> {
        self.prototypes.get(id as usize)
    }

    pub fn id_by_name(&self, name: &str) -> Option<PrototypeId> {
        self.prototypes.iter().find(|p| p.name == name).map(|p| p.id)
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prototype> {
        self.prototypes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_lookup() {
        let mut registry = PrototypeRegistry::new();
        let tree = registry.define("tree", Signature::from_bits(0b101));
        let rock = registry.define("rock", Signature::from_bits(0b1));

        assert_eq!((tree, rock), (0, 1));
        assert_eq!(registry.id_by_name("rock"), Some(1));
        assert_eq!(registry.get(tree).map(|p| p.signature.count()), Some(2));
        assert!(registry.get(7).is_none());
    }

    #[test]
    fn test_redefine_keeps_id() {
        let mut registry = PrototypeRegistry::new();
        let id = registry.define("tree", Signature::from_bits(0b1));
        assert_eq!(registry.define("tree", Signature::from_bits(0b11)), id);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).unwrap().signature, Signature::from_bits(0b11));
    }
}
