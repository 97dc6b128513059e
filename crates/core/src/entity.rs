//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Products, categories and orders are all documents addressed by id; stores
/// use this to look them up without knowing the concrete type.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Position of the entity with the given id in an insertion-ordered slice.
pub fn find_by_id<E: Entity>(entities: &[E], id: &E::Id) -> Option<usize> {
    entities.iter().position(|e| e.id() == id)
}
