//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Places and categories are entities: the engine that stores them hands out
/// the identifier, and an object that has not been saved yet carries an
/// empty one.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Whether an engine has assigned this entity an identifier.
    fn is_persisted(&self) -> bool;
}
