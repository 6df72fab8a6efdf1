use std::fmt;
use std::sync::Arc;

use crate::permission::EntityKind;
use crate::principal::PrincipalId;

/// A single domain object produced by a resolver.
///
/// Only the identity needed for instance-scoped checks is carried here; resolvers of child
/// fields look the rest up by `kind` and `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    kind: Arc<EntityKind>,
    id: String,
    owner: Option<PrincipalId>,
}

impl Entity {
    pub fn new(kind: Arc<EntityKind>, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<PrincipalId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn kind(&self) -> &Arc<EntityKind> {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> Option<&PrincipalId> {
        self.owner.as_ref()
    }
}

type EntitySource = Box<dyn Iterator<Item = Entity> + Send + Sync>;

/// A not-yet-materialized sequence of entities of one kind.
///
/// Single pass: it is consumed by value, so a lazy result can only ever be fetched once.
pub struct LazyEntities {
    kind: Arc<EntityKind>,
    source: EntitySource,
}

impl LazyEntities {
    pub fn new<I>(kind: Arc<EntityKind>, entities: I) -> Self
    where
        I: IntoIterator<Item = Entity>,
        I::IntoIter: Send + Sync + 'static,
    {
        Self {
            kind,
            source: Box::new(entities.into_iter()),
        }
    }

    /// Defers `fetch` until the first element is requested.
    pub fn deferred<F>(kind: Arc<EntityKind>, fetch: F) -> Self
    where
        F: FnOnce() -> Vec<Entity> + Send + Sync + 'static,
    {
        Self::new(kind, std::iter::once(fetch).flat_map(|fetch| fetch()))
    }

    pub fn kind(&self) -> &Arc<EntityKind> {
        &self.kind
    }
}

impl Iterator for LazyEntities {
    type Item = Entity;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next()
    }
}

impl fmt::Debug for LazyEntities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyEntities")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A group of entities sharing one kind, as returned by a query-backed resolver.
#[derive(Debug)]
pub enum EntityCollection {
    Materialized {
        kind: Arc<EntityKind>,
        entities: Vec<Entity>,
    },
    Lazy(LazyEntities),
}

impl EntityCollection {
    pub fn kind(&self) -> &Arc<EntityKind> {
        match self {
            EntityCollection::Materialized { kind, .. } => kind,
            EntityCollection::Lazy(lazy) => lazy.kind(),
        }
    }

    /// Evaluates the collection. For a lazy collection this is the one and only fetch.
    pub fn materialize(self) -> Vec<Entity> {
        match self {
            EntityCollection::Materialized { entities, .. } => entities,
            EntityCollection::Lazy(lazy) => lazy.collect(),
        }
    }
}

/// Anything a resolver can produce that is not an entity or an entity collection.
#[derive(Debug)]
pub enum OtherValue {
    Null,
    Scalar(sonic_rs::Value),
    /// A non-entity composite, such as a connection edge or a mutation payload.
    Object(Vec<(String, ResolvedValue)>),
    /// A plain sequence, possibly mixing entities with other values.
    Sequence(Vec<ResolvedValue>),
}

/// The output of a single field resolution.
#[derive(Debug)]
pub enum ResolvedValue {
    Entity(Entity),
    Collection(EntityCollection),
    Other(OtherValue),
}

impl ResolvedValue {
    pub fn null() -> Self {
        ResolvedValue::Other(OtherValue::Null)
    }

    pub fn scalar(value: sonic_rs::Value) -> Self {
        ResolvedValue::Other(OtherValue::Scalar(value))
    }

    pub fn sequence(items: Vec<ResolvedValue>) -> Self {
        ResolvedValue::Other(OtherValue::Sequence(items))
    }

    pub fn object(members: Vec<(String, ResolvedValue)>) -> Self {
        ResolvedValue::Other(OtherValue::Object(members))
    }

    pub fn collection(kind: Arc<EntityKind>, entities: Vec<Entity>) -> Self {
        ResolvedValue::Collection(EntityCollection::Materialized { kind, entities })
    }

    pub fn lazy(lazy: LazyEntities) -> Self {
        ResolvedValue::Collection(EntityCollection::Lazy(lazy))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ResolvedValue::Other(OtherValue::Null))
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            ResolvedValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Looks up a member of an [`OtherValue::Object`].
    pub fn member(&self, name: &str) -> Option<&ResolvedValue> {
        match self {
            ResolvedValue::Other(OtherValue::Object(members)) => members
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Moves a member out of an [`OtherValue::Object`], leaving null behind.
    pub fn take_member(&mut self, name: &str) -> Option<ResolvedValue> {
        match self {
            ResolvedValue::Other(OtherValue::Object(members)) => members
                .iter_mut()
                .find(|(key, _)| key == name)
                .map(|(_, value)| std::mem::replace(value, ResolvedValue::null())),
            _ => None,
        }
    }
}

impl From<Entity> for ResolvedValue {
    fn from(entity: Entity) -> Self {
        ResolvedValue::Entity(entity)
    }
}
