use crate::{IrError, Target};
use elsa::FrozenIndexSet;
use rustc_hash::FxHashMap;
use std::cell::Cell;
use std::convert::TryInto;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Context object with global resources for an instruction stream.
///
/// Those resources currently are:
/// * the [`Target`] every capability query is answered against
/// * an interner for debug-info strings (source file names)
/// * "entity" allocators, for everything with an identity (instructions and
///   blocks), that needs to remain unique across an entire `Context`
///   * the *definition* of an entity isn't kept in the `Context`, but rather in
///     some `EntityDefs` collection (e.g. in a `Program`), with only the entity
///     *indices* being allocated by the `Context`
///   * indices are handed out in increasing order and never reused, so a freed
///     entity's handle can never alias a later one
pub struct Context {
    target: Target,
    interned_strs: Interner<str>,
    entity_allocs: EntityAllocs,
}

impl Context {
    pub fn new(target: Target) -> Self {
        Context {
            target,
            interned_strs: Interner::default(),
            entity_allocs: EntityAllocs::default(),
        }
    }

    /// The hardware target all capability queries are made against.
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn intern(&self, s: impl AsRef<str> + Into<Box<str>>) -> InternedStr {
        InternedStr(self.interned_strs.intern(s))
    }
}

impl std::ops::Index<InternedStr> for Context {
    type Output = str;

    fn index(&self, interned: InternedStr) -> &str {
        &self.interned_strs.0[interned.0 as usize]
    }
}

struct Interner<T: ?Sized>(FrozenIndexSet<Box<T>>);

impl<T: ?Sized + Eq + Hash> Default for Interner<T> {
    fn default() -> Self {
        Self(FrozenIndexSet::new())
    }
}

impl<T: ?Sized + Eq + Hash> Interner<T> {
    #[track_caller]
    fn intern(&self, value: impl AsRef<T> + Into<Box<T>>) -> u32 {
        if let Some((i, _)) = self.0.get_full(value.as_ref()) {
            return i as u32;
        }
        let (i, _) = self.0.insert_full(value.into());
        i.try_into().expect("interner overflowed u32")
    }
}

// NOTE never derive `PartialOrd, Ord` for this type, as observing the
// interning order shouldn't be allowed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InternedStr(u32);

/// Types usable as keys of an [`EntityDefs`] (only those declared by the
/// `entities!` macro below).
pub trait Entity: Copy + Eq + Hash + fmt::Debug + 'static {
    type Def;

    /// Human-readable kind name, used in diagnostics.
    const KIND: &'static str;

    fn to_u32(self) -> u32;
}

/// Collection holding the actual definitions for `Context`-allocated entities.
///
/// By design there is no way to iterate the contents of an `EntityDefs`, or
/// generate entity indices without defining the entity in an `EntityDefs`.
///
/// Removing a definition (see [`EntityDefs::remove`]) leaves any outstanding
/// handles "stale": lookups through them fail (`get` returns `None`, while
/// indexing panics), instead of silently observing an unrelated entity.
pub struct EntityDefs<E: Entity> {
    // FIXME use more efficient storage by optimizing for compact ranges,
    // allowing the use of `Vec` (plus the base index) for the fast path, and
    // keeping the map as a fallback.
    map: FxHashMap<E, E::Def>,
}

impl<E: Entity> Default for EntityDefs<E> {
    fn default() -> Self {
        Self { map: FxHashMap::default() }
    }
}

impl<E: Entity> EntityDefs<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity: E) -> Option<&E::Def> {
        self.map.get(&entity)
    }

    pub fn get_mut(&mut self, entity: E) -> Option<&mut E::Def> {
        self.map.get_mut(&entity)
    }

    pub fn contains(&self, entity: E) -> bool {
        self.map.contains_key(&entity)
    }

    /// Number of live (i.e. not yet removed) definitions.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Remove (and return) the definition of `entity`, making its handle stale.
    pub fn remove(&mut self, entity: E) -> Option<E::Def> {
        self.map.remove(&entity)
    }

    /// Like [`EntityDefs::get_mut`], but reporting a missing definition as
    /// [`IrError::StaleHandle`].
    pub fn try_get_mut(&mut self, entity: E) -> Result<&mut E::Def, IrError> {
        self.map.get_mut(&entity).ok_or(IrError::StaleHandle {
            kind: E::KIND,
            idx: entity.to_u32(),
        })
    }

    /// Like [`EntityDefs::get`], but reporting a missing definition as
    /// [`IrError::StaleHandle`].
    pub fn try_get(&self, entity: E) -> Result<&E::Def, IrError> {
        self.map.get(&entity).ok_or(IrError::StaleHandle {
            kind: E::KIND,
            idx: entity.to_u32(),
        })
    }
}

impl<E: Entity> std::ops::Index<E> for EntityDefs<E> {
    type Output = E::Def;

    #[track_caller]
    fn index(&self, entity: E) -> &E::Def {
        match self.map.get(&entity) {
            Some(def) => def,
            None => panic!("use of undefined (or freed) {entity:?}"),
        }
    }
}

impl<E: Entity> std::ops::IndexMut<E> for EntityDefs<E> {
    #[track_caller]
    fn index_mut(&mut self, entity: E) -> &mut E::Def {
        match self.map.get_mut(&entity) {
            Some(def) => def,
            None => panic!("use of undefined (or freed) {entity:?}"),
        }
    }
}

macro_rules! entities {
    (
        $($name:ident => $def:ty),+ $(,)?
    ) => {
        #[allow(non_snake_case)]
        #[derive(Default)]
        struct EntityAllocs {
            $($name: Cell<u32>),*
        }

        $(
            // NOTE `PartialOrd, Ord` reflect allocation order, which is stable
            // (indices only ever increase within one `Context`).
            #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name(
                // FIXME figure out how to sneak niches into these types, to
                // allow e.g. `Option` around them to not increase the size.
                u32,
            );

            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!(stringify!($name), "({})"), self.0)
                }
            }

            impl Entity for $name {
                type Def = $def;

                const KIND: &'static str = stringify!($name);

                fn to_u32(self) -> u32 {
                    self.0
                }
            }

            impl EntityDefs<$name> {
                pub fn define(&mut self, cx: &Context, def: $def) -> $name {
                    let idx = $name(cx.entity_allocs.$name.get());
                    let next_idx = idx.0.checked_add(1).expect("entity index overflowed u32");
                    cx.entity_allocs.$name.set(next_idx);

                    assert!(self.map.insert(idx, def).is_none());

                    idx
                }
            }
        )*
    };
}

entities! {
    Inst => crate::InstDef,
    Block => crate::BlockDef,
}

impl Inst {
    /// Globally unique (per `Context`) id, increasing in allocation order.
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Intrusive doubly-linked list links, as stored inside an entity definition.
///
/// One definition may hold several of these (see [`ListMembership`]), one per
/// kind of list it can be a member of, each maintained independently.
#[derive(Copy, Clone, Debug)]
pub struct EntityListLinks<E> {
    prev: Option<E>,
    next: Option<E>,
    owner: Option<ListId>,
}

impl<E> Default for EntityListLinks<E> {
    fn default() -> Self {
        Self { prev: None, next: None, owner: None }
    }
}

impl<E: Copy> EntityListLinks<E> {
    pub fn is_attached(&self) -> bool {
        self.owner.is_some()
    }

    pub fn prev(&self) -> Option<E> {
        self.prev
    }

    pub fn next(&self) -> Option<E> {
        self.next
    }
}

/// Selects which [`EntityListLinks`] field (of an entity's definition) an
/// [`EntityList<Self>`] threads through.
pub trait ListMembership: 'static {
    type Entity: Entity;

    /// Human-readable list kind, used in diagnostics.
    const NAME: &'static str;

    fn links(def: &<Self::Entity as Entity>::Def) -> &EntityListLinks<Self::Entity>;
    fn links_mut(def: &mut <Self::Entity as Entity>::Def) -> &mut EntityListLinks<Self::Entity>;
}

/// Identity of one [`EntityList`], stamped into the links of its members.
///
/// Unique for the whole process (not just one `Context`), so that lists can
/// be created without access to any `Context`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct ListId(NonZeroU64);

impl ListId {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        match NonZeroU64::new(id) {
            Some(id) => ListId(id),
            None => unreachable!("list ids overflowed u64"),
        }
    }
}

/// Doubly-linked list, "intrusively" going through the definitions of its
/// members (i.e. through the links selected by `M`), so that insertion and
/// removal are `O(1)`, and never allocate.
///
/// Every member's links record which list it's in, so using a list with a
/// node that belongs to another list (of the same kind) is reported as
/// [`IrError::NotInList`], instead of corrupting both lists.
///
/// Copies of an `EntityList` share its identity, but only the copy that was
/// last mutated is up to date.
pub struct EntityList<M: ListMembership> {
    id: ListId,
    first: Option<M::Entity>,
    last: Option<M::Entity>,
    len: usize,
    _marker: PhantomData<M>,
}

// HACK manual impls to avoid `M: Clone`/`M: Default` bounds.
impl<M: ListMembership> Copy for EntityList<M> {}
impl<M: ListMembership> Clone for EntityList<M> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<M: ListMembership> Default for EntityList<M> {
    fn default() -> Self {
        Self { id: ListId::fresh(), first: None, last: None, len: 0, _marker: PhantomData }
    }
}

impl<M: ListMembership> fmt::Debug for EntityList<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityList")
            .field("kind", &M::NAME)
            .field("first", &self.first)
            .field("last", &self.last)
            .field("len", &self.len)
            .finish()
    }
}

impl<M: ListMembership> EntityList<M> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn first(&self) -> Option<M::Entity> {
        self.first
    }

    pub fn last(&self) -> Option<M::Entity> {
        self.last
    }

    /// Get the successor of `node` (which must be a member of this list).
    pub fn next_of(&self, node: M::Entity, defs: &EntityDefs<M::Entity>) -> Option<M::Entity> {
        M::links(&defs[node]).next
    }

    /// Get the predecessor of `node` (which must be a member of this list).
    pub fn prev_of(&self, node: M::Entity, defs: &EntityDefs<M::Entity>) -> Option<M::Entity> {
        M::links(&defs[node]).prev
    }

    pub fn iter(self) -> EntityListIter<M> {
        EntityListIter { first: self.first, last: self.last, _marker: PhantomData }
    }

    /// Iterate all members, in order, reading links from `defs`.
    pub fn iter_in<'a>(
        self,
        defs: &'a EntityDefs<M::Entity>,
    ) -> impl Iterator<Item = M::Entity> + Clone + 'a {
        let mut rest = Some(self.iter());
        std::iter::from_fn(move || {
            let (next, new_rest) = rest?.split_first(defs)?;
            rest = new_rest;
            Some(next)
        })
    }

    fn check_detached(
        entity: M::Entity,
        defs: &EntityDefs<M::Entity>,
    ) -> Result<(), IrError> {
        let links = M::links(defs.try_get(entity)?);
        if links.is_attached() {
            return Err(IrError::AlreadyInList {
                kind: <M::Entity as Entity>::KIND,
                idx: entity.to_u32(),
                list: M::NAME,
            });
        }
        Ok(())
    }

    fn check_member(
        &self,
        entity: M::Entity,
        defs: &EntityDefs<M::Entity>,
    ) -> Result<(), IrError> {
        let links = M::links(defs.try_get(entity)?);
        if links.owner != Some(self.id) {
            return Err(IrError::NotInList {
                kind: <M::Entity as Entity>::KIND,
                idx: entity.to_u32(),
                list: M::NAME,
            });
        }
        Ok(())
    }

    /// Insert `new_node` (which must not already be in any list of this kind)
    /// at the start of this list.
    pub fn insert_first(
        &mut self,
        new_node: M::Entity,
        defs: &mut EntityDefs<M::Entity>,
    ) -> Result<(), IrError> {
        match self.first {
            Some(old_first) => self.insert_before(new_node, old_first, defs),
            None => {
                Self::check_detached(new_node, defs)?;
                let links = M::links_mut(&mut defs[new_node]);
                *links = EntityListLinks { prev: None, next: None, owner: Some(self.id) };
                self.first = Some(new_node);
                self.last = Some(new_node);
                self.len += 1;
                Ok(())
            }
        }
    }

    /// Insert `new_node` (which must not already be in any list of this kind)
    /// at the end of this list.
    pub fn insert_last(
        &mut self,
        new_node: M::Entity,
        defs: &mut EntityDefs<M::Entity>,
    ) -> Result<(), IrError> {
        match self.last {
            Some(old_last) => self.insert_after(new_node, old_last, defs),
            None => self.insert_first(new_node, defs),
        }
    }

    /// Insert `new_node` (which must not already be in any list of this kind)
    /// right before `next`, which must be a member of this list.
    pub fn insert_before(
        &mut self,
        new_node: M::Entity,
        next: M::Entity,
        defs: &mut EntityDefs<M::Entity>,
    ) -> Result<(), IrError> {
        Self::check_detached(new_node, defs)?;
        self.check_member(next, defs)?;

        let prev = M::links(&defs[next]).prev;
        *M::links_mut(&mut defs[new_node]) =
            EntityListLinks { prev, next: Some(next), owner: Some(self.id) };
        M::links_mut(&mut defs[next]).prev = Some(new_node);
        match prev {
            Some(prev) => M::links_mut(&mut defs[prev]).next = Some(new_node),
            None => self.first = Some(new_node),
        }
        self.len += 1;
        Ok(())
    }

    /// Insert `new_node` (which must not already be in any list of this kind)
    /// right after `prev`, which must be a member of this list.
    pub fn insert_after(
        &mut self,
        new_node: M::Entity,
        prev: M::Entity,
        defs: &mut EntityDefs<M::Entity>,
    ) -> Result<(), IrError> {
        Self::check_detached(new_node, defs)?;
        self.check_member(prev, defs)?;

        let next = M::links(&defs[prev]).next;
        *M::links_mut(&mut defs[new_node]) =
            EntityListLinks { prev: Some(prev), next, owner: Some(self.id) };
        M::links_mut(&mut defs[prev]).next = Some(new_node);
        match next {
            Some(next) => M::links_mut(&mut defs[next]).prev = Some(new_node),
            None => self.last = Some(new_node),
        }
        self.len += 1;
        Ok(())
    }

    /// Remove `node` (which must be a member of this list) from this list,
    /// leaving its definition (and any other list memberships) untouched.
    pub fn remove(
        &mut self,
        node: M::Entity,
        defs: &mut EntityDefs<M::Entity>,
    ) -> Result<(), IrError> {
        self.check_member(node, defs)?;

        let EntityListLinks { prev, next, .. } =
            std::mem::take(M::links_mut(&mut defs[node]));

        match prev {
            Some(prev) => M::links_mut(&mut defs[prev]).next = next,
            None => self.first = next,
        }
        match next {
            Some(next) => M::links_mut(&mut defs[next]).prev = prev,
            None => self.last = prev,
        }
        self.len -= 1;
        Ok(())
    }

    /// Remove every member, leaving all of them detached (from this list).
    pub fn clear(&mut self, defs: &mut EntityDefs<M::Entity>) {
        let mut cursor = self.first;
        while let Some(node) = cursor {
            let links = std::mem::take(M::links_mut(&mut defs[node]));
            cursor = links.next;
        }
        self.first = None;
        self.last = None;
        self.len = 0;
    }
}

/// [`EntityList<M>`] iterator, but with a different API than [`Iterator`].
///
/// This can also be considered a (non-random-access) "subslice" of the list.
pub struct EntityListIter<M: ListMembership> {
    pub first: Option<M::Entity>,
    pub last: Option<M::Entity>,
    _marker: PhantomData<M>,
}

impl<M: ListMembership> Copy for EntityListIter<M> {}
impl<M: ListMembership> Clone for EntityListIter<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: ListMembership> EntityListIter<M> {
    #[track_caller]
    pub fn split_first(
        self,
        defs: &EntityDefs<M::Entity>,
    ) -> Option<(M::Entity, Option<Self>)> {
        let Self { first, last, _marker } = self;
        let current = first?;
        let next = M::links(&defs[current]).next;
        let rest = if Some(current) == last {
            None
        } else {
            assert!(next.is_some(), "EntityListIter::split_first: `last` not reachable");
            Some(Self { first: next, last, _marker })
        };
        Some((current, rest))
    }

    #[track_caller]
    pub fn split_last(
        self,
        defs: &EntityDefs<M::Entity>,
    ) -> Option<(M::Entity, Option<Self>)> {
        let Self { first, last, _marker } = self;
        let current = last?;
        let prev = M::links(&defs[current]).prev;
        let rest = if Some(current) == first {
            None
        } else {
            assert!(prev.is_some(), "EntityListIter::split_last: `first` not reachable");
            Some(Self { first, last: prev, _marker })
        };
        Some((current, rest))
    }
}
