#![deny(missing_docs)]

//! # Document Model
//!
//! Typed representation of an OpenAPI document whose reference targets live in
//! per-kind arenas owned by the [`Document`].
//!
//! Reference sites hold a [`RefOr`]: either the raw `$ref` string, a [`NodeId`]
//! into the arena, or an explicit unresolved marker. Two sites refer to the same
//! object exactly when they hold the same `NodeId`, which is what makes identity
//! comparison valid after resolution, including for self-referential graphs.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// HTTP methods recognised as operations inside a Path Item.
pub const HTTP_METHODS: [&str; 9] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace", "query",
];

/// Typed index of a node inside a document arena.
pub struct NodeId<T> {
    index: usize,
    marker: PhantomData<fn() -> T>,
}

impl<T> NodeId<T> {
    fn new(index: usize) -> Self {
        Self {
            index,
            marker: PhantomData,
        }
    }

    /// Raw arena slot index.
    pub fn index(self) -> usize {
        self.index
    }
}

// Manual impls: derives would needlessly require `T` to implement each trait.
impl<T> Clone for NodeId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeId<T> {}

impl<T> PartialEq for NodeId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for NodeId<T> {}

impl<T> Hash for NodeId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for NodeId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.index)
    }
}

/// Append-only storage for one node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Arena<T> {
    nodes: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> Arena<T> {
    /// Stores a node and returns its id.
    pub fn alloc(&mut self, node: T) -> NodeId<T> {
        self.nodes.push(node);
        NodeId::new(self.nodes.len() - 1)
    }

    /// Returns the node behind `id`.
    pub fn get(&self, id: NodeId<T>) -> Option<&T> {
        self.nodes.get(id.index)
    }

    /// Returns the node behind `id` mutably.
    pub fn get_mut(&mut self, id: NodeId<T>) -> Option<&mut T> {
        self.nodes.get_mut(id.index)
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node has been stored.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Marker left at a reference site whose target could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRef {
    /// The reference string as written at the site.
    pub reference: String,
    /// Why resolution failed.
    pub reason: String,
}

/// A reference site: a `$ref` string, a concrete node, or an unresolved marker.
#[derive(Debug, Clone, PartialEq)]
pub enum RefOr<T> {
    /// A `$ref` that has not been resolved yet.
    Ref(String),
    /// A concrete node in the owning document.
    T(NodeId<T>),
    /// A `$ref` that failed to resolve.
    Unresolved(UnresolvedRef),
}

impl<T> RefOr<T> {
    /// Returns the node id if the site holds a concrete node.
    pub fn id(&self) -> Option<NodeId<T>> {
        match self {
            RefOr::T(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the pending reference string, if any.
    pub fn reference(&self) -> Option<&str> {
        match self {
            RefOr::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// True when the site holds a concrete node.
    pub fn is_resolved(&self) -> bool {
        matches!(self, RefOr::T(_))
    }
}

/// Kind of referenceable node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Schema Object.
    Schema,
    /// Parameter Object.
    Parameter,
    /// Header Object.
    Header,
    /// Response Object.
    Response,
    /// Request Body Object.
    RequestBody,
    /// Path Item Object.
    PathItem,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Schema => "schema",
            NodeKind::Parameter => "parameter",
            NodeKind::Header => "header",
            NodeKind::Response => "response",
            NodeKind::RequestBody => "request body",
            NodeKind::PathItem => "path item",
        };
        f.write_str(name)
    }
}

/// Composition keyword of a composite schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// `allOf`
    AllOf,
    /// `oneOf`
    OneOf,
    /// `anyOf`
    AnyOf,
}

impl Composition {
    /// All keywords in precedence order.
    pub const ALL: [Composition; 3] = [Composition::AllOf, Composition::OneOf, Composition::AnyOf];

    /// The JSON keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Composition::AllOf => "allOf",
            Composition::OneOf => "oneOf",
            Composition::AnyOf => "anyOf",
        }
    }
}

/// `additionalProperties` slot: boolean or schema.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    /// `true` / `false`.
    Bool(bool),
    /// A schema or schema reference.
    Schema(RefOr<Schema>),
}

/// Structural classification of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Object-style or free-form schema.
    Plain,
    /// `type: array` or has `items`.
    Array,
    /// Carries a composition keyword; the first present in `allOf`, `oneOf`, `anyOf` order.
    Composite(Composition),
}

/// Schema Object.
///
/// Every keyword that may hold a nested schema has its own slot, whatever the
/// schema's [`SchemaKind`]: an `allOf` schema may also declare `properties`, an
/// array schema may also carry `oneOf`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// `properties`, in document order.
    pub properties: IndexMap<String, RefOr<Schema>>,
    /// `items`
    pub items: Option<RefOr<Schema>>,
    /// `allOf`
    pub all_of: Option<Vec<RefOr<Schema>>>,
    /// `oneOf`
    pub one_of: Option<Vec<RefOr<Schema>>>,
    /// `anyOf`
    pub any_of: Option<Vec<RefOr<Schema>>>,
    /// `not`
    pub not: Option<RefOr<Schema>>,
    /// `additionalProperties`
    pub additional_properties: Option<AdditionalProperties>,
    /// Every other keyword, verbatim (`type`, `format`, `required`, `enum`, ...).
    pub keywords: Map<String, Value>,
}

impl Schema {
    /// Structural classification.
    pub fn kind(&self) -> SchemaKind {
        if let Some(composition) = Composition::ALL
            .into_iter()
            .find(|c| self.composition(*c).is_some())
        {
            return SchemaKind::Composite(composition);
        }
        if self.items.is_some() || self.schema_type() == Some("array") {
            SchemaKind::Array
        } else {
            SchemaKind::Plain
        }
    }

    /// `type`, when it is a single string.
    pub fn schema_type(&self) -> Option<&str> {
        self.keywords.get("type").and_then(Value::as_str)
    }

    /// `format`
    pub fn format(&self) -> Option<&str> {
        self.keywords.get("format").and_then(Value::as_str)
    }

    /// `description`
    pub fn description(&self) -> Option<&str> {
        self.keywords.get("description").and_then(Value::as_str)
    }

    /// A single property slot.
    pub fn property(&self, name: &str) -> Option<&RefOr<Schema>> {
        self.properties.get(name)
    }

    /// `items`
    pub fn items(&self) -> Option<&RefOr<Schema>> {
        self.items.as_ref()
    }

    /// Members under one composition keyword, if present.
    pub fn composition(&self, composition: Composition) -> Option<&[RefOr<Schema>]> {
        match composition {
            Composition::AllOf => self.all_of.as_deref(),
            Composition::OneOf => self.one_of.as_deref(),
            Composition::AnyOf => self.any_of.as_deref(),
        }
    }

    pub(crate) fn composition_mut(
        &mut self,
        composition: Composition,
    ) -> &mut Option<Vec<RefOr<Schema>>> {
        match composition {
            Composition::AllOf => &mut self.all_of,
            Composition::OneOf => &mut self.one_of,
            Composition::AnyOf => &mut self.any_of,
        }
    }

    /// Members of the composition that classifies this schema (see [`Schema::kind`]).
    pub fn members(&self) -> Option<&[RefOr<Schema>]> {
        match self.kind() {
            SchemaKind::Composite(composition) => self.composition(composition),
            _ => None,
        }
    }

    /// `not`
    pub fn not(&self) -> Option<&RefOr<Schema>> {
        self.not.as_ref()
    }

    /// `additionalProperties`
    pub fn additional_properties(&self) -> Option<&AdditionalProperties> {
        self.additional_properties.as_ref()
    }
}

/// Media Type Object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaType {
    /// `schema`
    pub schema: Option<RefOr<Schema>>,
    /// Remaining fields (`example`, `examples`, `encoding`, ...).
    pub keywords: Map<String, Value>,
}

/// Parameter Object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameter {
    /// `schema`
    pub schema: Option<RefOr<Schema>>,
    /// `content`
    pub content: IndexMap<String, MediaType>,
    /// Remaining fields (`name`, `in`, `required`, ...).
    pub keywords: Map<String, Value>,
}

impl Parameter {
    /// `name`
    pub fn name(&self) -> Option<&str> {
        self.keywords.get("name").and_then(Value::as_str)
    }

    /// `in`
    pub fn location(&self) -> Option<&str> {
        self.keywords.get("in").and_then(Value::as_str)
    }
}

/// Header Object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    /// `schema`
    pub schema: Option<RefOr<Schema>>,
    /// `content`
    pub content: IndexMap<String, MediaType>,
    /// Remaining fields.
    pub keywords: Map<String, Value>,
}

/// Request Body Object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestBody {
    /// `content`
    pub content: IndexMap<String, MediaType>,
    /// Remaining fields (`description`, `required`).
    pub keywords: Map<String, Value>,
}

/// Response Object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    /// `headers`
    pub headers: IndexMap<String, RefOr<Header>>,
    /// `content`
    pub content: IndexMap<String, MediaType>,
    /// Remaining fields.
    pub keywords: Map<String, Value>,
}

impl Response {
    /// `description`
    pub fn description(&self) -> Option<&str> {
        self.keywords.get("description").and_then(Value::as_str)
    }
}

/// Operation Object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Operation {
    /// `parameters`, in document order.
    pub parameters: Vec<RefOr<Parameter>>,
    /// `requestBody`
    pub request_body: Option<RefOr<RequestBody>>,
    /// `responses` keyed by status code (or `default`).
    pub responses: IndexMap<String, RefOr<Response>>,
    /// Spec extensions attached to the Responses Object (x-...).
    pub response_extensions: Map<String, Value>,
    /// Remaining fields (`operationId`, `tags`, `callbacks`, ...).
    pub keywords: Map<String, Value>,
}

/// Path Item Object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathItem {
    /// Operations keyed by lowercase HTTP method, in document order.
    pub operations: IndexMap<String, Operation>,
    /// Path-level `parameters`.
    pub parameters: Vec<RefOr<Parameter>>,
    /// Remaining fields (`summary`, `servers`, ...).
    pub keywords: Map<String, Value>,
}

impl PathItem {
    /// Operation for a method, case-insensitive.
    pub fn operation(&self, method: &str) -> Option<&Operation> {
        self.operations.get(&method.to_ascii_lowercase())
    }
}

/// Components Object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Components {
    /// `schemas`
    pub schemas: IndexMap<String, RefOr<Schema>>,
    /// `parameters`
    pub parameters: IndexMap<String, RefOr<Parameter>>,
    /// `headers`
    pub headers: IndexMap<String, RefOr<Header>>,
    /// `responses`
    pub responses: IndexMap<String, RefOr<Response>>,
    /// `requestBodies`
    pub request_bodies: IndexMap<String, RefOr<RequestBody>>,
    /// `pathItems`
    pub path_items: IndexMap<String, RefOr<PathItem>>,
    /// Remaining sections (`securitySchemes`, `examples`, `links`, ...), verbatim.
    pub extra: Map<String, Value>,
}

/// Arenas for every referenceable node kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Store {
    pub(crate) schemas: Arena<Schema>,
    pub(crate) parameters: Arena<Parameter>,
    pub(crate) headers: Arena<Header>,
    pub(crate) responses: Arena<Response>,
    pub(crate) request_bodies: Arena<RequestBody>,
    pub(crate) path_items: Arena<PathItem>,
}

/// A slot found at a pointer location, tagged with its kind.
#[doc(hidden)]
#[derive(Debug, Clone, PartialEq)]
pub enum Located {
    /// Schema slot.
    Schema(RefOr<Schema>),
    /// Parameter slot.
    Parameter(RefOr<Parameter>),
    /// Header slot.
    Header(RefOr<Header>),
    /// Response slot.
    Response(RefOr<Response>),
    /// Request body slot.
    RequestBody(RefOr<RequestBody>),
    /// Path item slot.
    PathItem(RefOr<PathItem>),
}

impl Located {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Located::Schema(_) => NodeKind::Schema,
            Located::Parameter(_) => NodeKind::Parameter,
            Located::Header(_) => NodeKind::Header,
            Located::Response(_) => NodeKind::Response,
            Located::RequestBody(_) => NodeKind::RequestBody,
            Located::PathItem(_) => NodeKind::PathItem,
        }
    }
}

/// Qualified pointer (`locator#/a/b`) to the slot at that location.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct LocationIndex {
    entries: HashMap<String, Located>,
}

impl LocationIndex {
    pub(crate) fn get(&self, key: &str) -> Option<&Located> {
        self.entries.get(key)
    }

    pub(crate) fn insert(&mut self, key: String, located: Located) {
        self.entries.insert(key, located);
    }
}

/// A node kind that can be the target of a `$ref`.
pub trait Node: Sized + Default + Clone + fmt::Debug {
    /// Kind tag.
    const KIND: NodeKind;

    /// The arena holding nodes of this kind.
    fn arena(store: &Store) -> &Arena<Self>;

    /// The arena holding nodes of this kind, mutably.
    fn arena_mut(store: &mut Store) -> &mut Arena<Self>;

    #[doc(hidden)]
    fn wrap(slot: RefOr<Self>) -> Located;

    #[doc(hidden)]
    fn unwrap(located: &Located) -> Option<RefOr<Self>>;
}

macro_rules! impl_node {
    ($ty:ident, $field:ident) => {
        impl Node for $ty {
            const KIND: NodeKind = NodeKind::$ty;

            fn arena(store: &Store) -> &Arena<Self> {
                &store.$field
            }

            fn arena_mut(store: &mut Store) -> &mut Arena<Self> {
                &mut store.$field
            }

            fn wrap(slot: RefOr<Self>) -> Located {
                Located::$ty(slot)
            }

            fn unwrap(located: &Located) -> Option<RefOr<Self>> {
                match located {
                    Located::$ty(slot) => Some(slot.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_node!(Schema, schemas);
impl_node!(Parameter, parameters);
impl_node!(Header, headers);
impl_node!(Response, responses);
impl_node!(RequestBody, request_bodies);
impl_node!(PathItem, path_items);

/// A parsed OpenAPI document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// `openapi` version string.
    pub openapi: Option<String>,
    /// `components`
    pub components: Components,
    /// `paths`, in document order.
    pub paths: IndexMap<String, RefOr<PathItem>>,
    /// Spec extensions attached to the Paths Object (x-...).
    pub path_extensions: Map<String, Value>,
    /// `webhooks`, in document order.
    pub webhooks: IndexMap<String, RefOr<PathItem>>,
    /// Remaining top-level fields (`info`, `servers`, `tags`, ...), verbatim.
    pub extra: Map<String, Value>,
    pub(crate) store: Store,
    pub(crate) index: LocationIndex,
}

impl Document {
    /// Node behind an id.
    pub fn get<T: Node>(&self, id: NodeId<T>) -> Option<&T> {
        T::arena(&self.store).get(id)
    }

    /// Node behind an id, mutably.
    pub fn get_mut<T: Node>(&mut self, id: NodeId<T>) -> Option<&mut T> {
        T::arena_mut(&mut self.store).get_mut(id)
    }

    /// Node held by a site, if the site is resolved.
    pub fn node<T: Node>(&self, slot: &RefOr<T>) -> Option<&T> {
        slot.id().and_then(|id| self.get(id))
    }

    /// Component schema by name, if resolved.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.components
            .schemas
            .get(name)
            .and_then(|slot| self.node(slot))
    }

    /// Path item by path template, if resolved.
    pub fn path_item(&self, path: &str) -> Option<&PathItem> {
        self.paths.get(path).and_then(|slot| self.node(slot))
    }

    /// Read access to the node arenas.
    pub fn store(&self) -> &Store {
        &self.store
    }
}
