#![deny(missing_docs)]

//! # Document Parsing
//!
//! Turns YAML/JSON text into the generic tree (`serde_json::Value`), and that
//! tree into the typed [`Document`] model.
//!
//! While building, every reference-capable slot is registered in the document's
//! location index under its qualified pointer, so that `#/components/schemas/Pet`
//! or `#/paths/~1pets` can later be looked up without re-walking the raw tree.
//! The same builder imports fragments of remote documents into the root arenas.

use crate::error::{AppError, AppResult};
use crate::oas::model::{
    AdditionalProperties, Components, Composition, Document, Header, LocationIndex, MediaType,
    Node, Operation, Parameter, PathItem, RefOr, RequestBody, Response, Schema, Store,
    HTTP_METHODS,
};
use crate::oas::ref_utils::{child_pointer, format_pointer, resolve_locator};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

/// Parses serialized YAML or JSON into a generic tree.
///
/// This is the single structural parser shared by the root document and every
/// remote document.
pub fn parse_document(bytes: &[u8]) -> AppResult<Value> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| AppError::General(format!("Document is not valid UTF-8: {}", e)))?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|e| AppError::General(format!("Failed to parse document: {}", e)))?;
    yaml_to_json(yaml)
}

/// YAML allows non-string mapping keys (`200:` under `responses`); they become strings.
fn yaml_to_json(value: serde_yaml::Value) -> AppResult<Value> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| AppError::General(format!("Unsupported number: {}", n)))?
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<AppResult<Vec<_>>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> AppResult<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        other => Err(AppError::General(format!(
            "Unsupported mapping key: {:?}",
            other
        ))),
    }
}

impl Document {
    /// Parses a YAML (or JSON) OpenAPI document.
    pub fn from_yaml_str(text: &str) -> AppResult<Self> {
        let value = parse_document(text.as_bytes())?;
        Self::from_value(&value)
    }

    /// Builds the typed model from a generic tree.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| AppError::General("OpenAPI document root must be a mapping".into()))?;

        let mut store = Store::default();
        let mut index = LocationIndex::default();
        let mut builder = Builder::new(&mut store, &mut index, "");
        let mut extra = root.clone();

        let openapi = extra
            .get("openapi")
            .and_then(Value::as_str)
            .map(str::to_string);
        extra.remove("openapi");

        let components = match extra.remove("components") {
            Some(Value::Object(map)) => builder.components(&map)?,
            Some(other) => return Err(shape_error("components", "#/components", &other)),
            None => Components::default(),
        };

        let (paths, path_extensions) = match extra.remove("paths") {
            Some(Value::Object(map)) => builder.path_map(&map, "paths")?,
            Some(Value::Null) | None => (IndexMap::new(), Map::new()),
            Some(other) => return Err(shape_error("paths", "#/paths", &other)),
        };

        let webhooks = match extra.remove("webhooks") {
            Some(Value::Object(map)) => builder.path_map(&map, "webhooks")?.0,
            Some(Value::Null) | None => IndexMap::new(),
            Some(other) => return Err(shape_error("webhooks", "#/webhooks", &other)),
        };

        Ok(Document {
            openapi,
            components,
            paths,
            path_extensions,
            webhooks,
            extra,
            store,
            index,
        })
    }
}

/// Imports a fragment of the document at `locator` into `store` as a `T` slot.
///
/// `segments` is the fragment's own location inside that document; nested
/// `$ref`s are qualified against `locator`.
pub(crate) fn import<T: Build>(
    store: &mut Store,
    index: &mut LocationIndex,
    locator: &str,
    segments: &[String],
    value: &Value,
) -> AppResult<RefOr<T>> {
    let mut builder = Builder::new(store, index, locator);
    let at = format_pointer(locator, segments);
    T::build(&mut builder, value, &at)
}

/// Builds a slot of a node kind from a raw value.
pub(crate) trait Build: Node {
    fn build(builder: &mut Builder<'_>, value: &Value, at: &str) -> AppResult<RefOr<Self>>;
}

impl Build for Schema {
    fn build(builder: &mut Builder<'_>, value: &Value, at: &str) -> AppResult<RefOr<Self>> {
        builder.schema(value, at)
    }
}

impl Build for Parameter {
    fn build(builder: &mut Builder<'_>, value: &Value, at: &str) -> AppResult<RefOr<Self>> {
        builder.slot(value, at, "parameter", |b, map| b.parameter(map, at))
    }
}

impl Build for Header {
    fn build(builder: &mut Builder<'_>, value: &Value, at: &str) -> AppResult<RefOr<Self>> {
        builder.slot(value, at, "header", |b, map| b.header(map, at))
    }
}

impl Build for Response {
    fn build(builder: &mut Builder<'_>, value: &Value, at: &str) -> AppResult<RefOr<Self>> {
        builder.slot(value, at, "response", |b, map| b.response(map, at))
    }
}

impl Build for RequestBody {
    fn build(builder: &mut Builder<'_>, value: &Value, at: &str) -> AppResult<RefOr<Self>> {
        builder.slot(value, at, "request body", |b, map| b.request_body(map, at))
    }
}

impl Build for PathItem {
    fn build(builder: &mut Builder<'_>, value: &Value, at: &str) -> AppResult<RefOr<Self>> {
        builder.slot(value, at, "path item", |b, map| b.path_item(map, at))
    }
}

/// Allocates nodes for one document (root or remote) and indexes their slots.
pub(crate) struct Builder<'a> {
    store: &'a mut Store,
    index: &'a mut LocationIndex,
    locator: &'a str,
}

impl<'a> Builder<'a> {
    fn new(store: &'a mut Store, index: &'a mut LocationIndex, locator: &'a str) -> Self {
        Self {
            store,
            index,
            locator,
        }
    }

    /// Shared `$ref`-or-object handling for every non-schema node kind.
    fn slot<T, F>(&mut self, value: &Value, at: &str, what: &str, build: F) -> AppResult<RefOr<T>>
    where
        T: Node,
        F: FnOnce(&mut Self, &Map<String, Value>) -> AppResult<T>,
    {
        if let Some(existing) = self.existing::<T>(at) {
            return Ok(existing);
        }
        let map = value
            .as_object()
            .ok_or_else(|| shape_error(what, at, value))?;
        let slot = match ref_of(map) {
            Some(reference) => {
                if map.len() > 1 {
                    debug!("Ignoring sibling keys of $ref at {}", at);
                }
                RefOr::Ref(self.qualify_ref(reference))
            }
            None => {
                let node = build(self, map)?;
                RefOr::T(T::arena_mut(self.store).alloc(node))
            }
        };
        Ok(self.register(at, slot))
    }

    fn existing<T: Node>(&self, at: &str) -> Option<RefOr<T>> {
        self.index.get(at).and_then(T::unwrap)
    }

    fn register<T: Node>(&mut self, at: &str, slot: RefOr<T>) -> RefOr<T> {
        self.index.insert(at.to_string(), T::wrap(slot.clone()));
        slot
    }

    /// Rewrites references found inside a remote document so they stay valid
    /// once the fragment lives in the root document.
    fn qualify_ref(&self, reference: &str) -> String {
        if self.locator.is_empty() {
            return reference.to_string();
        }
        let (document, fragment) = match reference.split_once('#') {
            Some((document, fragment)) => (document, Some(fragment)),
            None => (reference, None),
        };
        let document = if document.is_empty() {
            self.locator.to_string()
        } else {
            resolve_locator(document, Some(self.locator))
        };
        match fragment {
            Some(fragment) => format!("{}#{}", document, fragment),
            None => document,
        }
    }

    fn components(&mut self, map: &Map<String, Value>) -> AppResult<Components> {
        let at = format_pointer(self.locator, &["components"]);
        let mut extra = map.clone();
        let mut components = Components::default();

        if let Some(section) = take_section(&mut extra, "schemas", &at)? {
            let section_at = child_pointer(&at, "schemas");
            for (name, value) in &section {
                let slot = self.schema(value, &child_pointer(&section_at, name))?;
                components.schemas.insert(name.clone(), slot);
            }
        }
        components.parameters = self.section(&mut extra, "parameters", &at)?;
        components.headers = self.section(&mut extra, "headers", &at)?;
        components.responses = self.section(&mut extra, "responses", &at)?;
        components.request_bodies = self.section(&mut extra, "requestBodies", &at)?;
        components.path_items = self.section(&mut extra, "pathItems", &at)?;
        components.extra = extra;

        Ok(components)
    }

    fn section<T: Build>(
        &mut self,
        extra: &mut Map<String, Value>,
        key: &str,
        at: &str,
    ) -> AppResult<IndexMap<String, RefOr<T>>> {
        let mut out = IndexMap::new();
        if let Some(section) = take_section(extra, key, at)? {
            let section_at = child_pointer(at, key);
            for (name, value) in &section {
                let slot = T::build(self, value, &child_pointer(&section_at, name))?;
                out.insert(name.clone(), slot);
            }
        }
        Ok(out)
    }

    fn path_map(
        &mut self,
        map: &Map<String, Value>,
        key: &str,
    ) -> AppResult<(IndexMap<String, RefOr<PathItem>>, Map<String, Value>)> {
        let at = format_pointer(self.locator, &[key]);
        let mut items = IndexMap::new();
        let mut extensions = Map::new();
        for (path, value) in map {
            if path.starts_with("x-") {
                extensions.insert(path.clone(), value.clone());
                continue;
            }
            let slot = PathItem::build(self, value, &child_pointer(&at, path))?;
            items.insert(path.clone(), slot);
        }
        Ok((items, extensions))
    }

    fn schema(&mut self, value: &Value, at: &str) -> AppResult<RefOr<Schema>> {
        if let Some(existing) = self.existing::<Schema>(at) {
            return Ok(existing);
        }
        let slot = match value {
            Value::Bool(true) => RefOr::T(self.store.schemas.alloc(Schema::default())),
            Value::Bool(false) => {
                let any = self.schema(&Value::Object(Map::new()), &child_pointer(at, "not"))?;
                let never = Schema {
                    not: Some(any),
                    ..Schema::default()
                };
                RefOr::T(self.store.schemas.alloc(never))
            }
            Value::Object(map) => match ref_of(map) {
                Some(reference) => {
                    RefOr::Ref(self.qualify_ref(&expand_schema_shorthand(reference)))
                }
                None => {
                    let schema = self.schema_node(map, at)?;
                    RefOr::T(self.store.schemas.alloc(schema))
                }
            },
            other => return Err(shape_error("schema", at, other)),
        };
        Ok(self.register(at, slot))
    }

    fn schema_node(&mut self, map: &Map<String, Value>, at: &str) -> AppResult<Schema> {
        let mut schema = Schema {
            keywords: map.clone(),
            ..Schema::default()
        };

        match schema.keywords.remove("properties") {
            Some(Value::Object(props)) => {
                let props_at = child_pointer(at, "properties");
                for (name, value) in &props {
                    let slot = self.schema(value, &child_pointer(&props_at, name))?;
                    schema.properties.insert(name.clone(), slot);
                }
            }
            Some(other) => {
                return Err(shape_error("properties", &child_pointer(at, "properties"), &other))
            }
            None => {}
        }

        if let Some(value) = schema.keywords.remove("items") {
            schema.items = Some(self.schema(&value, &child_pointer(at, "items"))?);
        }

        for composition in Composition::ALL {
            let keyword = composition.keyword();
            let members_at = child_pointer(at, keyword);
            let members = match schema.keywords.remove(keyword) {
                Some(Value::Array(values)) => values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| self.schema(v, &child_pointer(&members_at, &i.to_string())))
                    .collect::<AppResult<Vec<_>>>()?,
                Some(other) => return Err(shape_error(keyword, &members_at, &other)),
                None => continue,
            };
            *schema.composition_mut(composition) = Some(members);
        }

        if let Some(value) = schema.keywords.remove("not") {
            schema.not = Some(self.schema(&value, &child_pointer(at, "not"))?);
        }

        schema.additional_properties = match schema.keywords.remove("additionalProperties") {
            Some(Value::Bool(flag)) => Some(AdditionalProperties::Bool(flag)),
            Some(value) => Some(AdditionalProperties::Schema(
                self.schema(&value, &child_pointer(at, "additionalProperties"))?,
            )),
            None => None,
        };

        Ok(schema)
    }

    fn parameter(&mut self, map: &Map<String, Value>, at: &str) -> AppResult<Parameter> {
        let mut keywords = map.clone();
        let schema = self.optional_schema(&mut keywords, at)?;
        let content = self.content(&mut keywords, at)?;
        Ok(Parameter {
            schema,
            content,
            keywords,
        })
    }

    fn header(&mut self, map: &Map<String, Value>, at: &str) -> AppResult<Header> {
        let mut keywords = map.clone();
        let schema = self.optional_schema(&mut keywords, at)?;
        let content = self.content(&mut keywords, at)?;
        Ok(Header {
            schema,
            content,
            keywords,
        })
    }

    fn request_body(&mut self, map: &Map<String, Value>, at: &str) -> AppResult<RequestBody> {
        let mut keywords = map.clone();
        let content = self.content(&mut keywords, at)?;
        Ok(RequestBody { content, keywords })
    }

    fn response(&mut self, map: &Map<String, Value>, at: &str) -> AppResult<Response> {
        let mut keywords = map.clone();
        let content = self.content(&mut keywords, at)?;
        let mut headers = IndexMap::new();
        match keywords.remove("headers") {
            Some(Value::Object(raw)) => {
                let headers_at = child_pointer(at, "headers");
                for (name, value) in &raw {
                    let slot = Header::build(self, value, &child_pointer(&headers_at, name))?;
                    headers.insert(name.clone(), slot);
                }
            }
            Some(other) => return Err(shape_error("headers", &child_pointer(at, "headers"), &other)),
            None => {}
        }
        Ok(Response {
            headers,
            content,
            keywords,
        })
    }

    fn path_item(&mut self, map: &Map<String, Value>, at: &str) -> AppResult<PathItem> {
        let mut keywords = map.clone();
        let parameters = self.parameter_list(&mut keywords, at)?;
        let mut operations = IndexMap::new();
        for (key, value) in map {
            let method = key.to_ascii_lowercase();
            if !HTTP_METHODS.contains(&method.as_str()) {
                continue;
            }
            keywords.remove(key);
            let op_at = child_pointer(at, key);
            let op_map = value
                .as_object()
                .ok_or_else(|| shape_error("operation", &op_at, value))?;
            operations.insert(method, self.operation(op_map, &op_at)?);
        }
        Ok(PathItem {
            operations,
            parameters,
            keywords,
        })
    }

    fn operation(&mut self, map: &Map<String, Value>, at: &str) -> AppResult<Operation> {
        let mut keywords = map.clone();
        let parameters = self.parameter_list(&mut keywords, at)?;

        let request_body = match keywords.remove("requestBody") {
            Some(value) => Some(RequestBody::build(
                self,
                &value,
                &child_pointer(at, "requestBody"),
            )?),
            None => None,
        };

        let mut responses = IndexMap::new();
        let mut response_extensions = Map::new();
        match keywords.remove("responses") {
            Some(Value::Object(raw)) => {
                let responses_at = child_pointer(at, "responses");
                for (code, value) in &raw {
                    if code.starts_with("x-") {
                        response_extensions.insert(code.clone(), value.clone());
                        continue;
                    }
                    let slot = Response::build(self, value, &child_pointer(&responses_at, code))?;
                    responses.insert(code.clone(), slot);
                }
            }
            Some(other) => {
                return Err(shape_error("responses", &child_pointer(at, "responses"), &other))
            }
            None => {}
        }

        Ok(Operation {
            parameters,
            request_body,
            responses,
            response_extensions,
            keywords,
        })
    }

    fn parameter_list(
        &mut self,
        keywords: &mut Map<String, Value>,
        at: &str,
    ) -> AppResult<Vec<RefOr<Parameter>>> {
        let list_at = child_pointer(at, "parameters");
        match keywords.remove("parameters") {
            Some(Value::Array(values)) => values
                .iter()
                .enumerate()
                .map(|(i, v)| Parameter::build(self, v, &child_pointer(&list_at, &i.to_string())))
                .collect(),
            Some(other) => Err(shape_error("parameters", &list_at, &other)),
            None => Ok(Vec::new()),
        }
    }

    fn optional_schema(
        &mut self,
        keywords: &mut Map<String, Value>,
        at: &str,
    ) -> AppResult<Option<RefOr<Schema>>> {
        match keywords.remove("schema") {
            Some(value) => Ok(Some(self.schema(&value, &child_pointer(at, "schema"))?)),
            None => Ok(None),
        }
    }

    fn content(
        &mut self,
        keywords: &mut Map<String, Value>,
        at: &str,
    ) -> AppResult<IndexMap<String, MediaType>> {
        let content_at = child_pointer(at, "content");
        let raw = match keywords.remove("content") {
            Some(Value::Object(raw)) => raw,
            Some(other) => return Err(shape_error("content", &content_at, &other)),
            None => return Ok(IndexMap::new()),
        };

        let mut content = IndexMap::new();
        for (media_type, value) in &raw {
            let media_at = child_pointer(&content_at, media_type);
            let mut media_keywords = value
                .as_object()
                .cloned()
                .ok_or_else(|| shape_error("media type", &media_at, value))?;
            let schema = self.optional_schema(&mut media_keywords, &media_at)?;
            content.insert(
                media_type.clone(),
                MediaType {
                    schema,
                    keywords: media_keywords,
                },
            );
        }
        Ok(content)
    }
}

fn ref_of(map: &Map<String, Value>) -> Option<&str> {
    map.get("$ref").and_then(Value::as_str)
}

/// Bare component names (`Pet`) inside a schema slot address `#/components/schemas/Pet`.
fn expand_schema_shorthand(reference: &str) -> String {
    if reference.contains(['#', '/', '.']) || reference.trim().is_empty() {
        reference.to_string()
    } else {
        format!("#/components/schemas/{}", reference)
    }
}

fn take_section(
    extra: &mut Map<String, Value>,
    key: &str,
    at: &str,
) -> AppResult<Option<Map<String, Value>>> {
    match extra.remove(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(shape_error(key, &child_pointer(at, key), &other)),
    }
}

fn shape_error(what: &str, at: &str, found: &Value) -> AppError {
    let kind = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    };
    AppError::General(format!("Expected {} at {}, found {}", what, at, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oas::model::{NodeKind, SchemaKind};

    const PETSTORE: &str = r#"
openapi: 3.0.3
info:
  title: Petstore
  version: "1.0"
paths:
  /pets:
    parameters:
      - $ref: '#/components/parameters/Limit'
    get:
      operationId: listPets
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: Pet
        x-rate-limited: true
  x-internal: true
components:
  schemas:
    Pet:
      type: object
      required: [id]
      properties:
        id:
          type: integer
          format: int64
        tags:
          type: array
          items:
            $ref: '#/components/schemas/Tag'
    Tag:
      type: string
    Any: true
  parameters:
    Limit:
      name: limit
      in: query
      schema:
        type: integer
  securitySchemes:
    api_key:
      type: apiKey
      name: X-API-Key
      in: header
"#;

    #[test]
    fn test_parse_document_accepts_json() {
        let value = parse_document(br#"{"openapi": "3.1.0", "paths": {}}"#).unwrap();
        assert_eq!(value["openapi"], "3.1.0");
    }

    #[test]
    fn test_parse_document_stringifies_keys() {
        let value = parse_document(b"responses:\n  200:\n    description: ok\n  default:\n    description: err\n").unwrap();
        assert_eq!(value["responses"]["200"]["description"], "ok");
        let keys: Vec<&String> = value["responses"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["200", "default"]);
    }

    #[test]
    fn test_parse_document_rejects_garbage() {
        assert!(parse_document(b"openapi: [unterminated").is_err());
        assert!(parse_document(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_from_yaml_builds_model() {
        let doc = Document::from_yaml_str(PETSTORE).unwrap();
        assert_eq!(doc.openapi.as_deref(), Some("3.0.3"));
        assert!(doc.extra.contains_key("info"));
        assert!(doc.components.extra.contains_key("securitySchemes"));
        assert!(doc.path_extensions.contains_key("x-internal"));

        let pet = doc.schema("Pet").unwrap();
        assert_eq!(pet.schema_type(), Some("object"));
        assert!(pet.keywords.contains_key("required"));
        let tags = doc.node(pet.property("tags").unwrap()).unwrap();
        assert_eq!(
            tags.items().and_then(|i| i.reference()),
            Some("#/components/schemas/Tag")
        );

        let any = doc.schema("Any").unwrap();
        assert_eq!(any, &Schema::default());
    }

    #[test]
    fn test_operations_and_shorthand_refs() {
        let doc = Document::from_yaml_str(PETSTORE).unwrap();
        let item = doc.path_item("/pets").unwrap();
        assert_eq!(item.parameters[0].reference(), Some("#/components/parameters/Limit"));

        let get = item.operation("GET").unwrap();
        assert_eq!(get.keywords["operationId"], "listPets");
        assert!(get.response_extensions.contains_key("x-rate-limited"));

        let ok = doc.node(&get.responses["200"]).unwrap();
        assert_eq!(ok.description(), Some("ok"));
        let schema_slot = ok.content["application/json"].schema.as_ref().unwrap();
        let array = doc.node(schema_slot).unwrap();
        assert_eq!(
            array.items().and_then(|i| i.reference()),
            Some("#/components/schemas/Pet")
        );
    }

    #[test]
    fn test_location_index_covers_nested_slots() {
        let doc = Document::from_yaml_str(PETSTORE).unwrap();
        let pet_id = doc.components.schemas["Pet"].id().unwrap();
        let located = doc.index.get("#/components/schemas/Pet").unwrap();
        assert_eq!(Schema::unwrap(located), Some(RefOr::T(pet_id)));

        let tags = doc
            .index
            .get("#/components/schemas/Pet/properties/tags/items")
            .unwrap();
        assert_eq!(tags.kind(), NodeKind::Schema);

        let limit = doc.index.get("#/paths/~1pets/parameters/0").unwrap();
        assert_eq!(limit.kind(), NodeKind::Parameter);

        let media = doc
            .index
            .get("#/paths/~1pets/get/responses/200/content/application~1json/schema")
            .unwrap();
        assert_eq!(media.kind(), NodeKind::Schema);
    }

    #[test]
    fn test_false_schema_becomes_not_any() {
        let doc = Document::from_yaml_str(
            r#"
openapi: 3.1.0
components:
  schemas:
    Never: false
"#,
        )
        .unwrap();
        let never = doc.schema("Never").unwrap();
        let inner = doc.node(never.not().unwrap()).unwrap();
        assert_eq!(inner, &Schema::default());
    }

    #[test]
    fn test_composite_schema_members() {
        let doc = Document::from_yaml_str(
            r#"
openapi: 3.0.0
components:
  schemas:
    Extended:
      description: extended
      allOf:
        - $ref: '#/components/schemas/Base'
        - type: object
          properties:
            rootCause:
              $ref: '#/components/schemas/Base'
    Base:
      type: object
"#,
        )
        .unwrap();
        let extended = doc.schema("Extended").unwrap();
        assert_eq!(extended.description(), Some("extended"));
        let members = extended.members().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].reference(), Some("#/components/schemas/Base"));
        let second = doc.node(&members[1]).unwrap();
        assert!(second.property("rootCause").is_some());
    }

    #[test]
    fn test_schema_slots_are_independent_of_kind() {
        let doc = Document::from_yaml_str(
            r#"
openapi: 3.0.0
components:
  schemas:
    Mixed:
      allOf:
        - $ref: '#/components/schemas/Base'
      oneOf:
        - $ref: '#/components/schemas/Cat'
      properties:
        owner:
          $ref: '#/components/schemas/User'
    Listing:
      type: array
      items:
        type: string
      properties:
        total:
          type: integer
"#,
        )
        .unwrap();
        let mixed = doc.schema("Mixed").unwrap();
        assert_eq!(mixed.kind(), SchemaKind::Composite(Composition::AllOf));
        assert_eq!(
            mixed.composition(Composition::OneOf).unwrap()[0].reference(),
            Some("#/components/schemas/Cat")
        );
        assert_eq!(
            mixed.property("owner").and_then(RefOr::reference),
            Some("#/components/schemas/User")
        );
        assert!(!mixed.keywords.contains_key("oneOf"));
        assert!(doc.index.get("#/components/schemas/Mixed/oneOf/0").is_some());

        let listing = doc.schema("Listing").unwrap();
        assert_eq!(listing.kind(), SchemaKind::Array);
        assert!(listing.items().is_some());
        assert!(listing.property("total").is_some());
    }

    #[test]
    fn test_rejects_non_array_composition() {
        let err = Document::from_yaml_str(
            r#"
openapi: 3.0.0
components:
  schemas:
    Broken:
      anyOf:
        type: string
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("#/components/schemas/Broken/anyOf"));
    }

    #[test]
    fn test_rejects_non_mapping_schema() {
        let err = Document::from_yaml_str(
            r#"
openapi: 3.0.0
components:
  schemas:
    Broken: 42
"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "General Error: Expected schema at #/components/schemas/Broken, found a number"
        );
    }

    #[test]
    fn test_import_qualifies_nested_refs() {
        let remote = serde_json::json!({
            "Pet": {
                "type": "object",
                "properties": {
                    "owner": { "$ref": "#/User" },
                    "vet": { "$ref": "vets.yaml#/Vet" }
                }
            }
        });
        let mut store = Store::default();
        let mut index = LocationIndex::default();
        let segments = vec!["Pet".to_string()];
        let slot: RefOr<Schema> = import(
            &mut store,
            &mut index,
            "http://example.com/specs/pet.yaml",
            &segments,
            &remote["Pet"],
        )
        .unwrap();

        let pet = store.schemas.get(slot.id().unwrap()).unwrap();
        assert_eq!(
            pet.property("owner").and_then(RefOr::reference),
            Some("http://example.com/specs/pet.yaml#/User")
        );
        assert_eq!(
            pet.property("vet").and_then(RefOr::reference),
            Some("http://example.com/specs/vets.yaml#/Vet")
        );
        assert!(index
            .get("http://example.com/specs/pet.yaml#/Pet/properties/owner")
            .is_some());
    }
}
