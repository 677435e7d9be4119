use oas_deref_core::oas::RefOr;
use oas_deref_core::{
    resolve_document, DefaultFetcher, Document, OpenApiResolver, ResolveOptions, WarningKind,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

const ROOT: &str = r#"
openapi: 3.0.3
info:
  title: Split document
  version: 1.0.0
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: 'models/pet.yaml#/Pet'
components:
  schemas:
    Pet:
      $ref: './models/pet.yaml#/Pet'
    Tag:
      type: string
    Ghost:
      $ref: 'models/missing.yaml#/Ghost'
"#;

const PET: &str = r#"
Pet:
  type: object
  properties:
    owner:
      $ref: '../common/user.yaml#/User'
    parent:
      $ref: '#/Pet'
    tag:
      $ref: '../openapi.yaml#/components/schemas/Tag'
"#;

const USER: &str = r#"
User:
  type: object
  properties:
    id:
      type: integer
      format: int64
"#;

fn write(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

#[test]
fn test_relative_file_references() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "openapi.yaml", ROOT);
    write(dir.path(), "models/pet.yaml", PET);
    write(dir.path(), "common/user.yaml", USER);

    let root_path = dir.path().join("openapi.yaml");
    let mut doc = Document::from_yaml_str(&fs::read_to_string(&root_path).unwrap()).unwrap();

    let fetcher = DefaultFetcher::new();
    let report = OpenApiResolver::new(&fetcher)
        .with_options(ResolveOptions::new().base_locator(root_path.to_string_lossy()))
        .resolve(&mut doc)
        .unwrap();

    // Only the missing file is reported.
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::RemoteFetchError);
    assert_eq!(report.warnings[0].site, "#/components/schemas/Ghost");
    assert_eq!(report.fetched_documents, 3);

    // Both spellings of the pet locator share one node.
    let pet_id = doc.components.schemas["Pet"].id().unwrap();
    let get = doc.path_item("/pets").unwrap().operation("get").unwrap();
    let ok = doc.node(&get.responses["200"]).unwrap();
    assert_eq!(
        ok.content["application/json"].schema.as_ref().and_then(RefOr::id),
        Some(pet_id)
    );

    let pet = doc.get(pet_id).unwrap();
    assert_eq!(pet.property("parent").and_then(RefOr::id), Some(pet_id));

    let owner = doc.node(pet.property("owner").unwrap()).unwrap();
    let id = doc.node(owner.property("id").unwrap()).unwrap();
    assert_eq!(id.format(), Some("int64"));

    // A reference back into the root document lands on the local component.
    assert_eq!(
        pet.property("tag").and_then(RefOr::id),
        doc.components.schemas["Tag"].id()
    );

    assert!(matches!(
        doc.components.schemas["Ghost"],
        RefOr::Unresolved(_)
    ));
}

#[test]
fn test_resolve_document_convenience() {
    let mut doc = Document::from_yaml_str(
        r#"
openapi: 3.0.3
paths:
  /tags:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: Tag
components:
  schemas:
    Tag:
      type: string
"#,
    )
    .unwrap();
    let report = resolve_document(&mut doc, vec![]).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.resolved_sites, 1);
    assert_eq!(report.fetched_documents, 0);
}
