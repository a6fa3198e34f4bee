#![cfg(feature = "archive")]

mod common;

use docfill::template::SCHEMA_VERSION;
use docfill::{Error, FieldType, PackageKind, extract_schema};
use tempfile::TempDir;

const DOCX_BODY: &str = concat!(
    r#"<w:p><w:r><w:t xml:space="preserve">Sr. [nom</w:t></w:r><w:proofErr w:type="spellStart"/><w:r><w:rPr><w:b/></w:rPr><w:t>bre;type='text';length='80']</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>[importe;type=number;minvalue=0]</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>Firma: [nombre]</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>[items;block=begin;repeat=lineas;title='Líneas de pedido']</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>[descripcion;type=textarea]</w:t></w:r><w:r><w:tab/><w:t>[precio;type=decimal]</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>[items;block=end]</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>Ver [onshow.fecha] y [;suelto]</w:t></w:r></w:p>"#,
);

#[test]
fn test_extract_docx_schema() {
    let dir = TempDir::new().unwrap();
    let path = common::docx(dir.path(), "contrato.docx", DOCX_BODY);

    let schema = extract_schema(&path).unwrap();

    let slugs: Vec<_> = schema.fields.iter().map(|f| f.slug.as_str()).collect();
    assert_eq!(slugs, vec!["nombre", "importe", "nombre_2"]);

    let nombre = schema.field("nombre").unwrap();
    assert_eq!(nombre.field_type, FieldType::Text);
    assert_eq!(nombre.length, Some(80));
    assert_eq!(nombre.title, "Nombre");
    assert!(!nombre.is_duplicate);

    let importe = schema.field("importe").unwrap();
    assert_eq!(importe.field_type, FieldType::Number);
    assert_eq!(importe.min_value.as_deref(), Some("0"));

    let duplicate = schema.field("nombre_2").unwrap();
    assert!(duplicate.is_duplicate);
    assert_eq!(duplicate.merge_key, "nombre");

    assert_eq!(schema.repeaters.len(), 1);
    let lineas = schema.repeater("lineas").unwrap();
    assert_eq!(lineas.name, "items");
    assert_eq!(lineas.title, "Líneas de pedido");
    let inner: Vec<_> = lineas
        .fields
        .iter()
        .map(|f| (f.slug.as_str(), f.field_type))
        .collect();
    assert_eq!(
        inner,
        vec![
            ("descripcion", FieldType::Textarea),
            ("precio", FieldType::Number)
        ]
    );

    let meta = schema.meta.as_ref().unwrap();
    assert_eq!(meta.template_kind, PackageKind::Docx);
    assert_eq!(meta.template_name, "contrato.docx");
    assert_eq!(meta.hash.len(), 40);
}

#[test]
fn test_extract_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let path = common::docx(dir.path(), "contrato.docx", DOCX_BODY);
    assert_eq!(extract_schema(&path).unwrap(), extract_schema(&path).unwrap());
}

#[test]
fn test_extract_odt_schema() {
    let dir = TempDir::new().unwrap();
    let path = common::odt(
        dir.path(),
        "plantilla.odt",
        concat!(
            r#"<text:p>Nombre: <text:span text:style-name="T1">[nom</text:span><text:span text:style-name="T2">bre]</text:span></text:p>"#,
            r#"<text:p>[fecha;type=date;description='Fecha de alta']</text:p>"#,
            r#"<text:p>[correo;type=email;placeholder="a@b.es"]</text:p>"#,
        ),
    );

    let schema = extract_schema(&path).unwrap();
    let fields: Vec<_> = schema
        .fields
        .iter()
        .map(|f| (f.slug.as_str(), f.field_type))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("nombre", FieldType::Text),
            ("fecha", FieldType::Date),
            ("correo", FieldType::Email)
        ]
    );
    assert_eq!(
        schema.field("fecha").unwrap().description.as_deref(),
        Some("Fecha de alta")
    );
    assert_eq!(
        schema.field("correo").unwrap().placeholder.as_deref(),
        Some("a@b.es")
    );
    assert_eq!(schema.meta.unwrap().template_kind, PackageKind::Odt);
}

#[test]
fn test_schema_json_shape() {
    let dir = TempDir::new().unwrap();
    let path = common::docx(dir.path(), "contrato.docx", DOCX_BODY);
    let json = serde_json::to_value(extract_schema(&path).unwrap()).unwrap();

    assert_eq!(json["fields"][0]["slug"], "nombre");
    assert_eq!(json["fields"][0]["type"], "text");
    assert_eq!(json["fields"][1]["minvalue"], "0");
    assert_eq!(json["fields"][2]["is_duplicate"], true);
    assert_eq!(json["repeaters"][0]["fields"][1]["type"], "number");
    assert_eq!(json["meta"]["template_kind"], "docx");
}

#[test]
fn test_schema_version_lives_in_meta() {
    let dir = TempDir::new().unwrap();
    let path = common::docx(dir.path(), "contrato.docx", DOCX_BODY);
    let schema = extract_schema(&path).unwrap();
    assert_eq!(schema.meta.as_ref().unwrap().version, SCHEMA_VERSION);

    let json = serde_json::to_value(&schema).unwrap();
    assert_eq!(json["meta"]["version"], 2);
    assert!(json.get("version").is_none());
}

#[test]
fn test_template_without_placeholders() {
    let dir = TempDir::new().unwrap();
    let path = common::docx(dir.path(), "vacio.docx", "<w:p><w:r><w:t>Sin campos</w:t></w:r></w:p>");
    let schema = extract_schema(&path).unwrap();
    assert!(schema.is_empty());
}

#[test]
fn test_missing_template() {
    let dir = TempDir::new().unwrap();
    let err = extract_schema(dir.path().join("nada.docx")).unwrap_err();
    assert!(matches!(err, Error::TemplateMissing(_)));
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notas.txt");
    std::fs::write(&path, "[nombre]").unwrap();
    assert!(matches!(
        extract_schema(&path).unwrap_err(),
        Error::TemplateInvalid(_)
    ));
}

#[test]
fn test_not_a_zip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("roto.docx");
    std::fs::write(&path, b"esto no es un zip").unwrap();
    assert!(matches!(
        extract_schema(&path).unwrap_err(),
        Error::TemplateInvalid(_)
    ));
}

#[test]
fn test_package_without_text_parts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hueco.docx");
    common::write_package(&path, &[("[Content_Types].xml", common::CONTENT_TYPES)]);
    assert!(matches!(
        extract_schema(&path).unwrap_err(),
        Error::UnreadableContent(_)
    ));
}

#[test]
fn test_headers_are_scanned() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("membrete.docx");
    let document = common::docx_document("<w:p><w:r><w:t>[cuerpo;type=html]</w:t></w:r></w:p>");
    let header = format!(
        r#"<w:hdr xmlns:w="{}"><w:p><w:r><w:t>[empresa]</w:t></w:r></w:p></w:hdr>"#,
        common::W_NS
    );
    common::write_package(
        &path,
        &[
            ("[Content_Types].xml", common::CONTENT_TYPES),
            ("word/document.xml", &document),
            ("word/header1.xml", &header),
        ],
    );

    let schema = extract_schema(&path).unwrap();
    let slugs: Vec<_> = schema.fields.iter().map(|f| f.slug.as_str()).collect();
    assert_eq!(slugs, vec!["cuerpo", "empresa"]);
    assert_eq!(schema.fields[0].field_type, FieldType::Html);
}
