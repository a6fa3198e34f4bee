//! Benchmarks for schema extraction and rich text conversion.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use docfill::html::parse_fragment;
use docfill::merge::{RelationshipRegistry, RichLookup, RichTextMerger};
use docfill::package::PackageKind;
use docfill::template::tokens_from_part;

const FRAGMENT: &str = concat!(
    "<h2>Condiciones</h2>",
    "<p>El <strong>arrendatario</strong> acepta las <em>condiciones</em> del ",
    "<a href=\"https://example.com/condiciones\">anexo</a>.</p>",
    "<ul><li>Primera</li><li>Segunda<ol><li>Detalle</li></ol></li></ul>",
    "<table><tr><th>Concepto</th><th>Importe</th></tr><tr><td>Renta</td><td>800</td></tr></table>",
);

/// A document body with `paragraphs` placeholders split across runs.
fn template_document(paragraphs: usize) -> String {
    let mut body = String::new();
    for i in 0..paragraphs {
        body.push_str(&format!(
            "<w:p><w:r><w:t>Campo [camp</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>o{i};type='text';length='40']</w:t></w:r></w:p>"
        ));
    }
    format!("<w:document><w:body>{body}</w:body></w:document>")
}

/// A generated document with the escaped fragment every tenth paragraph.
fn generated_document(paragraphs: usize) -> String {
    let escaped = FRAGMENT
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    let mut body = String::new();
    for i in 0..paragraphs {
        if i % 10 == 0 {
            body.push_str(&format!("<w:p><w:r><w:t>{escaped}</w:t></w:r></w:p>"));
        } else {
            body.push_str("<w:p><w:r><w:t>Texto sin formato.</w:t></w:r></w:p>");
        }
    }
    format!("<w:document><w:body>{body}</w:body></w:document>")
}

fn bench_tokenize(c: &mut Criterion) {
    let xml = template_document(500);
    c.bench_function("tokens_from_part", |b| {
        b.iter(|| tokens_from_part(black_box(&xml), PackageKind::Docx));
    });
}

fn bench_parse_fragment(c: &mut Criterion) {
    c.bench_function("parse_fragment", |b| {
        b.iter(|| parse_fragment(black_box(FRAGMENT)));
    });
}

fn bench_convert_docx(c: &mut Criterion) {
    let xml = generated_document(500);
    let lookup = RichLookup::from_values([FRAGMENT]);
    let merger = RichTextMerger::new();

    c.bench_function("convert_docx_part", |b| {
        b.iter(|| {
            let mut rels = RelationshipRegistry::new();
            merger
                .convert_docx_part(black_box(&xml), &lookup, &mut rels)
                .unwrap()
        });
    });
}

fn bench_convert_odt(c: &mut Criterion) {
    let xml = generated_document(500)
        .replace("<w:document><w:body>", "<office:document-content><office:body><office:text>")
        .replace("</w:body></w:document>", "</office:text></office:body></office:document-content>")
        .replace("<w:p><w:r><w:t>", "<text:p>")
        .replace("</w:t></w:r></w:p>", "</text:p>");
    let lookup = RichLookup::from_values([FRAGMENT]);
    let merger = RichTextMerger::new();

    c.bench_function("convert_odt_part", |b| {
        b.iter(|| merger.convert_odt_part(black_box(&xml), &lookup).unwrap());
    });
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_parse_fragment,
    bench_convert_docx,
    bench_convert_odt,
);
criterion_main!(benches);
