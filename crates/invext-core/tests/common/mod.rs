//! PDF fixtures built with lopdf.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::encryption::{decrypt_object, get_encryption_key};
use lopdf::{Document, Object, Stream, dictionary};

/// Build a PDF with one text line per entry on each page.
pub fn build_pdf(pages: &[&[&str]]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for line in lines.iter() {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("Td", vec![0.into(), (-16).into()]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// RC4-encrypt every stream so the document opens with the empty password.
///
/// With `wrong_user_hash`, the stored user hash never matches, so no password
/// opens it.
pub fn encrypt_with_empty_password(doc: &mut Document, wrong_user_hash: bool) {
    let mut encrypt = dictionary! {
        "Filter" => "Standard",
        "V" => 2,
        "R" => 2,
        "Length" => 40,
        "O" => Object::string_literal(vec![0x42u8; 32]),
        "P" => -44,
        "CF" => dictionary! { "StdCF" => dictionary! { "CFM" => "V2" } },
    };
    if wrong_user_hash {
        encrypt.set("U", Object::string_literal(vec![0u8; 32]));
    }
    let encrypt_id = doc.add_object(encrypt);
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::string_literal("invext-fixture-id"),
            Object::string_literal("invext-fixture-id"),
        ],
    );

    // RC4 is symmetric: "decrypting" plaintext encrypts it.
    let key = get_encryption_key(doc, "", false).unwrap();
    for (&id, object) in doc.objects.iter_mut() {
        if !matches!(object, Object::Stream(_)) {
            continue;
        }
        let encrypted = decrypt_object(&key, id, &*object, false).unwrap();
        if let Object::Stream(stream) = object {
            stream.set_content(encrypted);
        }
    }
}

/// Serialize a document.
pub fn pdf_bytes(mut doc: Document) -> Vec<u8> {
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// The two-page invoice used by the end-to-end tests.
pub fn two_page_invoice() -> Document {
    build_pdf(&[
        &[
            "Acme Corp",
            "Invoice INV-001",
            "Invoice Date: 2024-01-15",
            "Total Amount: 1200.00",
            "Bill To: Riverside Apartments",
        ],
        &["Invoice INV-001 continued", "Payment Terms: Net 30"],
    ])
}
