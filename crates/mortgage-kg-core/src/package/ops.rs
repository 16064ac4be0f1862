//! Operations over the package model (§4.1): `create_package`,
//! `bind_document`, `snapshot`, `rollback`.

use super::model::{
    Category, Package, PackageHistory, PackageStatus, Product, Program, SemVer, VersionChange,
};
use crate::error::{Error, Result};

/// Input shape for a Program when assembling a new Package.
#[derive(Debug, Clone)]
pub struct ProgramSpec {
    /// Short code, e.g. "STD".
    pub code: String,
    /// Document slots this program owns; at least one must be
    /// `DocumentType::Matrix`.
    pub slots: Vec<super::model::ExpectedDocument>,
}

/// Input shape for a Product when assembling a new Package.
#[derive(Debug, Clone)]
pub struct ProductSpec {
    /// Human-readable display name.
    pub display_name: String,
    /// Processing priority (lower runs first).
    pub processing_priority: i32,
    /// Document slots this product owns; at least one must be
    /// `DocumentType::Guidelines`.
    pub slots: Vec<super::model::ExpectedDocument>,
    /// Programs owned by this product.
    pub programs: Vec<ProgramSpec>,
}

fn has_type(slots: &[super::model::ExpectedDocument], ty: super::model::DocumentType) -> bool {
    slots.iter().any(|s| s.document_type == ty)
}

/// Create a new Package. Rejects an unknown category, a Product with no
/// Guidelines slot, or a Program with no Matrix slot (§4.1).
pub fn create_package(
    package_id: impl Into<String>,
    category_code: &str,
    products: Vec<ProductSpec>,
) -> Result<Package> {
    let category = Category::parse(category_code)
        .ok_or_else(|| Error::InvalidPackageDefinition(format!("unknown category {category_code}")))?;

    let package_id = package_id.into();
    let mut built_products = Vec::with_capacity(products.len());
    for (i, spec) in products.into_iter().enumerate() {
        if !has_type(&spec.slots, super::model::DocumentType::Guidelines) {
            return Err(Error::InvalidPackageDefinition(format!(
                "product '{}' has no Guidelines slot",
                spec.display_name
            )));
        }
        let product_id = format!("{package_id}-product-{i}");
        let mut built_programs = Vec::with_capacity(spec.programs.len());
        for (j, prog) in spec.programs.into_iter().enumerate() {
            if !has_type(&prog.slots, super::model::DocumentType::Matrix) {
                return Err(Error::InvalidPackageDefinition(format!(
                    "program '{}' has no Matrix slot",
                    prog.code
                )));
            }
            built_programs.push(Program {
                program_id: format!("{product_id}-program-{j}"),
                product_id: product_id.clone(),
                code: prog.code,
                slots: prog.slots,
            });
        }
        built_products.push(Product {
            product_id,
            package_id: package_id.clone(),
            display_name: spec.display_name,
            processing_priority: spec.processing_priority,
            slots: spec.slots,
            programs: built_programs,
        });
    }

    Ok(Package {
        package_id,
        category,
        status: PackageStatus::Draft,
        version: SemVer::initial(),
        products: built_products,
    })
}

/// Bind a raw document to a slot. Fails with `SlotTypeMismatch` if
/// `detected_type` disagrees with the slot's declared `document_type`.
pub fn bind_document(
    package: &mut Package,
    slot_id: &str,
    raw_document_ref: &str,
    detected_type: super::model::DocumentType,
) -> Result<()> {
    package.bind_slot(slot_id, raw_document_ref, detected_type)
}

/// Capture the full package state under its current version, for later
/// rollback.
pub fn snapshot(package: &Package, history: &mut PackageHistory) -> SemVer {
    history.record(package);
    package.version
}

/// Restore a prior snapshot by creating a new version (always MAJOR, §4.1)
/// whose state equals the snapshot taken at `version`.
pub fn rollback(history: &PackageHistory, version: SemVer) -> Result<Package> {
    let restored = history
        .get(version)
        .ok_or_else(|| Error::NotFound(format!("package snapshot at version {version}")))?;
    let mut rolled_back = restored.clone();
    rolled_back.version = restored.version.bump(VersionChange::Major);
    Ok(rolled_back)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::model::{DocumentType, ExpectedDocument, UploadStatus};

    fn slot(slot_id: &str, ty: DocumentType) -> ExpectedDocument {
        ExpectedDocument {
            slot_id: slot_id.to_string(),
            product_id: None,
            program_id: None,
            document_type: ty,
            required: true,
            upload_status: UploadStatus::Empty,
            accepted_mime_types: vec!["application/pdf".to_string()],
            max_size_bytes: 50_000_000,
            raw_document_ref: None,
        }
    }

    fn sample_product() -> ProductSpec {
        ProductSpec {
            display_name: "Non-QM Standard".to_string(),
            processing_priority: 0,
            slots: vec![slot("guidelines-1", DocumentType::Guidelines)],
            programs: vec![ProgramSpec {
                code: "STD".to_string(),
                slots: vec![slot("matrix-1", DocumentType::Matrix)],
            }],
        }
    }

    #[test]
    fn creates_package_with_valid_slots() {
        let package = create_package("pkg-1", "NQM", vec![sample_product()]).expect("valid package");
        assert_eq!(package.products.len(), 1);
        assert_eq!(package.products[0].programs.len(), 1);
        assert_eq!(package.version, SemVer::initial());
    }

    #[test]
    fn rejects_unknown_category() {
        let err = create_package("pkg-1", "XYZ", vec![sample_product()]).unwrap_err();
        assert!(matches!(err, Error::InvalidPackageDefinition(_)));
    }

    #[test]
    fn rejects_product_without_guidelines_slot() {
        let mut product = sample_product();
        product.slots.clear();
        let err = create_package("pkg-1", "NQM", vec![product]).unwrap_err();
        assert!(matches!(err, Error::InvalidPackageDefinition(_)));
    }

    #[test]
    fn rejects_program_without_matrix_slot() {
        let mut product = sample_product();
        product.programs[0].slots.clear();
        let err = create_package("pkg-1", "NQM", vec![product]).unwrap_err();
        assert!(matches!(err, Error::InvalidPackageDefinition(_)));
    }

    #[test]
    fn bind_document_updates_slot_status() {
        let mut package = create_package("pkg-1", "NQM", vec![sample_product()]).unwrap();
        bind_document(&mut package, "guidelines-1", "doc-1", DocumentType::Guidelines).unwrap();
        let slot = package.find_slot("guidelines-1").unwrap();
        assert_eq!(slot.upload_status, UploadStatus::Uploaded);
        assert_eq!(slot.raw_document_ref.as_deref(), Some("doc-1"));
    }

    #[test]
    fn bind_document_rejects_type_mismatch() {
        let mut package = create_package("pkg-1", "NQM", vec![sample_product()]).unwrap();
        let err = bind_document(&mut package, "guidelines-1", "doc-1", DocumentType::Matrix)
            .unwrap_err();
        assert!(matches!(err, Error::SlotTypeMismatch { .. }));
    }

    #[test]
    fn snapshot_then_rollback_restores_state() {
        let mut package = create_package("pkg-1", "NQM", vec![sample_product()]).unwrap();
        let mut history = PackageHistory::new();
        let v1 = snapshot(&package, &mut history);

        bind_document(&mut package, "guidelines-1", "doc-1", DocumentType::Guidelines).unwrap();
        package.version = package.version.bump(VersionChange::Minor);
        snapshot(&package, &mut history);

        let restored = rollback(&history, v1).unwrap();
        assert_eq!(
            restored.find_slot("guidelines-1").unwrap().upload_status,
            UploadStatus::Empty
        );
        assert_eq!(restored.version, SemVer { major: 2, minor: 0, patch: 0 });
    }

    #[test]
    fn rollback_to_unknown_version_is_not_found() {
        let history = PackageHistory::new();
        let err = rollback(&history, SemVer::initial()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
