//! Data model for §3/§4.1: Category → Product → Program → ExpectedDocument.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top business domain a Package belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Non-QM.
    Nqm,
    /// Retail.
    Rtl,
    /// Small Balance Commercial.
    Sbc,
    /// Conventional/conforming.
    Conv,
}

impl Category {
    /// Parse a category code case-insensitively, as supplied by callers.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "NQM" => Some(Self::Nqm),
            "RTL" => Some(Self::Rtl),
            "SBC" => Some(Self::Sbc),
            "CONV" => Some(Self::Conv),
            _ => None,
        }
    }
}

/// Lifecycle status of a Package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageStatus {
    /// Being assembled; not yet eligible for processing.
    Draft,
    /// Live and processed normally.
    Active,
    /// Retired; retained for history only.
    Archived,
}

/// Semantic MAJOR.MINOR.PATCH version, per §4.1 "Versioning".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SemVer {
    /// Major component. Incremented on a rollback or breaking change.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl SemVer {
    /// The initial version for a newly created Package.
    #[must_use]
    pub fn initial() -> Self {
        Self { major: 1, minor: 0, patch: 0 }
    }

    /// Apply a caller-supplied change kind. The system never infers which
    /// kind applies (§4.1: "Change type is supplied by the caller").
    #[must_use]
    pub fn bump(self, change: VersionChange) -> Self {
        match change {
            VersionChange::Major => Self { major: self.major + 1, minor: 0, patch: 0 },
            VersionChange::Minor => Self { major: self.major, minor: self.minor + 1, patch: 0 },
            VersionChange::Patch => Self { major: self.major, minor: self.minor, patch: self.patch + 1 },
        }
    }
}

impl std::fmt::Display for SemVer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The kind of version change a caller is declaring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChange {
    /// Breaking/structural change. Always used for rollbacks.
    Major,
    /// Additive change.
    Minor,
    /// Non-structural correction.
    Patch,
}

/// Document type a slot accepts, and a bound document is detected as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    /// Underwriting guidelines narrative.
    Guidelines,
    /// Rate/eligibility matrix.
    Matrix,
    /// Pricing rate sheet.
    RateSheet,
    /// General knowledge-base document.
    KnowledgeBase,
}

/// Upload lifecycle of an ExpectedDocument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    /// No document bound yet.
    Empty,
    /// A document reference has been bound but not yet processed.
    Uploaded,
    /// The pipeline is currently processing the bound document.
    Processing,
    /// Processing finished successfully.
    Completed,
    /// Processing failed permanently.
    Failed,
}

/// A reserved placeholder for a document of a known type (§3, §4.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedDocument {
    /// Stable slot identifier.
    pub slot_id: String,
    /// Owning Product id, if this slot lives at Product tier (Guidelines).
    pub product_id: Option<String>,
    /// Owning Program id, if this slot lives at Program tier (Matrix).
    pub program_id: Option<String>,
    /// Accepted document type.
    pub document_type: DocumentType,
    /// Whether the package is invalid without this slot filled.
    pub required: bool,
    /// Current upload lifecycle state.
    pub upload_status: UploadStatus,
    /// MIME types this slot accepts.
    pub accepted_mime_types: Vec<String>,
    /// Maximum accepted size in bytes.
    pub max_size_bytes: u64,
    /// Reference to the bound raw document, once uploaded.
    pub raw_document_ref: Option<String>,
}

/// A variant inside a Product; owns one Matrix document slot (§GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Stable program identifier.
    pub program_id: String,
    /// Owning Product id.
    pub product_id: String,
    /// Short code, e.g. "STD"/"JMB"/"INV".
    pub code: String,
    /// This program's document slots (must include ≥1 Matrix, enforced at
    /// creation by [`super::ops::create_package`]).
    pub slots: Vec<ExpectedDocument>,
}

/// A lending offering inside a Category; owns one Guidelines document slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product identifier.
    pub product_id: String,
    /// Owning Package id.
    pub package_id: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Lower values processed first when multiple Products are submitted
    /// together (§5 ordering guarantees apply within a Product's own
    /// Guidelines-before-Matrices rule, not across Products).
    pub processing_priority: i32,
    /// This product's own document slots (must include ≥1 Guidelines).
    pub slots: Vec<ExpectedDocument>,
    /// Programs owned by this product.
    pub programs: Vec<Program>,
}

/// A hierarchical definition of a lending institution's document set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Stable package identifier.
    pub package_id: String,
    /// Top-level business domain.
    pub category: Category,
    /// Lifecycle status.
    pub status: PackageStatus,
    /// Current semantic version.
    pub version: SemVer,
    /// Products owned by this package.
    pub products: Vec<Product>,
}

impl Package {
    /// Find a slot by id anywhere in the Package (Product- or Program-level).
    #[must_use]
    pub fn find_slot(&self, slot_id: &str) -> Option<&ExpectedDocument> {
        for product in &self.products {
            if let Some(slot) = product.slots.iter().find(|s| s.slot_id == slot_id) {
                return Some(slot);
            }
            for program in &product.programs {
                if let Some(slot) = program.slots.iter().find(|s| s.slot_id == slot_id) {
                    return Some(slot);
                }
            }
        }
        None
    }

    fn find_slot_mut(&mut self, slot_id: &str) -> Option<&mut ExpectedDocument> {
        for product in &mut self.products {
            if product.slots.iter().any(|s| s.slot_id == slot_id) {
                return product.slots.iter_mut().find(|s| s.slot_id == slot_id);
            }
            for program in &mut product.programs {
                if program.slots.iter().any(|s| s.slot_id == slot_id) {
                    return program.slots.iter_mut().find(|s| s.slot_id == slot_id);
                }
            }
        }
        None
    }

    pub(super) fn bind_slot(
        &mut self,
        slot_id: &str,
        raw_document_ref: &str,
        detected_type: DocumentType,
    ) -> crate::error::Result<()> {
        let slot = self
            .find_slot_mut(slot_id)
            .ok_or_else(|| crate::error::Error::NotFound(format!("slot {slot_id}")))?;
        if slot.document_type != detected_type {
            return Err(crate::error::Error::SlotTypeMismatch {
                expected: slot.document_type,
                actual: detected_type,
            });
        }
        slot.raw_document_ref = Some(raw_document_ref.to_string());
        slot.upload_status = UploadStatus::Uploaded;
        Ok(())
    }
}

/// An append-only snapshot history used for `snapshot`/`rollback` (§4.1,
/// §8 "Snapshot(v) then Rollback(v) yields a package state graph-equivalent
/// to v"). Kept explicit rather than re-derived from a diff log (see
/// DESIGN.md).
#[derive(Debug, Clone, Default)]
pub struct PackageHistory {
    snapshots: HashMap<SemVer, Package>,
}

impl PackageHistory {
    /// An empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `package` under its current version.
    pub fn record(&mut self, package: &Package) {
        self.snapshots.insert(package.version, package.clone());
    }

    /// Retrieve the full state recorded at `version`.
    #[must_use]
    pub fn get(&self, version: SemVer) -> Option<&Package> {
        self.snapshots.get(&version)
    }
}
