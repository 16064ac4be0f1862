//! Package Model & Expected-Document Slots (§4.1).

pub mod model;
mod ops;

pub use model::{
    Category, DocumentType, ExpectedDocument, Package, PackageHistory, PackageStatus, Product,
    Program, SemVer, UploadStatus, VersionChange,
};
pub use ops::{bind_document, create_package, rollback, snapshot, ProductSpec, ProgramSpec};
