//! Unity asset bundle and serialized file reader
//!
//! Decodes engine asset containers into typed data without the engine.
//!
//! # Layers
//!
//! ## Containers (`bundle`)
//!
//! Legacy `UnityWeb`/`UnityRaw` bundles and block-based `UnityFS` bundles are
//! normalised into independent in-memory segments:
//! - Null-terminated signature, big-endian format number
//! - Player and engine version strings
//! - Flat file table (legacy) or compressed block-info table (`UnityFS`)
//!
//! ## Serialized files (`asset`)
//!
//! Each segment is a serialized file holding:
//! - A version-dependent header (formats 6, 7, 8, 9, 14-17)
//! - The embedded type tree, one flat level-annotated node list per class
//! - The preload index locating every object
//! - The shared-file table used to resolve cross-file references
//!
//! ## Objects (`reader`, `bind`)
//!
//! Object bytes are decoded through their class's type tree into a generic
//! [`Value`] graph, which [`bind`] maps onto statically declared Rust types.
//!
//! ```no_run
//! use ustudio::{Bundle, class_id};
//!
//! # fn main() -> ustudio::Result<()> {
//! let bundle = Bundle::open("score.unity3d")?;
//! for file in bundle.files() {
//!     for entry in file.objects_of_class(class_id::MONO_BEHAVIOUR) {
//!         let value = file.decode_object(entry)?;
//!         println!("{}", value.to_json_pretty()?);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod bind;
pub mod build_settings;
pub mod bundle;
mod cancel;
pub mod class_id;
pub mod compression;
pub mod endian;
mod options;
pub mod platform;
pub mod pptr;
pub mod reader;
pub mod schema;
mod strings;
pub mod value;
pub mod version;

#[cfg(test)]
mod testutil;

pub use asset::{AssetFile, PreloadEntry, SharedFileReference};
pub use bind::{
    bind, Bind, BindContext, Binding, Converter, NamingConvention, NumericConverter, Population, SchemaObject,
    TypeDesc,
};
pub use bundle::{read_segments, Bundle, ContainerHeader, Segment, Signature};
pub use cancel::CancelToken;
pub use compression::Codec;
pub use endian::{Endian, EndianReader, EndianWriter};
pub use options::Options;
pub use platform::Platform;
pub use pptr::{PPtr, ScriptHeader};
pub use reader::{decode_object, decode_object_with, ObjectReader};
pub use schema::{ClassSchema, ClassSchemaTable, SchemaNode};
pub use value::{Members, Object, Value, ValueKind};

/// Node flag requesting 4-byte alignment after the value
pub const ALIGN_FLAG: u32 = 0x4000;

/// Signature of block-based containers
pub const UNITY_FS: &str = "UnityFS";

/// Errors from container, file, and object decoding
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unknown container signature {0:?}")]
    UnknownSignature(String),

    #[error("Unsupported container format {format} for signature {signature:?}")]
    UnsupportedBundleFormat { signature: String, format: i32 },

    #[error("Unsupported serialized file format version {0}")]
    UnsupportedAssetFormat(i32),

    #[error("Unknown compression codec selector {0}")]
    UnknownCodec(u32),

    #[error("{codec} decompression error: {message}")]
    Decompression { codec: Codec, message: String },

    #[error("Decompression size mismatch: expected {expected}, got {actual}")]
    DecompressionSize { expected: usize, actual: usize },

    #[error("Data too short: need {needed} bytes, got {actual}")]
    DataTooShort { needed: usize, actual: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("No type tree for class {0}")]
    MissingTypeTree(i32),

    #[error("Type index {0} out of range of the class list")]
    UnknownTypeIndex(i32),

    #[error("Expected class {expected}, got {actual}")]
    UnexpectedClass { expected: u16, actual: u16 },

    #[error("Read out of bounds: need {needed} bytes at offset {offset}, length is {len}")]
    OutOfBounds { offset: u64, needed: usize, len: usize },

    #[error("Failed to decode {path}: {source}")]
    Decode { path: String, source: Box<Error> },

    #[error("Member {member} expects {expected}, got {found}")]
    SchemaMismatch {
        member: String,
        expected: String,
        found: String,
    },

    #[error("No member of {type_name} matches key {key:?}")]
    UnresolvedMember { type_name: String, key: String },

    #[error("Serialized type {from} cannot be converted to {to}")]
    Conversion { from: ValueKind, to: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse error classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Bounds,
    SchemaMismatch,
    UnresolvedMember,
    Conversion,
    Cancelled,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownSignature(_)
            | Error::UnsupportedBundleFormat { .. }
            | Error::UnsupportedAssetFormat(_)
            | Error::UnknownCodec(_)
            | Error::Decompression { .. }
            | Error::DecompressionSize { .. }
            | Error::DataTooShort { .. }
            | Error::InvalidData(_)
            | Error::MissingTypeTree(_)
            | Error::UnknownTypeIndex(_)
            | Error::UnexpectedClass { .. }
            | Error::Config(_)
            | Error::Json(_) => ErrorKind::Format,
            Error::OutOfBounds { .. } => ErrorKind::Bounds,
            Error::Decode { source, .. } => source.kind(),
            Error::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Error::UnresolvedMember { .. } => ErrorKind::UnresolvedMember,
            Error::Conversion { .. } => ErrorKind::Conversion,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Prefix a node path segment onto a decode error
    pub(crate) fn at(self, segment: &str) -> Self {
        match self {
            Error::Cancelled => Error::Cancelled,
            Error::Decode { path, source } => Error::Decode {
                path: format!("{segment}.{path}"),
                source,
            },
            other => Error::Decode {
                path: segment.to_string(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
