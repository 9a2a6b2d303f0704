//! Archive codecs: `ERF/MOD/SAV/HAK`, `RIM`, and the `KEY`+`BIF`/`BZF`
//! catalog pair. Each exposes enumeration, get-by-key, and a writer that
//! takes an in-memory collection and produces the exact on-disk layout.

pub mod bif;
pub mod bzf;
pub mod erf;
pub mod key;
pub mod rim;

use kotor_common::resref::ResRef;

use crate::resource_type::ResourceType;

/// Where a [`FileResource`] physically lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Erf,
    Rim,
    Bif,
    Bzf,
}

/// One entry as enumerated from an archive: identity plus the byte range
/// within `source_path` (or, for BIF entries reached through a KEY, the BIF
/// the KEY points at) that holds its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FileResource {
    pub resref: ResRef,
    pub restype: ResourceType,
    pub offset: u32,
    pub size: u32,
    pub source_path: String,
    pub source_kind: SourceKind,
}
