//! Installation (C12): composes `KEY`+`BIF`, the override folder, module
//! and lips capsules, texture packs, and streaming folders into one
//! priority-ordered resource index.
//!
//! Building the index never decodes payload bytes beyond what's needed to
//! learn each resource's identity, offset, and size; [`Installation::resource`]
//! re-reads the backing file on demand.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use kotor_common::error::Error;
use kotor_common::resref::ResRef;
use walkdir::WalkDir;

use crate::archive::bif::Bif;
use crate::archive::erf::Erf;
use crate::archive::key::Key;
use crate::archive::rim::Rim;
use crate::identifier::ResourceIdentifier;
use crate::resource_type::ResourceType;

/// A resource search category, each backed by a different part of an
/// installation on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchLocation {
    Override,
    Modules,
    Lips,
    Chitin,
    TexturesTpa,
    TexturesTpb,
    TexturesTpc,
    Voice,
    Sound,
    Music,
}

/// `OVERRIDE > MODULES > CHITIN > ...`: loose assets win over packaged
/// ones, and modules win over the base game archive.
pub const DEFAULT_SEARCH_ORDER: &[SearchLocation] = &[
    SearchLocation::Override,
    SearchLocation::Modules,
    SearchLocation::Chitin,
    SearchLocation::Lips,
    SearchLocation::TexturesTpa,
    SearchLocation::TexturesTpb,
    SearchLocation::TexturesTpc,
    SearchLocation::Voice,
    SearchLocation::Sound,
    SearchLocation::Music,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    File,
    Erf,
    Rim,
    Bif,
}

/// Where a resource lives, without its bytes. For `File`/`Erf`/`Rim`
/// sources, `offset`/`size` is the byte range within `source_path`. For
/// `Bif` sources, `source_path` is the `.bif` file and `offset` holds the
/// in-`BIF` resource index (not a byte offset), since a `BIF` is only ever
/// addressed indirectly through its `KEY`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLocation {
    pub source_path: String,
    pub offset: u32,
    pub size: u32,
    pub container_kind: ContainerKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResource {
    pub data: Vec<u8>,
    pub source_path: String,
    pub offset: u32,
    pub size: u32,
}

#[derive(Default)]
struct CategoryIndex {
    entries: HashMap<ResourceIdentifier, ResourceLocation>,
}

impl CategoryIndex {
    /// At-most-one-definition-per-source: the first registration for an
    /// identifier within a category wins; later ones within the same
    /// category are dropped rather than overwriting it.
    fn insert(&mut self, identifier: ResourceIdentifier, location: ResourceLocation) {
        self.entries.entry(identifier).or_insert(location);
    }
}

pub struct Installation {
    root: PathBuf,
    key: Option<Key>,
    categories: HashMap<SearchLocation, CategoryIndex>,
}

impl Installation {
    pub fn load(root: impl AsRef<Path>) -> Result<Self, Error> {
        let mut installation = Self { root: root.as_ref().to_path_buf(), key: None, categories: HashMap::new() };

        installation.index_chitin()?;
        installation.index_flat_dir("override", SearchLocation::Override)?;
        installation.index_capsules("modules", SearchLocation::Modules)?;
        installation.index_capsules("lips", SearchLocation::Lips)?;
        installation.index_texture_pack("texturepacks/swpc_tex_tpa.erf", SearchLocation::TexturesTpa)?;
        installation.index_texture_pack("texturepacks/swpc_tex_tpb.erf", SearchLocation::TexturesTpb)?;
        installation.index_texture_pack("texturepacks/swpc_tex_tpc.erf", SearchLocation::TexturesTpc)?;
        installation.index_streaming_dir("streamvoice", SearchLocation::Voice)?;
        installation.index_streaming_dir("streamsounds", SearchLocation::Sound)?;
        installation.index_streaming_dir("streammusic", SearchLocation::Music)?;

        Ok(installation)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find_case_insensitive(dir: &Path, name: &str) -> Option<PathBuf> {
        fs::read_dir(dir)
            .ok()?
            .flatten()
            .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(name))
            .map(|entry| entry.path())
    }

    fn index_chitin(&mut self) -> Result<(), Error> {
        let Some(key_path) = Self::find_case_insensitive(&self.root, "chitin.key") else {
            return Ok(());
        };
        let key = Key::read(&fs::read(&key_path)?)?;

        // A resource's size is only known by fully parsing its BIF, so each
        // referenced BIF is parsed once up front purely to learn sizes;
        // `Installation::resource` re-parses it later to fetch bytes.
        let mut sizes: HashMap<(u32, u32), u32> = HashMap::new();
        for (bif_index, descriptor) in key.bifs.iter().enumerate() {
            let bif_path = self.root.join(descriptor.filename.replace('\\', "/"));
            let Ok(bytes) = fs::read(&bif_path) else { continue };
            let Ok(bif) = Bif::read(&bytes) else { continue };
            for (in_bif_index, resource) in bif.resources.iter().enumerate() {
                sizes.insert((bif_index as u32, in_bif_index as u32), resource.data.len() as u32);
            }
        }

        let category = self.categories.entry(SearchLocation::Chitin).or_default();
        for entry in &key.entries {
            let Some(descriptor) = key.bifs.get(entry.bif_index as usize) else { continue };
            let source_path = self.root.join(descriptor.filename.replace('\\', "/")).to_string_lossy().to_string();
            let size = sizes.get(&(entry.bif_index, entry.in_bif_index)).copied().unwrap_or(0);
            let identifier = ResourceIdentifier::new(entry.resref.clone(), entry.restype);
            category.insert(
                identifier,
                ResourceLocation { source_path, offset: entry.in_bif_index, size, container_kind: ContainerKind::Bif },
            );
        }

        self.key = Some(key);
        Ok(())
    }

    fn index_flat_dir(&mut self, name: &str, location: SearchLocation) -> Result<(), Error> {
        let Some(dir) = Self::find_case_insensitive(&self.root, name) else { return Ok(()) };
        let Ok(entries) = fs::read_dir(&dir) else { return Ok(()) };

        let category = self.categories.entry(location).or_default();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            let identifier = ResourceIdentifier::from_path(file_name);
            if identifier.restype == ResourceType::Invalid {
                continue;
            }
            let size = entry.metadata().map(|m| m.len() as u32).unwrap_or(0);
            category.insert(
                identifier,
                ResourceLocation { source_path: path.to_string_lossy().to_string(), offset: 0, size, container_kind: ContainerKind::File },
            );
        }
        Ok(())
    }

    fn index_capsules(&mut self, dir_name: &str, location: SearchLocation) -> Result<(), Error> {
        let Some(dir) = Self::find_case_insensitive(&self.root, dir_name) else { return Ok(()) };
        let Ok(entries) = fs::read_dir(&dir) else { return Ok(()) };

        let category = self.categories.entry(location).or_default();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
            let Ok(bytes) = fs::read(&path) else { continue };
            let source_path = path.to_string_lossy().to_string();

            let (file_entries, container_kind) = match extension.as_str() {
                "rim" => (Rim::read(&bytes).ok().map(|r| r.entries(&source_path)), ContainerKind::Rim),
                "mod" | "erf" | "sav" | "hak" => (Erf::read(&bytes).ok().map(|e| e.entries(&source_path)), ContainerKind::Erf),
                _ => (None, ContainerKind::File),
            };
            let Some(file_entries) = file_entries else { continue };
            for file_resource in file_entries {
                let identifier = ResourceIdentifier::new(file_resource.resref, file_resource.restype);
                category.insert(
                    identifier,
                    ResourceLocation { source_path: source_path.clone(), offset: file_resource.offset, size: file_resource.size, container_kind },
                );
            }
        }
        Ok(())
    }

    fn index_texture_pack(&mut self, relative_path: &str, location: SearchLocation) -> Result<(), Error> {
        let path = self.root.join(relative_path.replace('/', std::path::MAIN_SEPARATOR_STR));
        let Ok(bytes) = fs::read(&path) else { return Ok(()) };
        let Ok(erf) = Erf::read(&bytes) else { return Ok(()) };
        let source_path = path.to_string_lossy().to_string();

        let category = self.categories.entry(location).or_default();
        for file_resource in erf.entries(&source_path) {
            let identifier = ResourceIdentifier::new(file_resource.resref, file_resource.restype);
            category.insert(
                identifier,
                ResourceLocation { source_path: source_path.clone(), offset: file_resource.offset, size: file_resource.size, container_kind: ContainerKind::Erf },
            );
        }
        Ok(())
    }

    /// Streaming folders nest resources under subdirectories (by the
    /// engine's own first-letters-of-resref convention), so unlike
    /// `override`/`modules`/`lips` this walks recursively.
    fn index_streaming_dir(&mut self, name: &str, location: SearchLocation) -> Result<(), Error> {
        let Some(dir) = Self::find_case_insensitive(&self.root, name) else { return Ok(()) };

        let category = self.categories.entry(location).or_default();
        for entry in WalkDir::new(&dir).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.path().file_name().and_then(|n| n.to_str()) else { continue };
            let identifier = ResourceIdentifier::from_path(file_name);
            if identifier.restype == ResourceType::Invalid {
                continue;
            }
            let size = entry.metadata().map(|m| m.len() as u32).unwrap_or(0);
            category.insert(
                identifier,
                ResourceLocation { source_path: entry.path().to_string_lossy().to_string(), offset: 0, size, container_kind: ContainerKind::File },
            );
        }
        Ok(())
    }

    /// Consults each category in `order`, returning the first hit together
    /// with its decoded bytes.
    pub fn resource(&self, resname: &str, restype: ResourceType, order: &[SearchLocation]) -> Result<ResolvedResource, Error> {
        let identifier = ResourceIdentifier::new(ResRef::try_from(resname)?, restype);
        for location in order {
            let Some(category) = self.categories.get(location) else { continue };
            let Some(found) = category.entries.get(&identifier) else { continue };
            let data = self.fetch(found)?;
            return Ok(ResolvedResource { data, source_path: found.source_path.clone(), offset: found.offset, size: found.size });
        }
        Err(Error::NotFound)
    }

    /// Returns every hit for `identifier` across `order`, for conflict
    /// diffing; unlike [`Installation::resource`] this does not stop at
    /// the first match.
    pub fn locations(&self, identifier: &ResourceIdentifier, order: &[SearchLocation]) -> Vec<ResourceLocation> {
        order
            .iter()
            .filter_map(|location| self.categories.get(location))
            .filter_map(|category| category.entries.get(identifier))
            .cloned()
            .collect()
    }

    /// Batches [`Installation::resource`] over many names sharing one type.
    pub fn resources(&self, resnames: &[&str], restype: ResourceType, order: &[SearchLocation]) -> Vec<Result<ResolvedResource, Error>> {
        resnames.iter().map(|name| self.resource(name, restype, order)).collect()
    }

    fn fetch(&self, location: &ResourceLocation) -> Result<Vec<u8>, Error> {
        match location.container_kind {
            ContainerKind::File => Ok(fs::read(&location.source_path)?),
            ContainerKind::Rim | ContainerKind::Erf => {
                let bytes = fs::read(&location.source_path)?;
                let start = location.offset as usize;
                let end = start + location.size as usize;
                bytes.get(start..end).map(<[u8]>::to_vec).ok_or(Error::EndOfStream)
            }
            ContainerKind::Bif => {
                let bytes = fs::read(&location.source_path)?;
                let bif = Bif::read(&bytes)?;
                bif.get(location.offset).map(<[u8]>::to_vec).ok_or(Error::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::bif::BifResource;
    use crate::archive::erf::ErfKind;
    use crate::archive::key::{BifDescriptor, KeyEntry};
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kotor-core-test-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_override_resource_resolves_before_chitin() {
        let root = temp_dir("install-override");
        let override_dir = root.join("override");
        fs::create_dir_all(&override_dir).unwrap();
        fs::write(override_dir.join("appearance.2da"), b"override-bytes").unwrap();

        let installation = Installation::load(&root).unwrap();
        let resolved = installation.resource("appearance", ResourceType::TwoDa, DEFAULT_SEARCH_ORDER).unwrap();
        assert_eq!(resolved.data, b"override-bytes");

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_resource_is_not_found() {
        let root = temp_dir("install-empty");
        let installation = Installation::load(&root).unwrap();
        let result = installation.resource("nope", ResourceType::Utc, DEFAULT_SEARCH_ORDER);
        assert!(matches!(result, Err(Error::NotFound)));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_chitin_only_order_resolves_to_chitin_copy_even_with_override_present() {
        let root = temp_dir("install-chitin-only");
        let override_dir = root.join("override");
        fs::create_dir_all(&override_dir).unwrap();
        fs::write(override_dir.join("appearance.2da"), b"override-bytes").unwrap();

        let mut bif = Bif::new();
        bif.resources.push(BifResource { id: 0, data: b"chitin-bytes".to_vec(), resource_type: ResourceType::TwoDa.type_id() });
        fs::write(root.join("data.bif"), bif.write()).unwrap();

        let mut key = Key::new();
        key.bifs.push(BifDescriptor { filename: "data.bif".to_string(), file_size: 0, drives: 0 });
        key.entries.push(KeyEntry {
            resref: ResRef::try_from("appearance").unwrap(),
            restype: ResourceType::TwoDa,
            bif_index: 0,
            in_bif_index: 0,
        });
        fs::write(root.join("chitin.key"), key.write()).unwrap();

        let installation = Installation::load(&root).unwrap();
        let resolved = installation.resource("appearance", ResourceType::TwoDa, &[SearchLocation::Chitin]).unwrap();
        assert_eq!(resolved.data, b"chitin-bytes");

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_modules_capsule_is_indexed() {
        let root = temp_dir("install-modules");
        let modules_dir = root.join("modules");
        fs::create_dir_all(&modules_dir).unwrap();

        let mut erf = Erf::new(ErfKind::Mod);
        erf.push(ResRef::try_from("danm13").unwrap(), ResourceType::Ifo, b"ifo-bytes".to_vec()).unwrap();
        fs::write(modules_dir.join("danm13.mod"), erf.write()).unwrap();

        let installation = Installation::load(&root).unwrap();
        let resolved = installation.resource("danm13", ResourceType::Ifo, DEFAULT_SEARCH_ORDER).unwrap();
        assert_eq!(resolved.data, b"ifo-bytes");

        fs::remove_dir_all(&root).unwrap();
    }
}
