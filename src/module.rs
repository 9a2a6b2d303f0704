//! Module loader (C13): combines a module's `.rim`/`.mod`/`_dlg.erf`
//! fragments into one resource view with typed GFF accessors. Read-only;
//! mutation goes through the archive writers directly.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use kotor_common::error::Error;
use kotor_common::resref::ResRef;

use crate::archive::erf::Erf;
use crate::archive::rim::Rim;
use crate::gff;
use crate::gff::GffStruct;
use crate::identifier::ResourceIdentifier;
use crate::resource_type::ResourceType;

const FRAGMENT_SUFFIXES: [&str; 4] = [".rim", "_s.rim", ".mod", "_dlg.erf"];

struct Fragment {
    resources: HashMap<ResourceIdentifier, Vec<u8>>,
}

/// A module root (e.g. `danm13`) assembled from whichever of its fragment
/// files are present. Later fragments in [`FRAGMENT_SUFFIXES`] order take
/// priority for any identifier more than one fragment defines, mirroring
/// how `_s.rim` and `.mod` layer on top of a module's base `.rim`.
pub struct Module {
    root_name: String,
    fragments: Vec<Fragment>,
}

impl Module {
    pub fn load(modules_dir: impl AsRef<Path>, root_name: &str) -> Result<Self, Error> {
        let modules_dir = modules_dir.as_ref();
        let mut fragments = Vec::new();

        for suffix in FRAGMENT_SUFFIXES {
            let path = modules_dir.join(format!("{root_name}{suffix}"));
            let Ok(bytes) = fs::read(&path) else { continue };
            let resources = if suffix.ends_with(".rim") {
                Rim::read(&bytes)?
                    .resources
                    .into_iter()
                    .map(|r| (ResourceIdentifier::new(r.resref, r.restype), r.data))
                    .collect()
            } else {
                Erf::read(&bytes)?
                    .resources
                    .into_iter()
                    .map(|r| (ResourceIdentifier::new(r.resref, r.restype), r.data))
                    .collect()
            };
            fragments.push(Fragment { resources });
        }

        if fragments.is_empty() {
            return Err(Error::NotFound);
        }

        Ok(Self { root_name: root_name.to_string(), fragments })
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Raw bytes for `(resname, restype)`, consulting fragments in load
    /// order with later ones taking priority.
    pub fn get(&self, resname: &str, restype: ResourceType) -> Option<&[u8]> {
        let identifier = ResourceIdentifier::new(ResRef::from_reader_bytes(resname), restype);
        self.fragments.iter().rev().find_map(|fragment| fragment.resources.get(&identifier)).map(Vec::as_slice)
    }

    fn gff(&self, resname: &str, restype: ResourceType, expected_type: &str) -> Result<GffStruct, Error> {
        let data = self.get(resname, restype).ok_or(Error::NotFound)?;
        let (root, _) = gff::read(data, Some(expected_type))?;
        Ok(root)
    }

    /// The module's `IFO`: entry area, start position, event scripts, ...
    pub fn ifo(&self) -> Result<GffStruct, Error> {
        self.gff(&self.root_name, ResourceType::Ifo, "IFO ")
    }

    /// `ARE`: an area's static layout (visual style, map notes, wind, ...).
    pub fn are(&self, area_name: &str) -> Result<GffStruct, Error> {
        self.gff(area_name, ResourceType::Are, "ARE ")
    }

    /// `GIT`: an area's dynamic instance list (placed creatures, triggers,
    /// waypoints, cameras).
    pub fn git(&self, area_name: &str) -> Result<GffStruct, Error> {
        self.gff(area_name, ResourceType::Git, "GIT ")
    }

    /// `DLG`: a conversation tree.
    pub fn dlg(&self, dlg_name: &str) -> Result<GffStruct, Error> {
        self.gff(dlg_name, ResourceType::Dlg, "DLG ")
    }

    /// Any `UT*` blueprint (`UTC`, `UTD`, `UTP`, `UTI`, ...); the expected
    /// GFF file-type magic is derived from `restype`'s own extension.
    pub fn blueprint(&self, resname: &str, restype: ResourceType) -> Result<GffStruct, Error> {
        let expected = format!("{:<4}", restype.extension().to_ascii_uppercase());
        self.gff(resname, restype, &expected)
    }

    /// `LYT`: the module's room layout. Textual, not GFF.
    pub fn lyt(&self, resname: &str) -> Result<crate::formats::Lyt, Error> {
        let data = self.get(resname, ResourceType::Lyt).ok_or(Error::NotFound)?;
        let text = std::str::from_utf8(data).map_err(|e| Error::EncodingError(e.to_string()))?;
        crate::formats::Lyt::read(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::erf::ErfKind;
    use crate::gff::{GffFieldValue, GffStruct as Struct};
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kotor-core-test-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_loads_rim_and_mod_fragments_with_mod_taking_priority() {
        let dir = temp_dir("module-fragments");

        let mut rim = Rim::new();
        let mut ifo = Struct::new(0xffff_ffff);
        ifo.set("Mod_Name", GffFieldValue::UInt8(1));
        rim.push(ResRef::try_from("danm13").unwrap(), ResourceType::Ifo, gff::write(&ifo, "IFO ").unwrap()).unwrap();
        fs::write(dir.join("danm13.rim"), rim.write()).unwrap();

        let mut module_erf = Erf::new(ErfKind::Mod);
        let mut overridden_ifo = Struct::new(0xffff_ffff);
        overridden_ifo.set("Mod_Name", GffFieldValue::UInt8(2));
        module_erf.push(ResRef::try_from("danm13").unwrap(), ResourceType::Ifo, gff::write(&overridden_ifo, "IFO ").unwrap()).unwrap();
        fs::write(dir.join("danm13.mod"), module_erf.write()).unwrap();

        let module = Module::load(&dir, "danm13").unwrap();
        let ifo = module.ifo().unwrap();
        assert_eq!(ifo.get("Mod_Name"), Some(&GffFieldValue::UInt8(2)));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_module_is_not_found() {
        let dir = temp_dir("module-missing");
        assert!(matches!(Module::load(&dir, "nope"), Err(Error::NotFound)));
        fs::remove_dir_all(&dir).unwrap();
    }
}
