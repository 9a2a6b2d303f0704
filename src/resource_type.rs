//! The closed set of resource types the Aurora engine understands.
//!
//! Every variant carries a wire-level numeric id (used inside KEY/BIF/ERF/RIM
//! record keys), a lowercase file extension, a [`Category`] and a
//! [`Contents`] hint used by callers deciding how to further decode a blob.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Unknown,
    Texture,
    Model,
    Walkmesh,
    Audio,
    Gui,
    Script,
    Talk,
    Archive,
    Table,
    Misc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Contents {
    Binary,
    Text,
    Source,
    Gff,
    Plaintext,
}

struct ResourceTypeInfo {
    id: u16,
    extension: &'static str,
    category: Category,
    contents: Contents,
}

macro_rules! resource_types {
    ($($variant:ident = $id:expr, $ext:expr, $category:expr, $contents:expr;)*) => {
        /// A resource type known to the engine, or [`ResourceType::Invalid`]
        /// for anything not in the closed table.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ResourceType {
            $($variant,)*
            Invalid,
        }

        impl ResourceType {
            const TABLE: &'static [(ResourceType, ResourceTypeInfo)] = &[
                $((ResourceType::$variant, ResourceTypeInfo { id: $id, extension: $ext, category: $category, contents: $contents }),)*
            ];
        }
    };
}

resource_types! {
    Bmp = 1, "bmp", Category::Texture, Contents::Binary;
    Mve = 2, "mve", Category::Misc, Contents::Binary;
    Tga = 3, "tga", Category::Texture, Contents::Binary;
    Wav = 4, "wav", Category::Audio, Contents::Binary;
    Plt = 6, "plt", Category::Texture, Contents::Binary;
    Ini = 7, "ini", Category::Misc, Contents::Plaintext;
    Txt = 10, "txt", Category::Misc, Contents::Plaintext;
    Mdl = 2002, "mdl", Category::Model, Contents::Binary;
    Nss = 2009, "nss", Category::Script, Contents::Source;
    Ncs = 2010, "ncs", Category::Script, Contents::Binary;
    Mod = 2011, "mod", Category::Archive, Contents::Binary;
    Are = 2012, "are", Category::Misc, Contents::Gff;
    Ifo = 2014, "ifo", Category::Misc, Contents::Gff;
    Wok = 2016, "wok", Category::Walkmesh, Contents::Binary;
    TwoDa = 2017, "2da", Category::Table, Contents::Binary;
    Tlk = 2018, "tlk", Category::Talk, Contents::Binary;
    Txi = 2022, "txi", Category::Texture, Contents::Plaintext;
    Git = 2023, "git", Category::Misc, Contents::Gff;
    Uti = 2025, "uti", Category::Misc, Contents::Gff;
    Utc = 2027, "utc", Category::Misc, Contents::Gff;
    Dlg = 2029, "dlg", Category::Misc, Contents::Gff;
    Utt = 2032, "utt", Category::Misc, Contents::Gff;
    Ute = 2035, "ute", Category::Misc, Contents::Gff;
    Utd = 2037, "utd", Category::Misc, Contents::Gff;
    Utp = 2039, "utp", Category::Misc, Contents::Gff;
    Fac = 2041, "fac", Category::Misc, Contents::Gff;
    Utm = 2043, "utm", Category::Misc, Contents::Gff;
    Dwk = 2044, "dwk", Category::Walkmesh, Contents::Binary;
    Pwk = 2045, "pwk", Category::Walkmesh, Contents::Binary;
    Jrl = 2056, "jrl", Category::Misc, Contents::Gff;
    Sav = 2057, "sav", Category::Archive, Contents::Binary;
    Utw = 2058, "utw", Category::Misc, Contents::Gff;
    Ssf = 2060, "ssf", Category::Talk, Contents::Binary;
    Hak = 2061, "hak", Category::Archive, Contents::Binary;
    Nwm = 2062, "nwm", Category::Archive, Contents::Binary;
    Gui = 2063, "gui", Category::Gui, Contents::Gff;
    Ltr = 3002, "ltr", Category::Talk, Contents::Binary;
    Lyt = 3000, "lyt", Category::Misc, Contents::Plaintext;
    Vis = 3001, "vis", Category::Misc, Contents::Plaintext;
    Lip = 4008, "lip", Category::Audio, Contents::Binary;
    Mdx = 3006, "mdx", Category::Model, Contents::Binary;
    Tpc = 3007, "tpc", Category::Texture, Contents::Binary;
    Dds = 3008, "dds", Category::Texture, Contents::Binary;
    Key = 9996, "key", Category::Archive, Contents::Binary;
    Bif = 9997, "bif", Category::Archive, Contents::Binary;
    Erf = 9998, "erf", Category::Archive, Contents::Binary;
    Rim = 9999, "rim", Category::Archive, Contents::Binary;
}

pub const INVALID_ID: u16 = 0xffff;

impl ResourceType {
    fn info(self) -> Option<&'static ResourceTypeInfo> {
        Self::TABLE
            .iter()
            .find(|(variant, _)| *variant == self)
            .map(|(_, info)| info)
    }

    /// Looks up a type by its (case-insensitive) file extension.
    pub fn from_extension(extension: &str) -> Self {
        let lower = extension.to_ascii_lowercase();
        Self::TABLE
            .iter()
            .find(|(_, info)| info.extension == lower)
            .map(|(variant, _)| *variant)
            .unwrap_or(ResourceType::Invalid)
    }

    /// Looks up a type by its wire-level numeric id.
    pub fn from_id(id: u16) -> Self {
        Self::TABLE
            .iter()
            .find(|(_, info)| info.id == id)
            .map(|(variant, _)| *variant)
            .unwrap_or(ResourceType::Invalid)
    }

    /// Every known variant, in table order; used by callers that need to
    /// search across the whole closed set (format sniffing, UI pickers).
    pub fn all() -> impl Iterator<Item = ResourceType> {
        Self::TABLE.iter().map(|(variant, _)| *variant)
    }

    pub fn extension(self) -> &'static str {
        self.info().map(|info| info.extension).unwrap_or("")
    }

    pub fn type_id(self) -> u16 {
        self.info().map(|info| info.id).unwrap_or(INVALID_ID)
    }

    pub fn category(self) -> Category {
        self.info().map(|info| info.category).unwrap_or(Category::Unknown)
    }

    pub fn contents(self) -> Contents {
        self.info().map(|info| info.contents).unwrap_or(Contents::Binary)
    }

    pub fn is_valid(self) -> bool {
        !matches!(self, ResourceType::Invalid)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl PartialEq<str> for ResourceType {
    fn eq(&self, other: &str) -> bool {
        self.extension().eq_ignore_ascii_case(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension_is_case_insensitive() {
        assert_eq!(ResourceType::from_extension("UTC"), ResourceType::Utc);
        assert_eq!(ResourceType::from_extension("utc"), ResourceType::Utc);
    }

    #[test]
    fn test_from_extension_unknown_is_invalid() {
        assert_eq!(ResourceType::from_extension("zzz"), ResourceType::Invalid);
    }

    #[test]
    fn test_from_id_round_trips_type_id() {
        assert_eq!(ResourceType::from_id(2018), ResourceType::Tlk);
        assert_eq!(ResourceType::Tlk.type_id(), 2018);
    }

    #[test]
    fn test_invalid_id_is_sentinel() {
        assert_eq!(ResourceType::from_id(0xffff), ResourceType::Invalid);
        assert_eq!(ResourceType::Invalid.type_id(), INVALID_ID);
    }

    #[test]
    fn test_string_equality_case_insensitive() {
        assert_eq!(ResourceType::Mdl, "MDL");
    }

    #[test]
    fn test_category_and_contents() {
        assert_eq!(ResourceType::Utc.category(), Category::Misc);
        assert_eq!(ResourceType::Utc.contents(), Contents::Gff);
        assert_eq!(ResourceType::TwoDa.category(), Category::Table);
    }
}
