#![allow(clippy::uninlined_format_args)]

pub mod archive;
pub mod dispatch;
pub mod formats;
pub mod gff;
pub mod identifier;
pub mod installation;
pub mod macros;
pub mod model;
pub mod module;
pub mod resource_type;
pub mod script;
pub mod texture;
pub mod walkmesh;

pub use identifier::ResourceIdentifier;
pub use resource_type::ResourceType;
