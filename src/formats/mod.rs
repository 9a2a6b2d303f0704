//! Tabular and plain-text resource formats: `2DA`, `TLK`, `SSF`, `LTR`,
//! `LIP`, `LYT`. Unlike GFF these each have their own bespoke binary (or, for
//! LYT, textual) layout.

pub mod lip;
pub mod ltr;
pub mod lyt;
pub mod ssf;
pub mod tlk;
pub mod twoda;

pub use lip::Lip;
pub use ltr::Ltr;
pub use lyt::Lyt;
pub use ssf::Ssf;
pub use tlk::Tlk;
pub use twoda::TwoDa;
