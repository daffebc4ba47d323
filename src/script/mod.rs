//! Update-to-script translation.
//!
//! Turns a subset of the document-update algebra (`$set`, `$unset`,
//! `$addToSet`, `$setOnInsert`) into an equivalent server-side painless
//! script plus a bound parameter table. The update document is decoded once
//! at the boundary ([`UpdateDocument`]); the [`ScriptGenerator`] then
//! accumulates script fragments per operation and assembles them — behind a
//! null-guard prologue — at [`ScriptGenerator::build`].

mod generator;
mod update;

pub use generator::{PainlessScript, ScriptGenerator};
pub use update::UpdateDocument;
