//! Domain types.

mod env;
mod index;
mod profile;

pub use env::{shell_quote, Env};
pub use index::{profile_blob_name, Encryption, Index, IndexEntry};
pub use profile::{Output, OutputKind, Profile, ProfileData, ProfileMap};
