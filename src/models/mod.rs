pub mod link;
pub mod profile;

pub use link::{Link, LinkChanges, LinkId, NewLink};
pub use profile::{Profile, PublicPage, Theme};
