//! Reference data: operations sites and material definitions.
//!
//! Pure domain logic (no IO); persistence lives in `maintops-infra`.

pub mod material;
pub mod site;

pub use material::{Material, MaterialCommand, MaterialDraft, MaterialEvent};
pub use site::{Site, SiteCommand, SiteDraft, SiteEvent};
