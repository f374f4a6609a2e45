//! Database query functions organized by domain.

pub mod artists;
pub mod drafts;
pub mod settings;
