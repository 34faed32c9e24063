//! v1 API Data Transfer Objects.
//!
//! Wire format for the v1 REST API, kept separate from the domain models in
//! `src/models/`. Field names are camelCase on the wire.

pub mod books;
pub mod providers;
pub mod recognition;
pub mod uploads;

pub use books::*;
pub use providers::*;
pub use recognition::*;
pub use uploads::*;
