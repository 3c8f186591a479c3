//! Sea-ORM entities for the governance tables

pub mod metadata;
pub mod orchestrators;
pub mod proposals;
pub mod votes;

pub use metadata::Entity as Metadata;
pub use orchestrators::Entity as Orchestrators;
pub use proposals::Entity as Proposals;
pub use votes::Entity as Votes;
