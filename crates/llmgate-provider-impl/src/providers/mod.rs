pub mod custom;
pub mod first_party;

pub use custom::CustomInitializer;
pub use first_party::{FirstPartyInitializer, FirstPartySpec};
