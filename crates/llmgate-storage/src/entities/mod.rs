pub mod user_keys;

pub use user_keys::Entity as UserKeys;
