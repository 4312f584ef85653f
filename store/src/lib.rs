pub mod models;

mod error;
pub use error::StoreError;

mod kv;
pub use kv::KvStore;

mod memory;
pub use memory::MemoryStore;

#[cfg(not(target_arch = "wasm32"))]
mod file_store;
#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;

mod gateway;
pub use gateway::{Gateway, LocalGateway};

pub use models::{initials, Chore, Family, FamilyMember, Message, ShoppingItem, User};
