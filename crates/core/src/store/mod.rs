pub mod memory_store;
pub mod patch;
pub mod store;

pub use memory_store::{
    ActionRecord, CycleRecord, GroupRecord, MemoryStore, SceneRecord, ShowRecord, StoreDocument,
};
pub use patch::{ActionPatch, CyclePatch, GroupPatch, PatchError, ScenePatch, ShowPatch};
pub use store::{HierarchyStore, StoreError};
