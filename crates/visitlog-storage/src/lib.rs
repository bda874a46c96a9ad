pub mod file;
pub mod memory;

pub use file::FileSlot;
pub use memory::MemorySlot;

/// Key-value slot storage used to persist the visit collection.
///
/// The store never touches a concrete backend directly: the dashboard binary
/// injects a [`FileSlot`] rooted at the data directory, tests inject a
/// [`MemorySlot`]. Values are opaque strings; callers own the encoding.
pub trait SlotStorage: Send + Sync + 'static {
    /// Return the value stored under `key`, or `Ok(None)` when the slot is
    /// absent.
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Remove the slot. Removing an absent slot is not an error.
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}
