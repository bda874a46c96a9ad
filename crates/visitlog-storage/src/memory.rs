use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;

use crate::SlotStorage;

/// In-process slot storage. Contents live as long as the value does.
#[derive(Debug, Default)]
pub struct MemorySlot {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot with raw contents, bypassing any encoding.
    pub fn with_value(key: &str, value: &str) -> Self {
        let slot = Self::new();
        if let Ok(mut slots) = slot.slots.lock() {
            slots.insert(key.to_string(), value.to_string());
        }
        slot
    }
}

impl SlotStorage for MemorySlot {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| anyhow!("memory slot lock poisoned"))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| anyhow!("memory slot lock poisoned"))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| anyhow!("memory slot lock poisoned"))?;
        slots.remove(key);
        Ok(())
    }
}
