//! In-memory [`SessionStorage`] holding snapshots as JSON text, the way a
//! browser key-value store would.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::SessionStorage;
use crate::journey::SessionSnapshot;

/// Text-backed session store. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Raw stored text for a slot.
    #[must_use]
    pub fn raw(&self, slot: &str) -> Option<String> {
        self.slots.borrow().get(slot).cloned()
    }

    /// Overwrite a slot with arbitrary text, as another writer might.
    pub fn put_raw(&self, slot: &str, text: String) {
        self.slots.borrow_mut().insert(slot.to_string(), text);
    }
}

impl SessionStorage for MemoryStorage {
    type Error = serde_json::Error;

    fn save_session(&self, slot: &str, snapshot: &SessionSnapshot) -> Result<(), Self::Error> {
        let text = snapshot.to_json()?;
        self.slots.borrow_mut().insert(slot.to_string(), text);
        Ok(())
    }

    fn load_session(&self, slot: &str) -> Result<Option<SessionSnapshot>, Self::Error> {
        self.slots
            .borrow()
            .get(slot)
            .map(|text| SessionSnapshot::from_json(text))
            .transpose()
    }

    fn delete_session(&self, slot: &str) -> Result<(), Self::Error> {
        self.slots.borrow_mut().remove(slot);
        Ok(())
    }
}
