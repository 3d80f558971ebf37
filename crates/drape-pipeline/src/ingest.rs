//! Input slots: validation and staging of the person and garment images.
//!
//! [`InputSlots`] holds at most one [`ImageInput`] per [`Role`]. A
//! submission is accepted only when its reported MIME type starts with
//! `image/`; anything else is dropped without touching the slots and
//! without an error, so callers cannot distinguish a rejected file from
//! one that was never chosen.
//!
//! Previews are produced elsewhere (they may be slow) and attached later
//! with [`InputSlots::attach_preview`]. A preview whose [`InputId`] no
//! longer matches the slot is stale and is discarded.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::preview::Preview;
use crate::types::{CandidateFile, ImageInput, InputId, Role, is_image_mime};

/// Notification emitted when a slot changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum IngestEvent {
    /// A valid file now occupies `role`.
    Accepted {
        /// The slot that was filled.
        role: Role,
        /// Identity of the new input.
        id: InputId,
        /// File name, for display.
        name: String,
    },
    /// The slot for `role` was cleared.
    Removed {
        /// The slot that was cleared.
        role: Role,
    },
    /// The preview for the current input in `role` is available.
    PreviewReady {
        /// The slot whose preview arrived.
        role: Role,
        /// The input the preview belongs to.
        id: InputId,
    },
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    /// The staged input now held by the slot.
    pub input: ImageInput,
    /// Notification for presentation layers.
    pub event: IngestEvent,
}

#[derive(Debug, Clone)]
struct Slot {
    input: ImageInput,
    preview: Option<Preview>,
}

/// The two role slots.
#[derive(Debug, Clone, Default)]
pub struct InputSlots {
    person: Option<Slot>,
    garment: Option<Slot>,
    next_id: u64,
}

impl InputSlots {
    /// Empty slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `file` and stage it as the input for `role`.
    ///
    /// Replaces any previous input (and its preview) for the role.
    /// Returns `None`, leaving every slot untouched, when the MIME type
    /// does not start with `image/`.
    pub fn submit(&mut self, role: Role, file: CandidateFile) -> Option<Accepted> {
        if !is_image_mime(&file.mime_type) {
            return None;
        }
        self.next_id += 1;
        let input = ImageInput {
            id: InputId(self.next_id),
            role,
            name: file.name,
            mime_type: file.mime_type,
            bytes: Arc::from(file.bytes),
        };
        let event = IngestEvent::Accepted {
            role,
            id: input.id,
            name: input.name.clone(),
        };
        *self.slot_mut(role) = Some(Slot {
            input: input.clone(),
            preview: None,
        });
        Some(Accepted { input, event })
    }

    /// Clear the input and preview for `role`.
    ///
    /// The other slot is unaffected. Returns `None` if the slot was
    /// already empty.
    pub fn remove(&mut self, role: Role) -> Option<IngestEvent> {
        self.slot_mut(role)
            .take()
            .map(|_| IngestEvent::Removed { role })
    }

    /// Attach a finished preview to the input it was produced for.
    ///
    /// Returns `None` and drops the preview when `id` is not the input
    /// currently in the slot (it was replaced or removed meanwhile).
    pub fn attach_preview(
        &mut self,
        role: Role,
        id: InputId,
        preview: Preview,
    ) -> Option<IngestEvent> {
        let slot = self.slot_mut(role).as_mut()?;
        if slot.input.id != id {
            return None;
        }
        slot.preview = Some(preview);
        Some(IngestEvent::PreviewReady { role, id })
    }

    /// The input currently staged for `role`.
    #[must_use]
    pub fn get(&self, role: Role) -> Option<&ImageInput> {
        self.slot(role).map(|slot| &slot.input)
    }

    /// The preview for `role`, once it has arrived.
    #[must_use]
    pub fn preview(&self, role: Role) -> Option<&Preview> {
        self.slot(role).and_then(|slot| slot.preview.as_ref())
    }

    /// Whether both roles are populated.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.person.is_some() && self.garment.is_some()
    }

    /// Clones of both inputs as `(person, garment)`, if both are staged.
    #[must_use]
    pub fn pair(&self) -> Option<(ImageInput, ImageInput)> {
        Some((
            self.get(Role::Person)?.clone(),
            self.get(Role::Garment)?.clone(),
        ))
    }

    const fn slot(&self, role: Role) -> Option<&Slot> {
        match role {
            Role::Person => self.person.as_ref(),
            Role::Garment => self.garment.as_ref(),
        }
    }

    const fn slot_mut(&mut self, role: Role) -> &mut Option<Slot> {
        match role {
            Role::Person => &mut self.person,
            Role::Garment => &mut self.garment,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn png_file(name: &str) -> CandidateFile {
        CandidateFile::new(name, "image/png", vec![1, 2, 3])
    }

    fn preview() -> Preview {
        Preview::encode("image/png", &[1, 2, 3])
    }

    #[test]
    fn accepts_image_mime_types() {
        let mut slots = InputSlots::new();
        let accepted = slots.submit(Role::Person, png_file("me.png")).unwrap();
        assert_eq!(accepted.input.role(), Role::Person);
        assert_eq!(accepted.input.mime_type(), "image/png");
        assert_eq!(accepted.input.byte_size(), 3);
        assert_eq!(
            accepted.event,
            IngestEvent::Accepted {
                role: Role::Person,
                id: accepted.input.id(),
                name: "me.png".into(),
            }
        );
        assert_eq!(slots.get(Role::Person), Some(&accepted.input));
        assert!(slots.get(Role::Garment).is_none());
        assert!(!slots.is_ready());
    }

    #[test]
    fn rejects_non_image_silently_and_keeps_existing_input() {
        let mut slots = InputSlots::new();
        let first = slots.submit(Role::Garment, png_file("saree.png")).unwrap();

        let rejected = slots.submit(
            Role::Garment,
            CandidateFile::new("notes.txt", "text/plain", b"hello".to_vec()),
        );
        assert!(rejected.is_none());
        assert_eq!(slots.get(Role::Garment), Some(&first.input));
    }

    #[test]
    fn rejection_into_empty_slot_leaves_it_empty() {
        let mut slots = InputSlots::new();
        let rejected = slots.submit(
            Role::Garment,
            CandidateFile::new("notes.txt", "text/plain", b"hello".to_vec()),
        );
        assert!(rejected.is_none());
        assert!(slots.get(Role::Garment).is_none());
    }

    #[test]
    fn later_submission_replaces_input_and_preview() {
        let mut slots = InputSlots::new();
        let first = slots.submit(Role::Person, png_file("a.png")).unwrap();
        slots
            .attach_preview(Role::Person, first.input.id(), preview())
            .unwrap();
        assert!(slots.preview(Role::Person).is_some());

        let second = slots
            .submit(Role::Person, CandidateFile::new("b.jpg", "image/jpeg", vec![9]))
            .unwrap();
        assert!(second.input.id() > first.input.id());
        assert_eq!(slots.get(Role::Person).unwrap().name(), "b.jpg");
        assert!(slots.preview(Role::Person).is_none());
    }

    #[test]
    fn stale_preview_is_discarded() {
        let mut slots = InputSlots::new();
        let first = slots.submit(Role::Person, png_file("a.png")).unwrap();
        let second = slots.submit(Role::Person, png_file("b.png")).unwrap();

        assert!(
            slots
                .attach_preview(Role::Person, first.input.id(), preview())
                .is_none()
        );
        assert!(slots.preview(Role::Person).is_none());

        let event = slots
            .attach_preview(Role::Person, second.input.id(), preview())
            .unwrap();
        assert_eq!(
            event,
            IngestEvent::PreviewReady {
                role: Role::Person,
                id: second.input.id(),
            }
        );
    }

    #[test]
    fn preview_after_remove_is_discarded() {
        let mut slots = InputSlots::new();
        let accepted = slots.submit(Role::Garment, png_file("g.png")).unwrap();
        slots.remove(Role::Garment).unwrap();
        assert!(
            slots
                .attach_preview(Role::Garment, accepted.input.id(), preview())
                .is_none()
        );
    }

    #[test]
    fn remove_only_affects_its_role() {
        let mut slots = InputSlots::new();
        slots.submit(Role::Person, png_file("p.png")).unwrap();
        slots.submit(Role::Garment, png_file("g.png")).unwrap();
        assert!(slots.is_ready());

        assert_eq!(
            slots.remove(Role::Garment),
            Some(IngestEvent::Removed {
                role: Role::Garment
            })
        );
        assert!(slots.get(Role::Person).is_some());
        assert!(slots.get(Role::Garment).is_none());
        assert!(!slots.is_ready());
        assert_eq!(slots.remove(Role::Garment), None);
    }

    #[test]
    fn pair_requires_both_roles() {
        let mut slots = InputSlots::new();
        assert!(slots.pair().is_none());
        slots.submit(Role::Garment, png_file("g.png")).unwrap();
        assert!(slots.pair().is_none());
        slots.submit(Role::Person, png_file("p.png")).unwrap();
        let (person, garment) = slots.pair().unwrap();
        assert_eq!(person.role(), Role::Person);
        assert_eq!(garment.role(), Role::Garment);
    }
}
