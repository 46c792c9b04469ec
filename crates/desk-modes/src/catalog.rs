//! Built-in interaction modes.
//!
//! The catalog registers the panels a Draftdesk client shows in its shared
//! interaction region, each with its own isolated state type.

use serde::{Deserialize, Serialize};

use desk_persistence::{DraftId, PersistenceError, Snapshot};

use crate::registry::{Affordance, ModeDescriptor, ModeRegistry};

/// Mode names used by the built-in catalog.
pub mod names {
    pub const COMMENT: &str = "comment";
    pub const CURATION: &str = "curation";
    pub const EXPLORE: &str = "explore";
    pub const CREATE_ITEM: &str = "create-item";
    pub const ZAP: &str = "zap";
    pub const ZAP_PROMPT: &str = "zap-prompt";
}

/// Editable state of the comment composer.
///
/// `draft_id` is assigned by the checkpoint store after the first successful
/// save and is not part of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposerDraft {
    #[serde(skip)]
    pub draft_id: Option<DraftId>,
    pub body: String,
    /// Event the comment replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,
}

impl ComposerDraft {
    /// Encode the editable content for checkpointing.
    pub fn snapshot(&self) -> Result<Snapshot, PersistenceError> {
        Snapshot::encode(self)
    }

    /// Rebuild a draft from a stored snapshot.
    pub fn restore(draft_id: DraftId, snapshot: &Snapshot) -> Result<Self, PersistenceError> {
        let mut draft: Self = snapshot.decode()?;
        draft.draft_id = Some(draft_id);
        Ok(draft)
    }

    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }

    pub fn mention(&mut self, who: impl Into<String>) {
        let who = who.into();
        if !self.mentions.contains(&who) {
            self.mentions.push(who);
        }
    }
}

/// Items picked for a curated list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurationState {
    pub query: String,
    selected: Vec<String>,
}

impl CurationState {
    /// Toggle an item. Returns `true` if it is now selected.
    pub fn toggle(&mut self, item: impl Into<String>) -> bool {
        let item = item.into();
        match self.selected.iter().position(|s| *s == item) {
            Some(index) => {
                self.selected.remove(index);
                false
            }
            None => {
                self.selected.push(item);
                true
            }
        }
    }

    pub fn is_selected(&self, item: &str) -> bool {
        self.selected.iter().any(|s| s == item)
    }

    /// Selected items in selection order.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExploreState {
    query: String,
    pub tags: Vec<String>,
    /// Pagination cursor of the current result set.
    pub cursor: Option<String>,
}

impl ExploreState {
    /// Change the query. A new query starts from the first page.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.cursor = None;
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateItemState {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
}

impl CreateItemState {
    pub fn is_ready(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZapState {
    pub recipient: Option<String>,
    pub amount_sats: u64,
    pub comment: String,
}

impl ZapState {
    pub fn is_ready(&self) -> bool {
        self.recipient.is_some() && self.amount_sats > 0
    }
}

/// Quick-pick amounts shown before a zap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapPromptState {
    pub suggested_sats: Vec<u64>,
    pub dismissed: bool,
}

impl Default for ZapPromptState {
    fn default() -> Self {
        Self {
            suggested_sats: vec![21, 100, 1000],
            dismissed: false,
        }
    }
}

fn affordance(mode: &str, part: &str) -> Affordance {
    Affordance::new(format!("{mode}.{part}"))
}

/// Build a registry with every built-in mode, in display order.
///
/// Each call returns an independent registry with no active mode.
pub fn default_registry() -> ModeRegistry {
    let registry = ModeRegistry::new();
    for descriptor in builtin_modes() {
        registry.register(descriptor);
    }
    registry
}

fn builtin_modes() -> Vec<ModeDescriptor> {
    use names::{COMMENT, CREATE_ITEM, CURATION, EXPLORE, ZAP, ZAP_PROMPT};

    vec![
        ModeDescriptor::new(COMMENT)
            .with_label("Comment")
            .with_trigger(affordance(COMMENT, "trigger"))
            .with_toolbar(affordance(COMMENT, "toolbar"))
            .with_view(affordance(COMMENT, "view"))
            .with_state::<ComposerDraft>(),
        ModeDescriptor::new(CURATION)
            .with_label("Curate")
            .with_trigger(affordance(CURATION, "trigger"))
            .with_view(affordance(CURATION, "view"))
            .with_state::<CurationState>(),
        ModeDescriptor::new(EXPLORE)
            .with_label("Explore")
            .with_trigger(affordance(EXPLORE, "trigger"))
            .with_view(affordance(EXPLORE, "view"))
            .with_state::<ExploreState>(),
        ModeDescriptor::new(CREATE_ITEM)
            .with_label("Create item")
            .with_trigger(affordance(CREATE_ITEM, "trigger"))
            .with_toolbar(affordance(CREATE_ITEM, "toolbar"))
            .with_view(affordance(CREATE_ITEM, "view"))
            .with_state::<CreateItemState>(),
        ModeDescriptor::new(ZAP)
            .with_label("Zap")
            .with_trigger(affordance(ZAP, "trigger"))
            .with_view(affordance(ZAP, "view"))
            .with_state::<ZapState>(),
        // Shown by other panels; no trigger of its own.
        ModeDescriptor::new(ZAP_PROMPT)
            .with_label("Zap prompt")
            .with_view(affordance(ZAP_PROMPT, "view"))
            .with_state::<ZapPromptState>(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curation_toggle() {
        let mut state = CurationState::default();
        assert!(state.toggle("note1"));
        assert!(state.toggle("note2"));
        assert!(!state.toggle("note1"));
        assert_eq!(state.selected(), ["note2".to_string()]);
        assert!(!state.is_selected("note1"));
    }

    #[test]
    fn test_explore_query_resets_cursor() {
        let mut state = ExploreState {
            cursor: Some("page-3".into()),
            ..ExploreState::default()
        };
        state.set_query("rust");
        assert_eq!(state.query(), "rust");
        assert_eq!(state.cursor, None);
    }

    #[test]
    fn test_composer_snapshot_skips_draft_id() {
        let draft_id = DraftId::new();
        let mut draft = ComposerDraft {
            draft_id: Some(draft_id),
            body: "gm".into(),
            ..ComposerDraft::default()
        };
        draft.mention("npub1alice");
        draft.mention("npub1alice");

        let snapshot = draft.snapshot().unwrap();
        assert!(!snapshot.as_text().unwrap().contains(&draft_id.to_string()));

        let restored = ComposerDraft::restore(draft_id, &snapshot).unwrap();
        assert_eq!(restored, draft);
        assert_eq!(restored.mentions.len(), 1);
    }

    #[test]
    fn test_zap_readiness() {
        let mut zap = ZapState::default();
        assert!(!zap.is_ready());
        zap.recipient = Some("npub1bob".into());
        zap.amount_sats = 21;
        assert!(zap.is_ready());
    }
}
