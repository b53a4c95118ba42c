use crate::engine::{self, DonorEmitter, EditGeneration, TableScope};
use crate::{
    ConditionRecord, Document, EngineConfig, EngineError, EntityTable, HistorySnapshot, HistoryStack, Matrix44,
    NameRef, Result,
};
use chrono::Local;
use std::path::Path;
use std::sync::Arc;

/// What the caller has selected. The engine never reads it; history restores
/// it on undo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub system: Option<NameRef>,
    pub emitters: Vec<String>,
    pub condition: Option<usize>,
}

/// A single-writer editing session over one document.
///
/// Every mutating method runs the corresponding [`engine`] operation, and when
/// the text changed, pushes the previous state onto the history, replaces the
/// document and re-extracts the entity table.
///
/// Errors follow one rule: malformed input, converter failures and I/O are
/// returned; a missing target or a renamed key is logged and the method
/// returns `Ok(None)` / `Ok(false)` with the session unchanged.
///
/// # Example
/// ```
/// use vfxbin::EditSession;
///
/// let mut session = EditSession::new(
///     "\"Hero_Q\" = VfxSystemDefinitionData {\n    complexEmitterDefinitionData: list[pointer] = {\n        VfxEmitterDefinitionData {\n            emitterName: string = \"a\"\n        }\n    }\n}\n",
/// );
/// let removed = session.delete_emitters("Hero_Q", &["a"]).unwrap();
/// assert_eq!(removed, Some(vec!["a".to_string()]));
/// assert!(session.undo());
/// assert_eq!(session.entities().systems[0].emitters.len(), 1);
/// ```
#[derive(Debug)]
pub struct EditSession {
    document: Document,
    entities: Arc<EntityTable>,
    selection: Selection,
    generation: EditGeneration,
    history: HistoryStack,
    config: EngineConfig,
}

impl EditSession {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_config(text, EngineConfig::default())
    }

    pub fn with_config(text: impl Into<String>, config: EngineConfig) -> Self {
        let document = Document::new(text);
        let entities = Arc::new(engine::extract(&document));
        EditSession {
            document,
            entities,
            selection: Selection::default(),
            generation: EditGeneration::new(),
            history: HistoryStack::new(config.history_capacity),
            config,
        }
    }

    pub fn open(path: &Path, config: EngineConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        log::info!("opened {} ({} bytes)", path.display(), text.len());
        Ok(Self::with_config(text, config))
    }

    /// Write the text to `path` and start a new edit generation.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        std::fs::write(path, self.document.text())?;
        log::info!("saved revision {} to {}", self.document.revision(), path.display());
        self.mark_saved();
        Ok(())
    }

    pub fn mark_saved(&mut self) {
        self.generation.clear();
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn text(&self) -> &str {
        self.document.text()
    }

    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn generation(&self) -> &EditGeneration {
        &self.generation
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Restore the state before the last mutation. False when there is none.
    ///
    /// The restored text gets a new revision; revisions never go backwards.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        log::info!("undo '{}'", snapshot.label);
        self.document = self.document.revise(snapshot.document.into_text());
        self.entities = snapshot.entities;
        self.selection = snapshot.selection;
        self.generation = snapshot.generation;
        true
    }

    fn snapshot(&self, label: &str) -> HistorySnapshot {
        HistorySnapshot {
            document: self.document.clone(),
            entities: Arc::clone(&self.entities),
            selection: self.selection.clone(),
            generation: self.generation.clone(),
            label: label.to_string(),
            taken_at: Local::now(),
        }
    }

    fn apply<T>(
        &mut self,
        label: &str,
        edit: impl FnOnce(&Document, &EngineConfig) -> Result<(Document, T)>,
    ) -> Result<Option<T>> {
        match edit(&self.document, &self.config) {
            Ok((next, value)) => {
                if next.text() != self.document.text() {
                    let snapshot = self.snapshot(label);
                    self.history.push(snapshot);
                    self.entities = Arc::new(engine::extract(&next));
                    self.document = next;
                    log::debug!("{label}: now at revision {}", self.document.revision());
                } else {
                    log::debug!("{label}: no change");
                }
                Ok(Some(value))
            }
            Err(err) if !err.is_user_visible() => {
                log::warn!("{label}: {err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn system_key(&self, query: &str) -> Result<NameRef> {
        self.entities
            .find_system(query)
            .map(|s| s.key.clone())
            .ok_or_else(|| EngineError::not_found(format!("system {query}")))
    }

    /// Insert a donor system under `desired_name` and select it. Returns the
    /// final key, which differs from the request on a collision.
    pub fn insert_system(&mut self, system_text: &str, desired_name: &str) -> Result<Option<NameRef>> {
        let key = self.apply("insert system", |doc, config| {
            let inserted = engine::insert_system(doc, system_text, desired_name, config)?;
            Ok((inserted.document, inserted.key))
        })?;
        if let Some(key) = &key {
            self.selection = Selection { system: Some(key.clone()), ..Selection::default() };
        }
        Ok(key)
    }

    pub fn replace_system(&mut self, system: &str, new_text: &str) -> Result<bool> {
        let key = self.system_key(system);
        let done = self.apply("replace system", |doc, _| Ok((engine::replace_system_block(doc, &key?, new_text)?, ())))?;
        Ok(done.is_some())
    }

    pub fn set_transform(&mut self, system: &str, matrix: &Matrix44) -> Result<bool> {
        let key = self.system_key(system);
        let done = self.apply("set transform", |doc, config| {
            Ok((engine::set_system_transform(doc, &key?, matrix, config)?, ()))
        })?;
        Ok(done.is_some())
    }

    /// Delete emitters and remember them as pending for this edit generation.
    pub fn delete_emitters<S: AsRef<str>>(&mut self, system: &str, names: &[S]) -> Result<Option<Vec<String>>> {
        let key = self.system_key(system);
        let removed = self.apply("delete emitters", |doc, _| {
            let key = key?;
            let (next, removed) = engine::delete_emitters(doc, &key, names)?;
            Ok((next, (key, removed)))
        })?;
        let Some((key, removed)) = removed else {
            return Ok(None);
        };
        for name in &removed {
            self.generation.mark_deleted(&key, name);
        }
        self.selection.emitters.retain(|e| !removed.contains(e));
        Ok(Some(removed))
    }

    /// Merge donor emitter blocks into `system`.
    pub fn merge_emitters(&mut self, system: &str, donors: &[DonorEmitter]) -> Result<Option<Vec<String>>> {
        let key = self.system_key(system);
        let generation = self.generation.clone();
        self.apply("merge emitters", |doc, config| engine::merge_emitters(doc, &key?, donors, &generation, config))
    }

    /// Copy emitters called `names` from a system of `donor` into `target`.
    pub fn port_emitters<S: AsRef<str>>(
        &mut self,
        donor: &Document,
        from_system: &str,
        target: &str,
        names: &[S],
    ) -> Result<Option<Vec<String>>> {
        let donor_table = engine::extract(donor);
        let Some(source) = donor_table.find_system(from_system) else {
            log::warn!("port emitters: {}", EngineError::not_found(format!("donor system {from_system}")));
            return Ok(None);
        };
        let donors: Vec<DonorEmitter> = names
            .iter()
            .filter_map(|name| source.emitter(name.as_ref()))
            .map(|emitter| DonorEmitter::from_text(donor.text(), emitter))
            .collect();
        self.merge_emitters(target, &donors)
    }

    /// Write a condition over index `edit_index`, or append it.
    pub fn upsert_condition(&mut self, record: &ConditionRecord, edit_index: Option<usize>) -> Result<bool> {
        let count = self.entities.condition_records().len();
        let done = self.apply("upsert condition", |doc, config| {
            Ok((engine::upsert_condition(doc, record, edit_index, config)?, ()))
        })?;
        if done.is_some() {
            self.selection.condition = Some(edit_index.filter(|&n| n < count).unwrap_or(count));
        }
        Ok(done.is_some())
    }

    pub fn delete_condition(&mut self, index: usize) -> Result<bool> {
        let done = self.apply("delete condition", |doc, _| Ok((engine::delete_condition(doc, index)?, ())))?;
        if done.is_some() && self.selection.condition == Some(index) {
            self.selection.condition = None;
        }
        Ok(done.is_some())
    }

    pub fn ensure_mapping(&mut self, key: &NameRef, target: &NameRef, scope: &TableScope) -> Result<bool> {
        let done = self.apply("map resource", |doc, config| {
            Ok((engine::ensure_mapping(doc, key, target, scope, config)?, ()))
        })?;
        Ok(done.is_some())
    }
}
