//! World engine registry.
//!
//! # Responsibility
//! - Keep exactly one `WbNote` per tracked vault path.
//! - Translate host file events into index, re-derive, re-key, replace and
//!   remove transitions.
//! - Reload reference datasets when their backing files change.
//!
//! # Invariants
//! - Handlers take `&mut self` and run to completion, so events are applied
//!   strictly in delivery order and no handler observes a half-applied one.
//! - A failure on one note never stops other notes from updating.
//! - A discriminant change replaces the note; derived state is not migrated.

use super::directory::NoteDirectory;
use super::{InitReport, SyncOutcome, UpdateSummary};
use crate::calendar::WorldDate;
use crate::config::EngineSettings;
use crate::data::{DatasetKey, ReferenceDataStore};
use crate::derive::{density_descriptor, DerivationContext};
use crate::error::{EngineError, EngineResult};
use crate::host::{NoteDisplay, WorldHost, WriteMode};
use crate::model::{NoteId, NoteRef, NoteType, WbNote};
use crate::schema::{note_type_of, ValidationError};
use crate::units::UnitConverter;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::Path;

/// Registry of world-engine notes over one host vault.
pub struct WorldEngine<H: WorldHost> {
    host: H,
    settings: EngineSettings,
    current_date: WorldDate,
    data: ReferenceDataStore,
    notes: BTreeMap<String, WbNote>,
    displayed: Option<String>,
    display: Option<Box<dyn NoteDisplay>>,
}

impl<H: WorldHost> WorldEngine<H> {
    /// Creates an empty registry; call `initialize` to index the vault.
    ///
    /// # Errors
    /// - `Settings` when settings fail validation.
    /// - `Parse` when a bundled dataset does not decode.
    pub fn new(host: H, settings: EngineSettings) -> EngineResult<Self> {
        settings.validate()?;
        let current_date = settings.current_world_date()?;
        let data = ReferenceDataStore::with_overrides(&settings.datasets)?;
        Ok(Self {
            host,
            settings,
            current_date,
            data,
            notes: BTreeMap::new(),
            displayed: None,
            display: None,
        })
    }

    /// Loads dataset overrides, indexes every trackable file, then derives.
    ///
    /// Indexing finishes before any derivation so links resolve regardless
    /// of enumeration order.
    pub fn initialize(&mut self) -> InitReport {
        let dataset_errors = self.data.reload_all(&self.host);
        self.notes.clear();

        let mut skipped = 0;
        for path in self.host.list_files() {
            if !self.is_trackable(&path) {
                skipped += 1;
                continue;
            }
            match self.read_note_type(&path) {
                Some((note_type, raw)) => {
                    let note = WbNote::new(path.clone(), note_type, raw);
                    self.notes.insert(path, note);
                }
                None => skipped += 1,
            }
        }

        let summary = self.update_all();
        info!(
            "event=engine_initialize module=engine status=ok indexed={} skipped={} invalid={} failed={} dataset_errors={}",
            self.notes.len(),
            skipped,
            summary.invalid.len(),
            summary.failed.len(),
            dataset_errors.len()
        );
        InitReport {
            indexed: self.notes.len(),
            skipped,
            summary,
            dataset_errors,
        }
    }

    /// Indexes a newly created file.
    ///
    /// # Errors
    /// - `Validation` when the new note's metadata is malformed; the note is
    ///   still tracked with the error attached.
    /// - `Parse` when the file is a dataset override that fails to load.
    pub fn on_create(&mut self, path: &str) -> EngineResult<SyncOutcome> {
        if let Some(key) = self.data.key_for_path(path) {
            return self.reload_dataset(key);
        }
        if self.notes.contains_key(path) {
            debug!(
                "event=engine_create module=engine status=already_tracked path={}",
                path
            );
            return self.on_modify(path);
        }
        if !self.is_trackable(path) {
            return Ok(SyncOutcome::Ignored);
        }
        let Some((note_type, raw)) = self.read_note_type(path) else {
            return Ok(SyncOutcome::Ignored);
        };

        let note = WbNote::new(path, note_type, raw);
        let id = note.id();
        self.notes.insert(path.to_string(), note);
        info!(
            "event=engine_create module=engine status=ok path={} type={}",
            path, note_type
        );
        let result = self.refresh(path);
        self.notify_if_displayed(path);
        result.map(|()| SyncOutcome::Indexed(id))
    }

    /// Re-reads metadata of a modified file.
    ///
    /// Same variant: re-derive in place. Different variant: replace the note
    /// with a fresh one. No variant: stop tracking.
    ///
    /// # Errors
    /// - `Validation` when metadata is unreadable or malformed; the previous
    ///   derived state is kept.
    /// - `Parse` when the file is a dataset override that fails to load.
    pub fn on_modify(&mut self, path: &str) -> EngineResult<SyncOutcome> {
        if let Some(key) = self.data.key_for_path(path) {
            return self.reload_dataset(key);
        }
        let Some((current_id, current_type)) = self
            .notes
            .get(path)
            .map(|note| (note.id(), note.note_type()))
        else {
            return self.on_create(path);
        };

        let Some(raw) = self.host.read_metadata(path) else {
            if let Some(note) = self.notes.get_mut(path) {
                note.mark_unreadable();
            }
            warn!(
                "event=engine_modify module=engine status=unreadable path={}",
                path
            );
            self.notify_if_displayed(path);
            return Err(EngineError::Validation(ValidationError::unreadable()));
        };

        let outcome = match note_type_of(&raw, &self.settings.discriminant_key) {
            None => {
                self.notes.remove(path);
                self.clear_displayed_if(path);
                info!(
                    "event=engine_modify module=engine status=untracked path={}",
                    path
                );
                return Ok(SyncOutcome::Removed(current_id));
            }
            Some(note_type) if note_type == current_type => {
                if let Some(note) = self.notes.get_mut(path) {
                    note.set_raw_metadata(raw);
                }
                SyncOutcome::Updated(current_id)
            }
            Some(note_type) => {
                let note = WbNote::new(path, note_type, raw);
                let replacement_id = note.id();
                self.notes.insert(path.to_string(), note);
                info!(
                    "event=engine_modify module=engine status=replaced path={} from={} to={}",
                    path, current_type, note_type
                );
                SyncOutcome::Replaced {
                    previous: current_id,
                    current: replacement_id,
                }
            }
        };

        let result = self.refresh(path);
        self.notify_if_displayed(path);
        result.map(|()| outcome)
    }

    /// Re-keys a renamed note without re-deriving it.
    ///
    /// Moves from or onto a dataset backing path are dataset events: the
    /// dataset left behind resets to defaults, the one moved onto reloads.
    ///
    /// # Errors
    /// - `Validation` when an untracked file moves into a trackable place
    ///   and its metadata is malformed.
    /// - `Parse` when the file moved onto a backing path fails to load.
    pub fn on_rename(&mut self, old_path: &str, new_path: &str) -> EngineResult<SyncOutcome> {
        let touches_dataset = [old_path, new_path]
            .iter()
            .any(|path| self.data.key_for_path(path).is_some());
        if touches_dataset {
            return self.rename_dataset_file(old_path, new_path);
        }
        let Some(mut note) = self.notes.remove(old_path) else {
            return self.on_create(new_path);
        };
        let id = note.id();
        if !self.is_trackable(new_path) {
            info!(
                "event=engine_rename module=engine status=untracked from={} to={}",
                old_path, new_path
            );
            self.clear_displayed_if(old_path);
            return Ok(SyncOutcome::Removed(id));
        }
        if let Some(overwritten) = self.notes.remove(new_path) {
            warn!(
                "event=engine_rename module=engine status=overwrote path={} dropped_id={}",
                new_path,
                overwritten.id()
            );
        }

        note.rename(new_path);
        self.notes.insert(new_path.to_string(), note);
        if self.displayed.as_deref() == Some(old_path) {
            self.displayed = Some(new_path.to_string());
        }
        info!(
            "event=engine_rename module=engine status=ok from={} to={}",
            old_path, new_path
        );
        Ok(SyncOutcome::Renamed(id))
    }

    /// Drops a deleted note. References to it fail to resolve from now on.
    ///
    /// Deleting a dataset override file restores that dataset's defaults.
    pub fn on_delete(&mut self, path: &str) -> EngineResult<SyncOutcome> {
        if let Some(key) = self.data.key_for_path(path) {
            self.data.reset(key);
            warn!(
                "event=dataset_reset module=engine dataset={} path={}",
                key.as_str(),
                path
            );
            self.update_all();
            self.notify_displayed();
            return Ok(SyncOutcome::DatasetReloaded(key));
        }
        match self.notes.remove(path) {
            Some(note) => {
                self.clear_displayed_if(path);
                info!("event=engine_delete module=engine status=ok path={}", path);
                Ok(SyncOutcome::Removed(note.id()))
            }
            None => Ok(SyncOutcome::Ignored),
        }
    }

    /// Reloads one dataset and re-derives every note on success.
    ///
    /// # Errors
    /// - `Parse` when the override cannot be loaded; live rows stay as they
    ///   were and no note is touched.
    pub fn reload_dataset(&mut self, key: DatasetKey) -> EngineResult<SyncOutcome> {
        self.data.reload(key, &self.host)?;
        self.update_all();
        self.notify_displayed();
        Ok(SyncOutcome::DatasetReloaded(key))
    }

    /// Re-derives every tracked note, collecting per-note failures.
    pub fn update_all(&mut self) -> UpdateSummary {
        let directory = NoteDirectory::from_notes(self.notes.values());
        let ctx = DerivationContext::new(
            &self.data,
            &self.host,
            &self.settings,
            self.current_date,
            &directory,
        );
        let mut summary = UpdateSummary::default();
        for (path, note) in self.notes.iter_mut() {
            match note.update(&ctx) {
                Ok(()) => summary.updated += 1,
                Err(EngineError::Validation(err)) => summary.invalid.push((path.clone(), err)),
                Err(err) => {
                    warn!(
                        "event=engine_update module=engine status=error path={} error={}",
                        path, err
                    );
                    summary.failed.push((path.clone(), err));
                }
            }
        }
        summary
    }

    /// Moves the world's "today" and re-derives ages.
    pub fn set_current_date(&mut self, date: WorldDate) -> UpdateSummary {
        self.current_date = date;
        let summary = self.update_all();
        self.notify_displayed();
        summary
    }

    pub fn current_date(&self) -> WorldDate {
        self.current_date
    }

    /// Writes starter metadata for `note_type` to `path` and indexes it.
    ///
    /// # Errors
    /// - `Consistency` when `path` is already tracked.
    /// - `Host` when the host rejects the write.
    pub fn create_note_template(
        &mut self,
        path: &str,
        note_type: NoteType,
    ) -> EngineResult<SyncOutcome> {
        if self.notes.contains_key(path) {
            return Err(EngineError::Consistency(format!(
                "`{path}` is already a tracked note"
            )));
        }
        let template = note_type.template(&self.settings.discriminant_key);
        self.host
            .write_metadata(path, &template, WriteMode::Merge)
            .map_err(EngineError::Host)?;
        self.on_create(path)
    }

    pub fn by_path(&self, path: &str) -> Option<&WbNote> {
        self.notes.get(path)
    }

    /// First note with this name in path order; names need not be unique.
    pub fn by_name(&self, name: &str) -> Option<&WbNote> {
        self.notes.values().find(|note| note.name() == name)
    }

    /// Looks a note up by filesystem path, normalizing separators.
    pub fn by_file(&self, file: &Path) -> Option<&WbNote> {
        let normalized = file.to_string_lossy().replace('\\', "/");
        let trimmed = normalized.trim_start_matches("./");
        self.notes.get(trimmed)
    }

    pub fn by_id(&self, id: NoteId) -> Option<&WbNote> {
        self.notes.values().find(|note| note.id() == id)
    }

    pub fn by_type(&self, note_type: NoteType) -> impl Iterator<Item = &WbNote> + '_ {
        self.notes
            .values()
            .filter(move |note| note.note_type() == note_type)
    }

    /// Resolves a weak reference against the current registry.
    ///
    /// Tries the recorded path first, then the name; the variant must match.
    pub fn resolve(&self, reference: &NoteRef) -> Option<&WbNote> {
        self.by_path(&reference.path)
            .filter(|note| note.note_type() == reference.note_type)
            .or_else(|| {
                self.notes.values().find(|note| {
                    note.note_type() == reference.note_type && note.name() == reference.name
                })
            })
    }

    pub fn notes(&self) -> impl Iterator<Item = &WbNote> + '_ {
        self.notes.values()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Registers the UI render hook.
    pub fn set_display(&mut self, display: Box<dyn NoteDisplay>) {
        self.display = Some(display);
    }

    /// Marks `path` as the note on screen and renders it.
    ///
    /// Returns `false` when `path` is not a tracked note.
    pub fn set_displayed(&mut self, path: Option<&str>) -> bool {
        self.displayed = path.map(str::to_string);
        match path {
            Some(path) if self.notes.contains_key(path) => {
                self.notify_displayed();
                true
            }
            Some(_) => false,
            None => true,
        }
    }

    pub fn displayed(&self) -> Option<&WbNote> {
        self.displayed
            .as_deref()
            .and_then(|path| self.notes.get(path))
    }

    /// Density descriptor for `density` people per `area_unit`.
    pub fn density_descriptor(&self, density: f64, area_unit: &str) -> Option<String> {
        density_descriptor(
            &self.data.density_bands(),
            &self.converter(),
            density,
            area_unit,
        )
    }

    /// Conversion service over the live unit rows.
    pub fn converter(&self) -> UnitConverter {
        self.data.converter()
    }

    pub fn data(&self) -> &ReferenceDataStore {
        &self.data
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host access; follow edits with the matching `on_*` event.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn rename_dataset_file(&mut self, old_path: &str, new_path: &str) -> EngineResult<SyncOutcome> {
        if let Some(note) = self.notes.remove(old_path) {
            self.clear_displayed_if(old_path);
            info!(
                "event=engine_rename module=engine status=untracked from={} to={} id={}",
                old_path,
                new_path,
                note.id()
            );
        }
        let moved_away = self.data.key_for_path(old_path);
        if let Some(key) = moved_away {
            self.data.reset(key);
            warn!(
                "event=dataset_reset module=engine dataset={} path={} moved_to={}",
                key.as_str(),
                old_path,
                new_path
            );
        }
        let reloaded = self
            .data
            .key_for_path(new_path)
            .map(|key| self.data.reload(key, &self.host).map(|_| key));

        if moved_away.is_some() || matches!(reloaded, Some(Ok(_))) {
            self.update_all();
            self.notify_displayed();
        }
        match (reloaded, moved_away) {
            (Some(Ok(key)), _) | (None, Some(key)) => Ok(SyncOutcome::DatasetReloaded(key)),
            (Some(Err(err)), _) => Err(err.into()),
            (None, None) => Ok(SyncOutcome::Ignored),
        }
    }

    fn is_trackable(&self, path: &str) -> bool {
        !self.settings.is_excluded(path) && self.data.key_for_path(path).is_none()
    }

    fn read_note_type(&self, path: &str) -> Option<(NoteType, serde_json::Value)> {
        let raw = self.host.read_metadata(path)?;
        let note_type = note_type_of(&raw, &self.settings.discriminant_key)?;
        Some((note_type, raw))
    }

    /// Re-derives the note at `path` against a fresh registry snapshot.
    fn refresh(&mut self, path: &str) -> EngineResult<()> {
        let directory = NoteDirectory::from_notes(self.notes.values());
        let note = self.notes.get_mut(path).ok_or_else(|| {
            EngineError::Consistency(format!("`{path}` vanished before derivation"))
        })?;
        let ctx = DerivationContext::new(
            &self.data,
            &self.host,
            &self.settings,
            self.current_date,
            &directory,
        );
        note.update(&ctx)
    }

    fn notify_if_displayed(&self, path: &str) {
        if self.displayed.as_deref() == Some(path) {
            self.notify_displayed();
        }
    }

    fn notify_displayed(&self) {
        if let (Some(display), Some(note)) = (self.display.as_deref(), self.displayed()) {
            display.display_note(note);
        }
    }

    fn clear_displayed_if(&mut self, path: &str) {
        if self.displayed.as_deref() == Some(path) {
            self.displayed = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WorldEngine;
    use crate::config::EngineSettings;
    use crate::engine::SyncOutcome;
    use crate::error::EngineError;
    use crate::host::{MemoryVault, NoteDisplay};
    use crate::model::{NoteType, WbNote};
    use serde_json::json;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    fn settlement(scale: f64) -> serde_json::Value {
        json!({
            "noteType": "settlement",
            "demographics": {"settlementType": "Village", "populationScale": scale}
        })
    }

    fn engine_with(files: Vec<(&str, serde_json::Value)>) -> WorldEngine<MemoryVault> {
        let mut vault = MemoryVault::new();
        for (path, metadata) in files {
            vault.insert_file(path, metadata);
        }
        let mut engine = WorldEngine::new(vault, EngineSettings::default()).expect("engine");
        engine.initialize();
        engine
    }

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl NoteDisplay for Recorder {
        fn display_note(&self, note: &WbNote) {
            self.0.borrow_mut().push(note.file_path().to_string());
        }
    }

    #[test]
    fn initialize_skips_plain_and_excluded_files() {
        let mut vault = MemoryVault::new();
        vault.insert_file("Towns/Bree.md", settlement(0.5));
        vault.insert_file("Templates/Town.md", settlement(0.5));
        vault.insert_file("Diary.md", json!({"mood": "fine"}));
        vault.insert_plain_file("Scratch.md");
        let settings = EngineSettings {
            excluded_folders: vec!["Templates".to_string()],
            ..EngineSettings::default()
        };
        let mut engine = WorldEngine::new(vault, settings).unwrap();
        let report = engine.initialize();
        assert_eq!(report.indexed, 1);
        assert_eq!(report.skipped, 3);
        assert!(engine.by_path("Templates/Town.md").is_none());
    }

    #[test]
    fn modify_with_invalid_metadata_keeps_last_good_population() {
        let mut engine = engine_with(vec![("Bree.md", settlement(0.0))]);
        let before = engine.by_path("Bree.md").unwrap().as_settlement().unwrap().population;
        assert_eq!(before, Some(401.0));

        engine.host_mut().insert_file("Bree.md", settlement(3.0));
        let err = engine.on_modify("Bree.md").unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let note = engine.by_path("Bree.md").unwrap();
        assert!(note.validation_error().is_some());
        assert_eq!(note.as_settlement().unwrap().population, before);
    }

    #[test]
    fn unreadable_metadata_marks_note_without_dropping_it() {
        let mut engine = engine_with(vec![("Bree.md", settlement(1.0))]);
        engine.host_mut().insert_plain_file("Bree.md");
        assert!(engine.on_modify("Bree.md").is_err());
        let note = engine.by_path("Bree.md").unwrap();
        assert_eq!(note.as_settlement().unwrap().population, Some(900.0));
        assert!(!note.is_valid());
    }

    #[test]
    fn removing_discriminant_untracks_the_note() {
        let mut engine = engine_with(vec![("Bree.md", settlement(1.0))]);
        engine.host_mut().insert_file("Bree.md", json!({"tags": ["town"]}));
        assert!(matches!(engine.on_modify("Bree.md").unwrap(), SyncOutcome::Removed(_)));
        assert!(engine.is_empty());
    }

    #[test]
    fn by_file_normalizes_separators() {
        let engine = engine_with(vec![("Towns/Bree.md", settlement(0.5))]);
        assert!(engine.by_file(Path::new("./Towns/Bree.md")).is_some());
    }

    #[test]
    fn display_fires_for_the_displayed_note_only() {
        let mut engine = engine_with(vec![
            ("Bree.md", settlement(0.5)),
            ("Staddle.md", settlement(0.5)),
        ]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        engine.set_display(Box::new(Recorder(Rc::clone(&seen))));
        assert!(engine.set_displayed(Some("Bree.md")));

        engine.host_mut().insert_file("Staddle.md", settlement(0.1));
        engine.on_modify("Staddle.md").unwrap();
        engine.host_mut().insert_file("Bree.md", settlement(0.9));
        engine.on_modify("Bree.md").unwrap();

        assert_eq!(*seen.borrow(), vec!["Bree.md".to_string(), "Bree.md".to_string()]);
    }

    #[test]
    fn template_creation_indexes_a_valid_note() {
        let mut engine = engine_with(Vec::new());
        let outcome = engine
            .create_note_template("People/Ana.md", NoteType::Character)
            .unwrap();
        assert!(matches!(outcome, SyncOutcome::Indexed(_)));
        let note = engine.by_path("People/Ana.md").unwrap();
        assert!(note.is_valid());
        assert_eq!(note.note_type(), NoteType::Character);
        assert!(matches!(
            engine.create_note_template("People/Ana.md", NoteType::Prose),
            Err(EngineError::Consistency(_))
        ));
    }
}
