//! Batch driver: translate every document of a game's data directory
//!
//! Each document goes through three passes. Fields are collected first, then translated
//! concurrently by a bounded number of workers, then written back. Message boxes are
//! reflowed last, sequentially, once every translation of the document is in.
//!
//! A run can be cancelled with a [`CancelToken`]: jobs already running finish, no new job
//! starts, the current document is not written and the cache is still saved. The
//! [`Session`] guard saves the cache on every exit path and prunes stale entries only when
//! the run completed.

use crate::cache::TranslationCache;
use crate::document::{
    DocumentKind, FieldAction, TextField, collapse_messages, collect_fields, load_document,
    save_document, set_field, split_messages,
};
use crate::error::{MtError, MtResult};
use crate::glossary::Glossary;
use crate::metrics::{CharCountMeasure, GlyphWidthTable, TextMeasure};
use crate::pipeline::{DEFAULT_SOURCE_LOCALE, DEFAULT_TARGET_LOCALE, TranslationPipeline};
use crate::reflow::DisplayParagraph;
use crate::translator::MachineTranslator;
use crate::validate::Report;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub const DEFAULT_CACHE_FILE: &str = "translate_cache.json";
pub const DEFAULT_LINE_LIMIT: f64 = 50.0;
pub const DEFAULT_MESSAGE_LINES: usize = 4;
pub const DEFAULT_DESCRIPTION_LINES: usize = 3;
pub const DEFAULT_WORKERS: usize = 10;

/// Everything a run needs to know
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub game_dir: PathBuf,
    /// Width of one line of a message box, in display units
    pub line_limit: f64,
    /// Lines of a message box
    pub message_lines: usize,
    /// Lines of an item or skill description
    pub description_lines: usize,
    pub workers: usize,
    pub source_locale: String,
    pub target_locale: String,
    pub cache_path: PathBuf,
    /// Game font; widths are counted in characters without it
    pub font_path: Option<PathBuf>,
    pub glossary_path: Option<PathBuf>,
    /// Translate `www/data` in place instead of reading from `www/data-backup`
    pub skip_backup: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            game_dir: PathBuf::from("."),
            line_limit: DEFAULT_LINE_LIMIT,
            message_lines: DEFAULT_MESSAGE_LINES,
            description_lines: DEFAULT_DESCRIPTION_LINES,
            workers: DEFAULT_WORKERS,
            source_locale: DEFAULT_SOURCE_LOCALE.to_string(),
            target_locale: DEFAULT_TARGET_LOCALE.to_string(),
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            font_path: None,
            glossary_path: None,
            skip_backup: false,
        }
    }
}

impl RunConfig {
    /// Where translated documents are written
    pub fn data_dir(&self) -> PathBuf {
        self.game_dir.join("www").join("data")
    }

    /// Untouched copy of the original documents
    pub fn backup_dir(&self) -> PathBuf {
        self.game_dir.join("www").join("data-backup")
    }

    /// Where source documents are read from
    pub fn source_dir(&self) -> PathBuf {
        if self.skip_backup {
            self.data_dir()
        } else {
            self.backup_dir()
        }
    }

    /// The width measure for this run
    pub fn measure(&self) -> MtResult<Arc<dyn TextMeasure>> {
        match &self.font_path {
            Some(path) => Ok(Arc::new(GlyphWidthTable::from_font_file(path)?)),
            None => Ok(Arc::new(CharCountMeasure)),
        }
    }

    pub fn glossary(&self) -> MtResult<Glossary> {
        match &self.glossary_path {
            Some(path) => Glossary::load(path),
            None => Ok(Glossary::new()),
        }
    }
}

/// Shared stop flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns the cache for the duration of a run and saves it when dropped
#[derive(Debug)]
pub struct Session {
    cache: Arc<TranslationCache>,
    cache_path: PathBuf,
    completed: bool,
    flushed: bool,
}

impl Session {
    /// Load the cache at `cache_path`, or start an empty one
    pub fn open(cache_path: &Path) -> MtResult<Self> {
        Ok(Self::with_cache(
            Arc::new(TranslationCache::load(cache_path)?),
            cache_path,
        ))
    }

    pub fn with_cache(cache: Arc<TranslationCache>, cache_path: &Path) -> Self {
        Self {
            cache,
            cache_path: cache_path.to_path_buf(),
            completed: false,
            flushed: false,
        }
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    /// Mark the run as complete, so that stale entries are pruned on close
    pub fn complete(&mut self) {
        self.completed = true;
    }

    /// Save the cache now and report failures
    pub fn close(mut self) -> MtResult<()> {
        self.flush()
    }

    fn flush(&mut self) -> MtResult<()> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;
        if self.completed {
            self.cache.prune_unreferenced();
        }
        self.cache.save(&self.cache_path)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            error!("failed to save translate cache: {}", e);
        }
    }
}

/// What a run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Documents written
    pub documents: usize,
    /// Fields translated or kept
    pub fields: usize,
    pub cancelled: bool,
    pub report: Report,
}

/// The `*.json` files of `dir`, sorted by name
pub fn list_documents(dir: &Path) -> MtResult<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        MtError::DocumentError(format!("Failed to list '{}': {}", dir.display(), e))
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json || !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Copy `data_dir` to `backup_dir` unless the backup already exists
///
/// Returns whether a backup was made.
pub fn create_backup(data_dir: &Path, backup_dir: &Path) -> MtResult<bool> {
    if backup_dir.exists() {
        return Ok(false);
    }
    info!(
        "creating backup {} → {}",
        data_dir.display(),
        backup_dir.display()
    );
    copy_dir(data_dir, backup_dir)?;
    Ok(true)
}

fn copy_dir(from: &Path, to: &Path) -> MtResult<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Translates documents through a shared pipeline
pub struct BatchDriver {
    config: RunConfig,
    pipeline: Arc<TranslationPipeline>,
    measure: Arc<dyn TextMeasure>,
    cancel: CancelToken,
}

impl BatchDriver {
    pub fn new(
        config: RunConfig,
        pipeline: Arc<TranslationPipeline>,
        measure: Arc<dyn TextMeasure>,
    ) -> Self {
        Self {
            config,
            pipeline,
            measure,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn pipeline(&self) -> &Arc<TranslationPipeline> {
        &self.pipeline
    }

    /// Translate one document in place
    ///
    /// Returns the number of fields handled, or `None` when the run was cancelled before the
    /// document was finished. A cancelled document is left half translated and must not be
    /// written.
    pub async fn translate_document(
        &self,
        document: &mut Value,
        kind: DocumentKind,
    ) -> MtResult<Option<usize>> {
        collapse_messages(document);
        let fields = collect_fields(document, kind);
        let field_count = fields.len();

        let (kept, jobs): (Vec<TextField>, Vec<TextField>) = fields
            .into_iter()
            .partition(|field| field.action == FieldAction::Keep);

        let translated = match self.translate_fields(jobs).await {
            Ok(translated) => translated,
            Err(MtError::Cancelled) => return Ok(None),
            Err(e) => return Err(e),
        };

        for field in kept {
            let value = self.pipeline.keep(&field.text);
            set_field(document, &field.pointer, value)?;
        }
        for (field, text) in translated {
            let text = match field.action {
                FieldAction::Description => self
                    .pipeline
                    .layout(
                        self.measure.as_ref(),
                        &DisplayParagraph::new(
                            text,
                            self.config.line_limit,
                            self.config.description_lines,
                        ),
                    )
                    .join("\n"),
                _ => text,
            };
            set_field(document, &field.pointer, text)?;
        }

        split_messages(document, |text| {
            self.pipeline.layout(
                self.measure.as_ref(),
                &DisplayParagraph::new(text, self.config.line_limit, self.config.message_lines),
            )
        });

        Ok(Some(field_count))
    }

    /// Translate `jobs` on the worker pool
    ///
    /// Fails with [`MtError::Cancelled`] when the cancel token stopped new jobs from starting.
    async fn translate_fields(&self, jobs: Vec<TextField>) -> MtResult<Vec<(TextField, String)>> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let failed = CancelToken::new();
        let mut tasks = JoinSet::new();
        let mut cancelled = false;

        for field in jobs {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| MtError::Other(format!("Worker pool closed: {}", e)))?;
            if failed.is_cancelled() {
                break;
            }
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let pipeline = Arc::clone(&self.pipeline);
            let failed = failed.clone();
            tasks.spawn(async move {
                let _permit = permit;
                debug!("translating {}", field.pointer);
                let result = match field.action {
                    FieldAction::PluginCommand => {
                        pipeline.translate_plugin_command(&field.text).await
                    }
                    _ => pipeline.translate(&field.text).await,
                };
                if result.is_err() {
                    failed.cancel();
                }
                (field, result)
            });
        }

        let mut translated = Vec::with_capacity(tasks.len());
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let (field, result) =
                joined.map_err(|e| MtError::Other(format!("Translation worker failed: {}", e)))?;
            match result {
                Ok(text) => translated.push((field, text)),
                Err(e) => {
                    warn!("failed to translate {:?}: {}", field.text, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if cancelled {
            return Err(MtError::Cancelled);
        }
        Ok(translated)
    }

    /// Translate every document of the configured game
    pub async fn run(&self) -> MtResult<RunSummary> {
        let data_dir = self.config.data_dir();
        if !self.config.skip_backup {
            create_backup(&data_dir, &self.config.backup_dir())?;
        }
        let source_dir = self.config.source_dir();
        let files = list_documents(&source_dir)?;

        let mut summary = RunSummary::default();
        for (n, file_name) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            info!("{}/{} {}", n + 1, files.len(), file_name);

            let mut document = load_document(&source_dir.join(file_name))?;
            let kind = DocumentKind::from_file_name(file_name);
            let Some(fields) = self.translate_document(&mut document, kind).await? else {
                warn!("cancelled while translating {}, not written", file_name);
                summary.cancelled = true;
                break;
            };
            save_document(&data_dir.join(file_name), &document)?;
            summary.documents += 1;
            summary.fields += fields;
        }

        summary.report = self.pipeline.diagnostics().report();
        Ok(summary)
    }
}

/// Run a whole translation: load the cache, translate the game, save the cache
///
/// The cache is saved even when the run fails or is cancelled; stale entries are pruned
/// only after a complete run.
pub async fn translate_game(
    config: RunConfig,
    translator: Arc<dyn MachineTranslator>,
    cancel: CancelToken,
) -> MtResult<RunSummary> {
    let measure = config.measure()?;
    let glossary = config.glossary()?;
    let mut session = Session::open(&config.cache_path)?;

    let pipeline = TranslationPipeline::new(translator, Arc::clone(session.cache()))
        .with_glossary(glossary)
        .with_locales(&config.source_locale, &config.target_locale)?;
    info!(
        "translating {} with {} ({} → {}), {} workers",
        config.game_dir.display(),
        pipeline.provider_name(),
        config.source_locale,
        config.target_locale,
        config.workers
    );

    let driver = BatchDriver::new(config, Arc::new(pipeline), measure).with_cancel_token(cancel);
    let summary = driver.run().await?;
    if !summary.cancelled {
        session.complete();
    }
    session.close()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockMode, MockTranslator};
    use serde_json::json;

    fn driver_with(mode: MockMode, config: RunConfig) -> (BatchDriver, Arc<MockTranslator>) {
        let mock = Arc::new(MockTranslator::new(mode));
        let pipeline = TranslationPipeline::new(mock.clone(), Arc::new(TranslationCache::new()));
        let driver = BatchDriver::new(config, Arc::new(pipeline), Arc::new(CharCountMeasure));
        (driver, mock)
    }

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.message_lines, 4);
        assert_eq!(config.description_lines, 3);
        assert_eq!(config.workers, 10);
        assert_eq!(config.source_dir(), PathBuf::from("./www/data-backup"));

        let in_place = RunConfig {
            skip_backup: true,
            ..RunConfig::default()
        };
        assert_eq!(in_place.source_dir(), in_place.data_dir());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_translate_document_reflows_messages() {
        let config = RunConfig {
            line_limit: 12.0,
            ..RunConfig::default()
        };
        let (driver, mock) = driver_with(MockMode::NoOp, config);
        let mut document = json!({"list": [
            {"code": 401, "indent": 0, "parameters": ["Мама мыла"]},
            {"code": 401, "indent": 0, "parameters": ["раму весь день"]},
            {"code": 0, "indent": 0, "parameters": []}
        ]});

        let handled = driver
            .translate_document(&mut document, DocumentKind::Events)
            .await
            .unwrap();
        assert_eq!(handled, Some(1));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(
            document["list"],
            json!([
                {"code": 401, "indent": 0, "parameters": ["Мама мыла"]},
                {"code": 401, "indent": 0, "parameters": ["раму весь"]},
                {"code": 401, "indent": 0, "parameters": ["день"]},
                {"code": 0, "indent": 0, "parameters": []}
            ])
        );
    }

    #[tokio::test]
    async fn test_descriptions_use_their_own_box() {
        let config = RunConfig {
            line_limit: 6.0,
            ..RunConfig::default()
        };
        let (driver, _) = driver_with(MockMode::NoOp, config);
        let mut document = json!([null, {"name": "Зелье", "description": "лечит раны слегка"}]);
        driver
            .translate_document(&mut document, DocumentKind::Database)
            .await
            .unwrap();
        assert_eq!(document[1]["name"], "Зелье");
        assert_eq!(document[1]["description"], "лечит\nраны\nслегка");
    }

    #[tokio::test]
    async fn test_system_terms_are_kept() {
        let (driver, mock) = driver_with(MockMode::Suffix, RunConfig::default());
        let mut document = json!({"gameTitle": "Quest", "terms": {"basic": ["Level"]}});
        driver
            .translate_document(&mut document, DocumentKind::System)
            .await
            .unwrap();
        assert_eq!(document["gameTitle"], "Quest");
        assert_eq!(mock.call_count(), 0);
        assert_eq!(
            driver.pipeline().cache().get("Level").as_deref(),
            Some("Level")
        );
    }

    #[tokio::test]
    async fn test_cancelled_document_not_finished() {
        let (driver, mock) = driver_with(MockMode::Suffix, RunConfig::default());
        let cancel = CancelToken::new();
        let driver = driver.with_cancel_token(cancel.clone());
        cancel.cancel();

        let mut document = json!({"displayName": "Town"});
        let handled = driver
            .translate_document(&mut document, DocumentKind::Events)
            .await
            .unwrap();
        assert_eq!(handled, None);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_lets_running_jobs_finish() {
        let config = RunConfig {
            workers: 2,
            ..RunConfig::default()
        };
        let mock = Arc::new(MockTranslator::with_delay(MockMode::Suffix, 200));
        let cache = Arc::new(TranslationCache::new());
        let pipeline = Arc::new(TranslationPipeline::new(mock.clone(), Arc::clone(&cache)));
        let cancel = CancelToken::new();
        let driver = BatchDriver::new(
            config.clone(),
            Arc::clone(&pipeline),
            Arc::new(CharCountMeasure),
        )
        .with_cancel_token(cancel.clone());
        let document = json!([
            {"displayName": "A"},
            {"displayName": "B"},
            {"displayName": "C"},
            {"displayName": "D"}
        ]);

        let timer = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            timer.cancel();
        });

        let mut first = document.clone();
        let handled = driver
            .translate_document(&mut first, DocumentKind::Events)
            .await
            .unwrap();
        assert_eq!(handled, None);
        // the two jobs already running finished, no third one started
        assert_eq!(mock.call_count(), 2);
        assert_eq!(cache.get("A").as_deref(), Some("A_ru"));
        assert_eq!(cache.get("B").as_deref(), Some("B_ru"));
        assert_eq!(cache.get("C"), None);

        // the next run is served from the cache for what was done
        let driver = BatchDriver::new(config, pipeline, Arc::new(CharCountMeasure));
        let mut second = document.clone();
        let handled = driver
            .translate_document(&mut second, DocumentKind::Events)
            .await
            .unwrap();
        assert_eq!(handled, Some(4));
        assert_eq!(mock.call_count(), 4);
        assert_eq!(second[0]["displayName"], "A_ru");
        assert_eq!(second[3]["displayName"], "D_ru");
    }

    #[tokio::test]
    async fn test_translator_error_fails_document() {
        let (driver, _) = driver_with(MockMode::Error("offline".to_string()), RunConfig::default());
        let mut document = json!({"displayName": "Town"});
        let result = driver
            .translate_document(&mut document, DocumentKind::Events)
            .await;
        assert!(matches!(result, Err(MtError::TranslationError(_))));
    }

    #[test]
    fn test_list_documents() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Map002.json", "Actors.JSON", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.json")).unwrap();
        assert_eq!(
            list_documents(dir.path()).unwrap(),
            vec!["Actors.JSON", "Map002.json"]
        );
    }

    #[test]
    fn test_backup_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let backup = dir.path().join("data-backup");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(data.join("Map001.json"), "{}").unwrap();

        assert!(create_backup(&data, &backup).unwrap());
        assert!(backup.join("Map001.json").exists());
        assert!(!create_backup(&data, &backup).unwrap());
    }

    #[test]
    fn test_session_saves_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        {
            let session = Session::open(&path).unwrap();
            session.cache().insert("Hello", "Привет".to_string());
        }
        let cache = TranslationCache::load(&path).unwrap();
        assert_eq!(cache.get("Hello").as_deref(), Some("Привет"));
    }

    #[test]
    fn test_session_prunes_only_when_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = Arc::new(TranslationCache::from_entries([
            ("stale".to_string(), "старый".to_string()),
            ("used".to_string(), "нужный".to_string()),
        ]));
        cache.count_reference("used");

        Session::with_cache(Arc::clone(&cache), &path).close().unwrap();
        assert_eq!(TranslationCache::load(&path).unwrap().len(), 2);

        let mut session = Session::with_cache(cache, &path);
        session.complete();
        session.close().unwrap();
        let saved = TranslationCache::load(&path).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved.get("used").as_deref(), Some("нужный"));
    }
}
