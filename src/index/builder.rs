//! Index builder
//!
//! Synchronizes an index with its source tree: discovers candidate files,
//! skips the ones that already carry a manifest, translates the rest and
//! persists the resulting blobs. Per-file failures are collected as
//! problem strings and never abort a run; only structural failures
//! (unreadable index root, worker loss) propagate.
//!
//! With one worker, files are processed sequentially and the problem list
//! order follows the scan order. With two or more workers, the discovered
//! files are grouped into blocks and drained from a shared queue by a
//! bounded pool of tasks; every file is still attempted exactly once and
//! every outcome recorded, but the order is unspecified.

use crate::index::error::{IndexError, IndexResult};
use crate::index::scanner::SourceScanner;
use crate::index::store::IndexStore;
use crate::index::translate::ChunkTranslator;
use crate::vfs::FileSystem;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Options for one synchronization run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Scope the scan to one path prefix instead of the configured
    /// categories
    pub prefix: Option<String>,
    /// Number of concurrent workers; 1 processes sequentially
    pub num_workers: usize,
    /// Number of files per dispatched block, ignored below two workers
    pub block_size: usize,
    /// Re-index files whose manifest already exists
    pub force: bool,
    /// Translate but do not persist anything
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            num_workers: 1,
            block_size: 100,
            force: false,
            dry_run: false,
        }
    }
}

impl SyncOptions {
    /// Builder method: scope the run to a path prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Builder method: set the worker count
    pub fn workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Builder method: set the dispatch block size
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Builder method: re-index existing manifests
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Builder method: suppress persistence
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Outcome of one synchronization run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of files successfully indexed (skipped files count as
    /// neither success nor problem)
    pub files_indexed: usize,
    /// One human-readable entry per failed file, in processing order for
    /// single-worker runs
    pub problems: Vec<String>,
}

impl SyncReport {
    /// Whether the run finished without a single problem
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Per-file result inside a run
enum FileOutcome {
    Indexed,
    Skipped,
    Problem(String),
}

/// Orchestrates scanning, skip decisions, translation and persistence.
#[derive(Clone)]
pub struct IndexBuilder {
    store: Arc<IndexStore>,
    source_fs: Arc<dyn FileSystem>,
    scanner: SourceScanner,
    translator: Arc<dyn ChunkTranslator>,
}

impl IndexBuilder {
    /// Builder over an opened store. The scanner is rooted at the store's
    /// configured source path.
    pub fn new(
        store: Arc<IndexStore>,
        source_fs: Arc<dyn FileSystem>,
        translator: Arc<dyn ChunkTranslator>,
    ) -> Self {
        let scanner = SourceScanner::new(
            Arc::clone(&source_fs),
            store.config().source_path.clone(),
        );
        Self {
            store,
            source_fs,
            scanner,
            translator,
        }
    }

    /// Builder method: match a different source filename suffix
    pub fn source_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.scanner = self.scanner.suffix(suffix);
        self
    }

    /// The store this builder writes to
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Synchronize the index with the source tree.
    ///
    /// Returns the number of files indexed plus the list of per-file
    /// problems. Counts and problems are identical regardless of the
    /// worker count; only the problem order is worker-dependent.
    pub async fn sync(&self, options: &SyncOptions) -> IndexResult<SyncReport> {
        let files = self.discover(options.prefix.as_deref()).await;
        tracing::info!(
            files = files.len(),
            workers = options.num_workers,
            force = options.force,
            dry_run = options.dry_run,
            "Starting index sync"
        );

        let report = if options.num_workers < 2 {
            self.sync_sequential(files, options).await
        } else {
            self.sync_pooled(files, options).await?
        };

        tracing::info!(
            indexed = report.files_indexed,
            problems = report.problems.len(),
            "Index sync finished"
        );
        Ok(report)
    }

    /// List the files in scope for a run: the given prefix, else the
    /// union of all configured categories, else the whole source tree.
    async fn discover(&self, prefix: Option<&str>) -> Vec<String> {
        if let Some(prefix) = prefix {
            return self.scanner.scan(Some(prefix)).await;
        }
        let categories = &self.store.config().path_prefixes;
        if categories.is_empty() {
            return self.scanner.scan(None).await;
        }
        let mut files = Vec::new();
        for (category, category_prefix) in categories {
            tracing::debug!(category, prefix = category_prefix, "Scanning category");
            files.extend(self.scanner.scan(Some(category_prefix)).await);
        }
        files
    }

    async fn sync_sequential(&self, files: Vec<String>, options: &SyncOptions) -> SyncReport {
        let mut files_indexed = 0;
        let mut problems = Vec::new();
        for file in &files {
            match self.index_file(file, options.force, options.dry_run).await {
                FileOutcome::Indexed => files_indexed += 1,
                FileOutcome::Skipped => {}
                FileOutcome::Problem(problem) => problems.push(problem),
            }
        }
        SyncReport {
            files_indexed,
            problems,
        }
    }

    async fn sync_pooled(
        &self,
        files: Vec<String>,
        options: &SyncOptions,
    ) -> IndexResult<SyncReport> {
        // Same grouping as SourceScanner::scan_blocks: fixed-size blocks,
        // last one possibly smaller
        let block_size = options.block_size.max(1);
        let blocks: VecDeque<Vec<String>> =
            files.chunks(block_size).map(|chunk| chunk.to_vec()).collect();

        let queue = Arc::new(Mutex::new(blocks));
        let outcomes: Arc<Mutex<(usize, Vec<String>)>> =
            Arc::new(Mutex::new((0, Vec::new())));

        let mut handles = Vec::with_capacity(options.num_workers);
        for worker in 0..options.num_workers {
            let builder = self.clone();
            let queue = Arc::clone(&queue);
            let outcomes = Arc::clone(&outcomes);
            let force = options.force;
            let dry_run = options.dry_run;

            handles.push(tokio::spawn(async move {
                tracing::debug!(worker, "Sync worker started");
                loop {
                    let block = {
                        let mut queue = match queue.lock() {
                            Ok(queue) => queue,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        queue.pop_front()
                    };
                    let Some(block) = block else { break };

                    let mut indexed = 0;
                    let mut problems = Vec::new();
                    for file in &block {
                        match builder.index_file(file, force, dry_run).await {
                            FileOutcome::Indexed => indexed += 1,
                            FileOutcome::Skipped => {}
                            FileOutcome::Problem(problem) => problems.push(problem),
                        }
                    }

                    let mut outcomes = match outcomes.lock() {
                        Ok(outcomes) => outcomes,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    outcomes.0 += indexed;
                    outcomes.1.append(&mut problems);
                }
            }));
        }

        for handle in handles {
            handle
                .await
                .map_err(|e| IndexError::Config(format!("sync worker failed: {e}")))?;
        }

        let (files_indexed, problems) = {
            let mut outcomes = match outcomes.lock() {
                Ok(outcomes) => outcomes,
                Err(poisoned) => poisoned.into_inner(),
            };
            (outcomes.0, std::mem::take(&mut outcomes.1))
        };
        Ok(SyncReport {
            files_indexed,
            problems,
        })
    }

    /// Index one source file: decide, translate, persist.
    async fn index_file(&self, source_path: &str, force: bool, dry_run: bool) -> FileOutcome {
        let relative = self.store.relative_source_path(source_path);

        match self.store.has_manifest(relative).await {
            Ok(true) if !force => {
                tracing::debug!(file = source_path, "Skipping, manifest exists");
                return FileOutcome::Skipped;
            }
            Ok(_) => {}
            Err(e) => {
                return FileOutcome::Problem(format!(
                    "Error probing index for {source_path}: {e}"
                ));
            }
        }

        tracing::info!(file = source_path, "Indexing");
        let data = match self.source_fs.read(source_path).await {
            Ok(data) => data,
            Err(e) => {
                let problem = format!("Error reading {source_path}: {e}");
                tracing::warn!("{problem}");
                return FileOutcome::Problem(problem);
            }
        };

        let manifest = match self.translator.translate(&data, source_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                let problem = format!("Error indexing {source_path}: {e}");
                tracing::warn!("{problem}");
                return FileOutcome::Problem(problem);
            }
        };

        if dry_run {
            return FileOutcome::Indexed;
        }

        match self.store.write_manifest(relative, &manifest).await {
            Ok(()) => FileOutcome::Indexed,
            Err(e) => {
                let problem = format!("Error writing index for {source_path}: {e}");
                tracing::warn!("{problem}");
                FileOutcome::Problem(problem)
            }
        }
    }
}

impl std::fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("store", &self.store)
            .field("scanner", &self.scanner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::config::IndexConfig;
    use crate::index::translate::TranslateError;
    use crate::vfs::MemoryFileSystem;
    use serde_json::json;

    /// Translator that fails for any source path containing one of the
    /// configured fragments.
    struct SelectiveTranslator {
        fail_for: Vec<String>,
    }

    impl SelectiveTranslator {
        fn reliable() -> Self {
            Self { fail_for: Vec::new() }
        }

        fn failing_for(fragments: &[&str]) -> Self {
            Self {
                fail_for: fragments.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl ChunkTranslator for SelectiveTranslator {
        fn translate(
            &self,
            data: &[u8],
            source: &str,
        ) -> Result<serde_json::Value, TranslateError> {
            if self.fail_for.iter().any(|f| source.contains(f)) {
                return Err(TranslateError::Format(
                    "unreadable chunk table".to_string(),
                ));
            }
            Ok(json!({"source": source, "size": data.len()}))
        }
    }

    const SM_FILES: [&str; 3] = [
        "archive/SM/2023/04/sm-one.nc",
        "archive/SM/2023/04/sm-two.nc",
        "archive/SM/2023/05/sm-three.nc",
    ];
    const OS_FILES: [&str; 2] = ["archive/OS/2023/04/os-one.nc", "archive/OS/2023/04/os-two.nc"];

    async fn seeded_fs() -> Arc<MemoryFileSystem> {
        let fs = Arc::new(MemoryFileSystem::new());
        for file in SM_FILES.iter().chain(OS_FILES.iter()) {
            fs.write(file, b"chunky bytes").await.unwrap();
        }
        fs
    }

    async fn builder_with(
        fs: &Arc<MemoryFileSystem>,
        config: IndexConfig,
        translator: SelectiveTranslator,
    ) -> IndexBuilder {
        let dyn_fs: Arc<dyn FileSystem> = fs.clone();
        let store = IndexStore::create(Arc::clone(&dyn_fs), "index", config, false)
            .await
            .unwrap();
        IndexBuilder::new(Arc::new(store), dyn_fs, Arc::new(translator))
    }

    fn plain_config() -> IndexConfig {
        IndexConfig::new("archive").protocol("memory")
    }

    #[tokio::test]
    async fn test_sync_indexes_all_files() {
        let fs = seeded_fs().await;
        let builder = builder_with(&fs, plain_config(), SelectiveTranslator::reliable()).await;

        let report = builder.sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(report.files_indexed, 5);
        assert!(report.is_clean());

        // Manifests mirror the source tree under the index root
        assert!(fs
            .exists("index/SM/2023/04/sm-one.nc.json")
            .await
            .unwrap());
        assert!(fs
            .exists("index/OS/2023/04/os-two.nc.json")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_second_sync_skips_everything() {
        let fs = seeded_fs().await;
        let builder = builder_with(&fs, plain_config(), SelectiveTranslator::reliable()).await;

        let first = builder.sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(first.files_indexed, 5);

        let second = builder.sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(second.files_indexed, 0);
        assert!(second.problems.is_empty());
    }

    #[tokio::test]
    async fn test_force_reindexes_existing_manifests() {
        let fs = seeded_fs().await;
        let builder = builder_with(&fs, plain_config(), SelectiveTranslator::reliable()).await;

        builder.sync(&SyncOptions::default()).await.unwrap();
        let forced = builder
            .sync(&SyncOptions::default().force(true))
            .await
            .unwrap();
        assert_eq!(forced.files_indexed, 5);
    }

    #[tokio::test]
    async fn test_partial_failure_is_contained() {
        let fs = seeded_fs().await;
        let builder = builder_with(
            &fs,
            plain_config(),
            SelectiveTranslator::failing_for(&["sm-two", "os-one"]),
        )
        .await;

        let report = builder.sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(report.files_indexed, 3);
        assert_eq!(report.problems.len(), 2);
        assert!(report.problems.iter().any(|p| p.contains("os-one.nc")));
        assert!(report.problems.iter().any(|p| p.contains("sm-two.nc")));

        // The healthy files still made it
        assert!(fs
            .exists("index/SM/2023/04/sm-one.nc.json")
            .await
            .unwrap());
        assert!(!fs
            .exists("index/SM/2023/04/sm-two.nc.json")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_problem_order_follows_scan_order() {
        let fs = seeded_fs().await;
        let builder = builder_with(
            &fs,
            plain_config(),
            SelectiveTranslator::failing_for(&["os-", "sm-"]),
        )
        .await;

        let report = builder.sync(&SyncOptions::default()).await.unwrap();
        let scan_order = builder.scanner.scan(None).await;
        assert_eq!(report.problems.len(), scan_order.len());
        for (problem, file) in report.problems.iter().zip(&scan_order) {
            assert!(problem.contains(file.as_str()));
        }
    }

    #[tokio::test]
    async fn test_dry_run_counts_but_writes_nothing() {
        let fs = seeded_fs().await;
        let builder = builder_with(
            &fs,
            plain_config(),
            SelectiveTranslator::failing_for(&["sm-two"]),
        )
        .await;

        let report = builder
            .sync(&SyncOptions::default().dry_run(true))
            .await
            .unwrap();
        assert_eq!(report.files_indexed, 4);
        assert_eq!(report.problems.len(), 1);

        // Only the config blob exists under the index root
        let entries = fs.walk("index", &|_| {}).await;
        let files: Vec<String> = entries.iter().flat_map(|e| e.files.clone()).collect();
        assert_eq!(files, vec!["index-config.json"]);
    }

    #[tokio::test]
    async fn test_prefix_scopes_the_run() {
        let fs = seeded_fs().await;
        let builder = builder_with(&fs, plain_config(), SelectiveTranslator::reliable()).await;

        let report = builder
            .sync(&SyncOptions::default().prefix("SM"))
            .await
            .unwrap();
        assert_eq!(report.files_indexed, 3);
        assert!(!fs
            .exists("index/OS/2023/04/os-one.nc.json")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_categories_scope_the_default_run() {
        let fs = seeded_fs().await;
        // A stray file outside both categories must not be picked up
        fs.write("archive/STRAY/oddball.nc", b"x").await.unwrap();

        let config = plain_config()
            .path_prefix("SM", "SM")
            .path_prefix("OS", "OS");
        let builder = builder_with(&fs, config, SelectiveTranslator::reliable()).await;

        let report = builder.sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(report.files_indexed, 5);
        assert!(!fs.exists("index/STRAY/oddball.nc.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_worker_pool_matches_sequential_results() {
        let fs = seeded_fs().await;
        let builder = builder_with(
            &fs,
            plain_config(),
            SelectiveTranslator::failing_for(&["sm-two", "os-one"]),
        )
        .await;

        let sequential = builder
            .sync(&SyncOptions::default().dry_run(true))
            .await
            .unwrap();
        let pooled = builder
            .sync(&SyncOptions::default().dry_run(true).workers(3).block_size(2))
            .await
            .unwrap();

        assert_eq!(pooled.files_indexed, sequential.files_indexed);
        let mut sequential_problems = sequential.problems.clone();
        let mut pooled_problems = pooled.problems.clone();
        sequential_problems.sort();
        pooled_problems.sort();
        assert_eq!(pooled_problems, sequential_problems);
    }

    #[tokio::test]
    async fn test_worker_pool_persists_all_manifests() {
        let fs = seeded_fs().await;
        let builder = builder_with(&fs, plain_config(), SelectiveTranslator::reliable()).await;

        let report = builder
            .sync(&SyncOptions::default().workers(2).block_size(1))
            .await
            .unwrap();
        assert_eq!(report.files_indexed, 5);
        for file in SM_FILES.iter().chain(OS_FILES.iter()) {
            let manifest = format!("index/{}.json", file.trim_start_matches("archive/"));
            assert!(fs.exists(&manifest).await.unwrap(), "missing {manifest}");
        }
    }
}
