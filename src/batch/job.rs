// ==========================================
// 建筑能耗模型转换系统 - 批量转换作业
// ==========================================
// 职责: 输入发现 → 有界工作池并行转换 → 结果台账落库 → 汇总
// 隔离红线: 单文件的任何失败(含处理器内的意外 panic)绝不影响同批其他文件;
//           每个输入文件恰好产生一行台账
// 并发模型: N 个工作任务从共享队列取文件,管道在 spawn_blocking 中同步执行;
//           台账写入经 WAL + 有界重试串行化;汇总在全部工作任务汇合后计算
// ==========================================

use crate::batch::error::{BatchError, BatchResult};
use crate::domain::outcome::{BatchSummary, OutcomeRecord, TranslationOutcome};
use crate::domain::types::ErrorCategory;
use crate::mapping::MappingRegistry;
use crate::pipeline::run::write_target_document;
use crate::pipeline::TranslationPipeline;
use crate::repository::{OutcomeRecordRepository, OutcomeRecordRepositoryImpl};
use crate::RESULTS_DB_FILENAME;
use chrono::Utc;
use futures::future::join_all;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

// ==========================================
// InputSelection - 输入来源
// ==========================================

#[derive(Debug, Clone)]
pub enum InputSelection {
    /// 显式文件列表
    Files(Vec<PathBuf>),
    /// 递归目录扫描(按扩展名过滤)
    Directory(PathBuf),
}

// ==========================================
// BatchOptions - 批处理配置
// ==========================================

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// 转换模式
    pub mode: crate::domain::types::TranslationMode,
    /// 工作任务数;None 时取 可用并行度 - 1(至少 1)
    pub worker_count: Option<usize>,
    /// 目录扫描的源文件扩展名
    pub source_extension: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            mode: crate::domain::types::TranslationMode::AsBuilt,
            worker_count: None,
            source_extension: "xml".to_string(),
        }
    }
}

// ==========================================
// CancelHandle - 协作式取消句柄
// ==========================================
// 取消后工作任务不再从队列取新文件;进行中的文件允许完成或被放弃,
// 台账单行 INSERT 原子,绝无半行
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ==========================================
// WorkerStats - 单工作任务统计
// ==========================================

#[derive(Debug, Default, Clone, Copy)]
struct WorkerStats {
    succeeded: usize,
    failed: usize,
    unrecorded: usize,
}

// ==========================================
// BatchJob - 批量转换作业
// ==========================================

pub struct BatchJob {
    registry: Arc<MappingRegistry>,
    options: BatchOptions,
    cancel: CancelHandle,
}

impl BatchJob {
    /// 创建批量作业
    ///
    /// # 参数
    /// - registry: 进程启动时加载好的只读映射注册表
    /// - options: 批处理配置
    pub fn new(registry: Arc<MappingRegistry>, options: BatchOptions) -> Self {
        Self {
            registry,
            options,
            cancel: CancelHandle::new(),
        }
    }

    /// 取协作式取消句柄(可在外部信号处理中调用)
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// 执行批量转换
    ///
    /// # 参数
    /// - inputs: 显式文件列表或扫描目录
    /// - output_dir: 目标文件输出目录;台账数据库固定落在 {output_dir}/processing_results.db
    ///
    /// # 返回
    /// - BatchSummary: 成功/失败/未入账计数 + 失败归因统计
    pub async fn run(
        &self,
        inputs: InputSelection,
        output_dir: &Path,
    ) -> BatchResult<BatchSummary> {
        let started = Instant::now();

        // === 步骤 1: 输入发现 ===
        let documents = self.discover_inputs(&inputs)?;
        info!(total = documents.len(), "输入发现完成");

        // === 步骤 2: 输出目录与台账存储 ===
        std::fs::create_dir_all(output_dir)
            .map_err(|e| BatchError::OutputDir(e.to_string()))?;
        let repo: Arc<OutcomeRecordRepositoryImpl> = Arc::new(
            OutcomeRecordRepositoryImpl::open(&output_dir.join(RESULTS_DB_FILENAME))?,
        );

        if documents.is_empty() {
            warn!("没有待处理的输入文件");
            return Ok(BatchSummary {
                total: 0,
                succeeded: 0,
                failed: 0,
                unrecorded: 0,
                elapsed: started.elapsed(),
                failure_breakdown: Vec::new(),
            });
        }

        // === 步骤 3: 工作池并行转换 ===
        let total = documents.len();
        let worker_count = self.effective_worker_count(total);
        let pipeline = Arc::new(TranslationPipeline::new(
            self.registry.clone(),
            self.options.mode,
        ));
        let queue: Arc<Mutex<VecDeque<PathBuf>>> =
            Arc::new(Mutex::new(documents.into_iter().collect()));

        info!(worker_count, total, "启动工作池");

        let mut handles = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let worker_id = format!("worker-{:02}", i + 1);
            let queue = queue.clone();
            let pipeline = pipeline.clone();
            let repo = repo.clone();
            let output_dir = output_dir.to_path_buf();
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, queue, pipeline, repo, output_dir, cancel).await
            }));
        }

        // === 步骤 4: 汇合屏障 ===
        let mut stats = WorkerStats::default();
        for joined in join_all(handles).await {
            match joined {
                Ok(worker_stats) => {
                    stats.succeeded += worker_stats.succeeded;
                    stats.failed += worker_stats.failed;
                    stats.unrecorded += worker_stats.unrecorded;
                }
                Err(err) => {
                    // 工作任务本体 panic: 其未完成的文件仍在队列之外,记日志
                    warn!(error = %err, "工作任务异常退出");
                }
            }
        }

        // === 步骤 5: 汇总(从台账取失败归因) ===
        let failure_breakdown = repo.failure_breakdown().await.unwrap_or_else(|e| {
            warn!(error = %e, "失败归因统计读取失败");
            Vec::new()
        });

        let summary = BatchSummary {
            total,
            succeeded: stats.succeeded,
            failed: stats.failed,
            unrecorded: stats.unrecorded,
            elapsed: started.elapsed(),
            failure_breakdown,
        };

        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            unrecorded = summary.unrecorded,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "批量转换完成"
        );

        Ok(summary)
    }

    /// 实际工作任务数: 配置优先,默认 可用并行度 - 1,且不超过文件数
    fn effective_worker_count(&self, total: usize) -> usize {
        let configured = self.options.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2)
                .saturating_sub(1)
                .max(1)
        });
        configured.max(1).min(total.max(1))
    }

    /// 输入发现: 显式列表原样使用;目录递归扫描按扩展名过滤
    ///
    /// 扫描结果按路径排序,保证提交顺序确定(完成顺序仍不保证)
    fn discover_inputs(&self, inputs: &InputSelection) -> BatchResult<Vec<PathBuf>> {
        match inputs {
            InputSelection::Files(paths) => Ok(paths.clone()),
            InputSelection::Directory(root) => {
                let mut found = Vec::new();
                walk_directory(root, &self.options.source_extension, &mut found)?;
                found.sort();
                Ok(found)
            }
        }
    }
}

/// 递归目录扫描
fn walk_directory(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> BatchResult<()> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| BatchError::Discovery(format!("{}: {}", dir.display(), e)))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| BatchError::Discovery(format!("{}: {}", dir.display(), e)))?;
        let path = entry.path();
        if path.is_dir() {
            walk_directory(&path, extension, out)?;
        } else if path
            .extension()
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false)
        {
            out.push(path);
        }
    }
    Ok(())
}

/// 工作任务主循环: 从队列取文件 → 管道转换 → 落盘 → 台账
async fn worker_loop(
    worker_id: String,
    queue: Arc<Mutex<VecDeque<PathBuf>>>,
    pipeline: Arc<TranslationPipeline>,
    repo: Arc<OutcomeRecordRepositoryImpl>,
    output_dir: PathBuf,
    cancel: CancelHandle,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    loop {
        if cancel.is_cancelled() {
            debug!(worker_id = %worker_id, "收到取消信号,停止取新文件");
            break;
        }

        // 持锁只覆盖出队动作
        let path = match queue.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        let Some(path) = path else { break };

        let start_time = Utc::now();

        // 管道是 CPU 密集的同步过程,放入阻塞任务;
        // 闭包内 panic 由 JoinError 捕获,转为 Failure 而非丢失记录
        let outcome = {
            let pipeline = pipeline.clone();
            let path = path.clone();
            match tokio::task::spawn_blocking(move || pipeline.translate_file(&path)).await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    warn!(worker_id = %worker_id, error = %join_err, "管道执行异常");
                    TranslationOutcome::Failure {
                        error_type: "Internal_Panic".to_string(),
                        error_category: ErrorCategory::Internal,
                        message: join_err.to_string(),
                        warnings: Vec::new(),
                    }
                }
            }
        };

        // 落盘是独立终步,仅在 Success 后执行;写失败降级为 Failure
        let (outcome, output_path) = match outcome {
            TranslationOutcome::Success { target, warnings } => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "output".to_string());
                let out_path = output_dir.join(format!("{}.xml", stem));

                match write_target_document(&target, &out_path) {
                    Ok(()) => (
                        TranslationOutcome::Success { target, warnings },
                        Some(out_path),
                    ),
                    Err(err) => (
                        TranslationOutcome::Failure {
                            error_type: "Io_WriteFailed".to_string(),
                            error_category: ErrorCategory::Io,
                            message: err.to_string(),
                            warnings,
                        },
                        None,
                    ),
                }
            }
            failure => (failure, None),
        };

        let end_time = Utc::now();
        let record = OutcomeRecord::from_outcome(
            &path,
            &outcome,
            output_path.as_deref(),
            start_time,
            end_time,
            &worker_id,
        );

        match repo.insert(&record).await {
            Ok(()) => {
                if outcome.is_success() {
                    stats.succeeded += 1;
                } else {
                    stats.failed += 1;
                }
                debug!(
                    worker_id = %worker_id,
                    filepath = %record.filepath,
                    status = %record.status,
                    "文件处理完成"
                );
            }
            Err(err) => {
                // 台账写入失败: 记日志,计入 unrecorded,批处理继续
                stats.unrecorded += 1;
                warn!(
                    worker_id = %worker_id,
                    filepath = %record.filepath,
                    error = %err,
                    "台账写入失败,结果未入账"
                );
            }
        }
    }

    stats
}
