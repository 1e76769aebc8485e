// ==========================================
// 建筑能耗模型转换系统 - 转换结果实体
// ==========================================
// 职责: 单文件转换结果 + 结果台账行 + 批处理汇总
// 约束: 每个输入文件恰好产生一个 TranslationOutcome 和一行 OutcomeRecord
// ==========================================

use crate::domain::document::TargetDocument;
use crate::domain::types::{ErrorCategory, OutcomeStatus, WarningLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ==========================================
// TranslationWarning - 结构化警告
// ==========================================
// 可恢复的领域异常只记录,从不抛出;随结果一起返回
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationWarning {
    pub code: String,
    pub message: String,
    pub level: WarningLevel,
}

impl TranslationWarning {
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            level: WarningLevel::Warning,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            level: WarningLevel::Error,
        }
    }
}

// ==========================================
// TranslationOutcome - 单文件转换结果
// ==========================================
// 判别联合: 成功携带完整目标文档,失败携带错误归因与已累计警告
#[derive(Debug, Clone)]
pub enum TranslationOutcome {
    Success {
        target: TargetDocument,
        warnings: Vec<TranslationWarning>,
    },
    Failure {
        error_type: String,
        error_category: ErrorCategory,
        message: String,
        warnings: Vec<TranslationWarning>,
    },
}

impl TranslationOutcome {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            TranslationOutcome::Success { .. } => OutcomeStatus::Success,
            TranslationOutcome::Failure { .. } => OutcomeStatus::Failure,
        }
    }

    pub fn warnings(&self) -> &[TranslationWarning] {
        match self {
            TranslationOutcome::Success { warnings, .. } => warnings,
            TranslationOutcome::Failure { warnings, .. } => warnings,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranslationOutcome::Success { .. })
    }
}

// ==========================================
// OutcomeRecord - 结果台账行
// ==========================================
// 结果数据库 processing_results 表的一行;每个输入文件恰好写入一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: String,
    pub filepath: String,
    pub filename: String,
    pub directory: String,
    pub status: OutcomeStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub output_path: Option<String>,
    pub error_message: Option<String>,
    pub error_type: Option<String>,
    pub error_category: Option<String>,
    /// 序列化后的警告列表（JSON 数组）
    pub warnings: String,
    pub processed_at: DateTime<Utc>,
    pub worker_id: String,
}

impl OutcomeRecord {
    /// 由单文件转换结果构建台账行
    ///
    /// # 参数
    /// - source_path: 输入文件路径
    /// - outcome: 转换结果
    /// - output_path: 成功时目标文件的落盘路径
    /// - start_time/end_time: 该文件处理的起止时间
    /// - worker_id: 执行该文件的工作线程标识
    pub fn from_outcome(
        source_path: &Path,
        outcome: &TranslationOutcome,
        output_path: Option<&Path>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        worker_id: &str,
    ) -> Self {
        let filename = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = source_path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let warnings_json = serde_json::to_string(outcome.warnings())
            .unwrap_or_else(|_| "[]".to_string());

        let (error_message, error_type, error_category) = match outcome {
            TranslationOutcome::Success { .. } => (None, None, None),
            TranslationOutcome::Failure {
                error_type,
                error_category,
                message,
                ..
            } => (
                Some(message.clone()),
                Some(error_type.clone()),
                Some(error_category.to_string()),
            ),
        };

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filepath: source_path.to_string_lossy().into_owned(),
            filename,
            directory,
            status: outcome.status(),
            start_time,
            end_time,
            duration_seconds: (end_time - start_time).num_milliseconds() as f64 / 1000.0,
            output_path: output_path.map(|p| p.to_string_lossy().into_owned()),
            error_message,
            error_type,
            error_category,
            warnings: warnings_json,
            processed_at: Utc::now(),
            worker_id: worker_id.to_string(),
        }
    }

    /// 反序列化警告列表
    pub fn parsed_warnings(&self) -> Vec<TranslationWarning> {
        serde_json::from_str(&self.warnings).unwrap_or_default()
    }
}

// ==========================================
// FailureBreakdownRow - 失败归因统计行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBreakdownRow {
    pub error_type: String,
    pub error_category: String,
    pub count: i64,
}

// ==========================================
// BatchSummary - 批处理汇总
// ==========================================
// 所有工作线程汇合后计算;unrecorded 统计写台账失败的文件数
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub unrecorded: usize,
    pub elapsed: Duration,
    pub failure_breakdown: Vec<FailureBreakdownRow>,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.unrecorded == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_record_from_failure_outcome() {
        let outcome = TranslationOutcome::Failure {
            error_type: "Validation_NegativeRValue".to_string(),
            error_category: ErrorCategory::Enclosure,
            message: "墙体保温 R 值为负".to_string(),
            warnings: vec![TranslationWarning::warning("W1", "测试警告")],
        };

        let start = Utc::now();
        let end = start + chrono::Duration::milliseconds(1500);
        let path = PathBuf::from("/data/in/house_001.xml");
        let record =
            OutcomeRecord::from_outcome(&path, &outcome, None, start, end, "worker-01");

        assert_eq!(record.status, OutcomeStatus::Failure);
        assert_eq!(record.filename, "house_001.xml");
        assert_eq!(record.directory, "/data/in");
        assert_eq!(record.error_type.as_deref(), Some("Validation_NegativeRValue"));
        assert_eq!(record.error_category.as_deref(), Some("Enclosure"));
        assert!(record.output_path.is_none());
        assert!((record.duration_seconds - 1.5).abs() < 1e-9);
        assert_eq!(record.parsed_warnings().len(), 1);
    }

    #[test]
    fn test_record_from_success_outcome() {
        let outcome = TranslationOutcome::Success {
            target: TargetDocument::new("SimulationModel"),
            warnings: vec![],
        };

        let now = Utc::now();
        let path = PathBuf::from("in/house.xml");
        let record = OutcomeRecord::from_outcome(
            &path,
            &outcome,
            Some(&PathBuf::from("out/house.xml")),
            now,
            now,
            "worker-02",
        );

        assert_eq!(record.status, OutcomeStatus::Success);
        assert!(record.error_message.is_none());
        assert_eq!(record.output_path.as_deref(), Some("out/house.xml"));
        assert_eq!(record.warnings, "[]");
        assert_eq!(record.worker_id, "worker-02");
    }
}
