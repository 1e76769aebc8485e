// ==========================================
// 建筑能耗模型转换系统 - 转换管道错误类型
// ==========================================
// 工具: thiserror 派生宏
// 语义分层:
// - 字段级可恢复异常 → ModelState 警告,从不抛出
// - TranslationError → 中断当前文件,不影响批处理
// - AssemblyError → 装配校验失败,携带全部违规项(便于大批量排障)
// ==========================================

use crate::domain::types::ErrorCategory;
use thiserror::Error;

/// 阶段级转换错误(单文件不可恢复)
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    #[error("必填字段缺失且无默认值 (域 {domain}): {field}")]
    MissingRequiredField {
        domain: String,
        field: String,
        category: ErrorCategory,
    },

    #[error("字段校验失败 ({error_type}): {message}")]
    Validation {
        error_type: String,
        category: ErrorCategory,
        message: String,
    },

    #[error("枚举值无法映射 (字段 {field}): {value}")]
    UnmappableEnum {
        field: String,
        value: String,
        category: ErrorCategory,
    },
}

impl TranslationError {
    /// 写入结果台账 error_type 列的稳定标识
    pub fn error_type(&self) -> String {
        match self {
            TranslationError::MissingRequiredField { .. } => {
                "Missing_RequiredField".to_string()
            }
            TranslationError::Validation { error_type, .. } => error_type.clone(),
            TranslationError::UnmappableEnum { .. } => "Translation_UnmappableEnum".to_string(),
        }
    }

    /// 错误所属的处理域
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::MissingRequiredField { category, .. } => *category,
            TranslationError::Validation { category, .. } => *category,
            TranslationError::UnmappableEnum { category, .. } => *category,
        }
    }
}

/// 装配校验错误,携带完整违规清单而非首个违规
#[derive(Error, Debug, Clone)]
#[error("目标模型装配校验失败: {} 项违规", violations.len())]
pub struct AssemblyError {
    pub violations: Vec<String>,
}

impl AssemblyError {
    /// 违规清单拼接为单条消息(写入台账 error_message 列)
    pub fn joined_message(&self) -> String {
        self.violations.join("; ")
    }
}

/// Result 类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;
