// ==========================================
// 建筑能耗模型转换系统 - 领域类型定义
// ==========================================
// 序列化格式: 与结果数据库列值保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 转换模式 (Translation Mode)
// ==========================================
// AsBuilt: 按实测模型转换
// Reference: 基准模式,装配阶段用基准值覆盖部分字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranslationMode {
    AsBuilt,
    Reference,
}

impl Default for TranslationMode {
    fn default() -> Self {
        TranslationMode::AsBuilt
    }
}

impl fmt::Display for TranslationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationMode::AsBuilt => write!(f, "AS_BUILT"),
            TranslationMode::Reference => write!(f, "REFERENCE"),
        }
    }
}

// ==========================================
// 处理结果状态 (Outcome Status)
// ==========================================
// 每个输入文件恰好产生一行结果记录,状态二选一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Success,
    Failure,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Success => write!(f, "Success"),
            OutcomeStatus::Failure => write!(f, "Failure"),
        }
    }
}

impl OutcomeStatus {
    /// 从数据库列值解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Success" => Some(OutcomeStatus::Success),
            "Failure" => Some(OutcomeStatus::Failure),
            _ => None,
        }
    }
}

// ==========================================
// 警告级别 (Warning Level)
// ==========================================
// Warning: 可恢复的领域异常(值超出常见范围、可选段缺失)
// Error: 已记录但未中断转换的错误(add_error 只记录,不抛出)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningLevel {
    Warning,
    Error,
}

impl fmt::Display for WarningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningLevel::Warning => write!(f, "WARNING"),
            WarningLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ==========================================
// 部件类型 (Component Type)
// ==========================================
// ModelState 按部件类型维护严格递增的编号序列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    Wall,
    Ceiling,
    Window,
    Foundation,
    HeatingSystem,
    CoolingSystem,
    VentilationSystem,
    WaterHeatingSystem,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentType::Wall => write!(f, "WALL"),
            ComponentType::Ceiling => write!(f, "CEILING"),
            ComponentType::Window => write!(f, "WINDOW"),
            ComponentType::Foundation => write!(f, "FOUNDATION"),
            ComponentType::HeatingSystem => write!(f, "HEATING_SYSTEM"),
            ComponentType::CoolingSystem => write!(f, "COOLING_SYSTEM"),
            ComponentType::VentilationSystem => write!(f, "VENTILATION_SYSTEM"),
            ComponentType::WaterHeatingSystem => write!(f, "WATER_HEATING_SYSTEM"),
        }
    }
}

// ==========================================
// 错误类别 (Error Category)
// ==========================================
// 写入结果记录的 error_category 列,用于批量失败归因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    Parse,
    Building,
    Weather,
    Enclosure,
    Systems,
    Assembly,
    Io,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Parse => write!(f, "Parse"),
            ErrorCategory::Building => write!(f, "Building"),
            ErrorCategory::Weather => write!(f, "Weather"),
            ErrorCategory::Enclosure => write!(f, "Enclosure"),
            ErrorCategory::Systems => write!(f, "Systems"),
            ErrorCategory::Assembly => write!(f, "Assembly"),
            ErrorCategory::Io => write!(f, "Io"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
