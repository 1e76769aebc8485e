// ==========================================
// 建筑能耗模型转换系统 - 解析层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 语义: 全部是单文件可恢复失败,不中断批处理
// ==========================================

use thiserror::Error;

/// 解析层错误类型
#[derive(Error, Debug)]
pub enum ParseError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    // ===== 内容相关错误 =====
    #[error("编码非法(期望 UTF-8): {0}")]
    InvalidEncoding(String),

    #[error("XML 格式非法: {0}")]
    Malformed(String),

    #[error("缺少根元素")]
    MissingRoot,

    #[error("根元素不符: 期望 {expected}, 实际 {found}")]
    UnexpectedRoot { expected: String, found: String },
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::FileReadError(err.to_string())
    }
}

/// Result 类型别名
pub type ParseResult<T> = Result<T, ParseError>;
