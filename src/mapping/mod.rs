// ==========================================
// 建筑能耗模型转换系统 - 映射配置层
// ==========================================
// 职责: 声明式字段映射表的加载、校验与查询
// 红线: 注册表加载后只读;进程启动时加载一次,坏表直接终止进程
// ==========================================

pub mod error;
pub mod registry;
pub mod rule;

// 重导出核心类型
pub use error::{ConfigError, ConfigResult};
pub use registry::MappingRegistry;
pub use rule::{Conversion, ConversionError, MappingRule};
