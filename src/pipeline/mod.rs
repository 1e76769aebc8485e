// ==========================================
// 建筑能耗模型转换系统 - 转换管道层
// ==========================================
// 职责: 单文件转换的全部阶段与编排
// 红线: 阶段内不做任何落盘;处理器只通过 ModelState 传递跨阶段信息
// ==========================================

pub mod assembly;
pub mod error;
pub mod processors;
pub mod run;
pub mod state;

// 重导出核心类型
pub use assembly::AssemblyStage;
pub use error::{AssemblyError, TranslationError, TranslationResult};
pub use processors::{
    BuildingProcessor, EnclosureProcessor, Processor, SystemsProcessor, WeatherProcessor,
};
pub use run::{write_target_document, TranslationPipeline, TARGET_ROOT, TARGET_SCHEMA_VERSION};
pub use state::{DerivedValues, ModelState};
