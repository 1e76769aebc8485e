// ==========================================
// 建筑能耗模型转换系统 - 转换管道编排
// ==========================================
// 用途: 协调单文件的 解析 → 四阶段处理 → 装配 全流程
// 保证:
// - 处理器按固定顺序串行执行(后续阶段依赖前序派生值)
// - 任何阶段错误都归一化为 Failure,携带已累计警告
// - 全部变更发生在内存;落盘是独立的终步,仅在 Success 后执行
// ==========================================

use crate::domain::document::TargetDocument;
use crate::domain::outcome::TranslationOutcome;
use crate::domain::types::{ErrorCategory, TranslationMode};
use crate::mapping::MappingRegistry;
use crate::parser::{parse_source_document, parse_source_file, ParseError};
use crate::pipeline::assembly::AssemblyStage;
use crate::pipeline::processors::{
    BuildingProcessor, EnclosureProcessor, Processor, SystemsProcessor, WeatherProcessor,
};
use crate::pipeline::state::ModelState;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// 目标模型根元素名
pub const TARGET_ROOT: &str = "SimulationModel";

/// 目标模型 schema 版本
pub const TARGET_SCHEMA_VERSION: &str = "1.0";

// ==========================================
// TranslationPipeline - 单文件转换管道
// ==========================================

pub struct TranslationPipeline {
    mode: TranslationMode,
    processors: Vec<Box<dyn Processor>>,
    assembly: AssemblyStage,
}

impl TranslationPipeline {
    /// 创建转换管道
    ///
    /// # 参数
    /// - registry: 只读映射注册表(跨线程共享)
    /// - mode: 转换模式
    pub fn new(registry: Arc<MappingRegistry>, mode: TranslationMode) -> Self {
        // 处理器顺序固定: Building → Weather → Enclosure → Systems
        let processors: Vec<Box<dyn Processor>> = vec![
            Box::new(BuildingProcessor::new(registry.clone())),
            Box::new(WeatherProcessor::new(registry.clone())),
            Box::new(EnclosureProcessor::new(registry.clone())),
            Box::new(SystemsProcessor::new(registry)),
        ];

        Self {
            mode,
            processors,
            assembly: AssemblyStage::new(),
        }
    }

    /// 转换单个源模型文件
    ///
    /// 恰好返回一个结果;从不 panic 传播业务错误
    pub fn translate_file(&self, path: &Path) -> TranslationOutcome {
        match parse_source_file(path) {
            Ok(source) => self.run_stages(source),
            Err(err) => parse_failure(err),
        }
    }

    /// 转换源模型字节流(测试与内存批处理入口)
    pub fn translate_bytes(&self, bytes: &[u8]) -> TranslationOutcome {
        match parse_source_document(bytes) {
            Ok(source) => self.run_stages(source),
            Err(err) => parse_failure(err),
        }
    }

    /// 固定顺序执行处理器与装配
    fn run_stages(&self, source: crate::domain::document::SourceDocument) -> TranslationOutcome {
        let mut state = ModelState::new();
        let mut target = TargetDocument::new(TARGET_ROOT);
        target
            .root_mut()
            .set_attr("version", TARGET_SCHEMA_VERSION);

        for processor in &self.processors {
            debug!(stage = processor.name(), "执行转换阶段");
            if let Err(err) = processor.process(&source, &mut state, &mut target) {
                return TranslationOutcome::Failure {
                    error_type: err.error_type(),
                    error_category: err.category(),
                    message: err.to_string(),
                    warnings: state.into_warnings(),
                };
            }
        }

        debug!(stage = "assembly", "执行装配阶段");
        if let Err(err) = self.assembly.finalize(&mut target, &mut state, self.mode) {
            return TranslationOutcome::Failure {
                error_type: "Assembly_SchemaViolation".to_string(),
                error_category: ErrorCategory::Assembly,
                message: err.joined_message(),
                warnings: state.into_warnings(),
            };
        }

        TranslationOutcome::Success {
            target,
            warnings: state.into_warnings(),
        }
    }
}

/// 解析错误 → 失败结果归一化
fn parse_failure(err: ParseError) -> TranslationOutcome {
    let error_type = match &err {
        ParseError::FileNotFound(_) => "Parse_FileNotFound",
        ParseError::FileReadError(_) => "Parse_FileReadError",
        ParseError::InvalidEncoding(_) => "Parse_InvalidEncoding",
        ParseError::Malformed(_) => "Parse_MalformedXml",
        ParseError::MissingRoot => "Parse_MissingRoot",
        ParseError::UnexpectedRoot { .. } => "Parse_UnexpectedRoot",
    };

    TranslationOutcome::Failure {
        error_type: error_type.to_string(),
        error_category: ErrorCategory::Parse,
        message: err.to_string(),
        warnings: Vec::new(),
    }
}

/// 目标文档落盘(仅在 Success 后调用)
///
/// 先写同目录临时文件再原子改名,失败绝不留下半成品目标文件
pub fn write_target_document(target: &TargetDocument, path: &Path) -> std::io::Result<()> {
    let xml = target.to_xml_string()?;

    let tmp_path = path.with_extension("xml.tmp");
    if let Err(err) = std::fs::write(&tmp_path, xml.as_bytes()) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err);
    }
    if let Err(err) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::OutcomeStatus;

    /// 一份完整合法的源模型
    pub(crate) const VALID_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<HomeEnergyModel schemaVersion="2.1">
  <House>
    <Specifications>
      <BuildingType>SingleDetached</BuildingType>
      <Storeys>2</Storeys>
      <YearBuilt>1987</YearBuilt>
      <HeatedFloorArea>186.5</HeatedFloorArea>
      <FrontOrientation>South</FrontOrientation>
    </Specifications>
    <Occupancy><Adults>2</Adults><Children>2</Children></Occupancy>
  </House>
  <Weather>
    <Region>Ontario</Region>
    <Station>Toronto</Station>
    <Latitude>43.68</Latitude>
    <Longitude>-79.63</Longitude>
  </Weather>
  <Components>
    <Wall id="W1"><Label>Main wall</Label><Area>120</Area>
      <Construction><InsulationRValue>3.5</InsulationRValue></Construction></Wall>
    <Ceiling><Area>90</Area><Type>Attic</Type>
      <Construction><InsulationRValue>7.0</InsulationRValue></Construction></Ceiling>
    <Window><Area>4.2</Area><Orientation>South</Orientation>
      <Construction><UValue>2.0</UValue></Construction></Window>
    <Foundation><Type>Basement</Type><Area>93</Area></Foundation>
  </Components>
  <Systems>
    <Heating><Type>Furnace</Type><Fuel>NaturalGas</Fuel>
      <Efficiency>0.92</Efficiency><Capacity>18</Capacity></Heating>
    <Cooling><Type>CentralAC</Type><Efficiency>13</Efficiency></Cooling>
    <Ventilation><Type>HRV</Type><Efficiency>0.6</Efficiency></Ventilation>
    <HotWater><Fuel>Electric</Fuel><EnergyFactor>0.9</EnergyFactor></HotWater>
  </Systems>
</HomeEnergyModel>"#;

    fn pipeline(mode: TranslationMode) -> TranslationPipeline {
        let registry = Arc::new(MappingRegistry::load_embedded().unwrap());
        TranslationPipeline::new(registry, mode)
    }

    #[test]
    fn test_valid_document_succeeds() {
        let outcome = pipeline(TranslationMode::AsBuilt).translate_bytes(VALID_DOC.as_bytes());
        assert_eq!(outcome.status(), OutcomeStatus::Success);

        let TranslationOutcome::Success { target, .. } = outcome else {
            panic!("应为 Success");
        };
        let root = target.root();
        assert_eq!(root.attr("version"), Some("1.0"));
        assert_eq!(
            root.text_at("BuildingSummary/FacilityType"),
            Some("single-family detached")
        );
        assert_eq!(root.text_at("SimulationControl/Mode"), Some("as-built"));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let p = pipeline(TranslationMode::AsBuilt);
        let first = match p.translate_bytes(VALID_DOC.as_bytes()) {
            TranslationOutcome::Success { target, .. } => target.to_xml_string().unwrap(),
            other => panic!("应为 Success: {:?}", other.status()),
        };
        let second = match p.translate_bytes(VALID_DOC.as_bytes()) {
            TranslationOutcome::Success { target, .. } => target.to_xml_string().unwrap(),
            other => panic!("应为 Success: {:?}", other.status()),
        };
        assert_eq!(first, second, "同一输入必须得到字节级一致的输出");
    }

    #[test]
    fn test_parse_error_normalized_to_failure() {
        let outcome = pipeline(TranslationMode::AsBuilt).translate_bytes(b"<broken");
        let TranslationOutcome::Failure {
            error_type,
            error_category,
            ..
        } = outcome
        else {
            panic!("应为 Failure");
        };
        assert_eq!(error_type, "Parse_MalformedXml");
        assert_eq!(error_category, ErrorCategory::Parse);
    }

    #[test]
    fn test_stage_error_carries_warnings_so_far() {
        // Weather 缺 Region(第 2 阶段失败),第 1 阶段的警告必须保留
        let doc = r#"<HomeEnergyModel>
            <House><Specifications>
                <BuildingType>SingleDetached</BuildingType>
                <YearBuilt>1990</YearBuilt>
                <HeatedFloorArea>100</HeatedFloorArea>
            </Specifications></House>
        </HomeEnergyModel>"#;

        let outcome = pipeline(TranslationMode::AsBuilt).translate_bytes(doc.as_bytes());
        let TranslationOutcome::Failure {
            error_type,
            warnings,
            ..
        } = outcome
        else {
            panic!("应为 Failure");
        };
        assert_eq!(error_type, "Missing_RequiredField");
        // Building 阶段的 OccupancyDefaulted 警告保留在失败结果里
        assert!(warnings.iter().any(|w| w.code == "OccupancyDefaulted"));
    }

    #[test]
    fn test_write_target_document_atomic(){
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("house.xml");

        let outcome = pipeline(TranslationMode::AsBuilt).translate_bytes(VALID_DOC.as_bytes());
        let TranslationOutcome::Success { target, .. } = outcome else {
            panic!("应为 Success");
        };

        write_target_document(&target, &out_path).unwrap();
        assert!(out_path.exists());
        // 临时文件不残留
        assert!(!out_path.with_extension("xml.tmp").exists());

        let content = std::fs::read_to_string(&out_path).unwrap();
        assert!(content.contains("<SimulationModel version=\"1.0\">"));
    }

    #[test]
    fn test_reference_mode_changes_output() {
        let as_built = match pipeline(TranslationMode::AsBuilt).translate_bytes(VALID_DOC.as_bytes())
        {
            TranslationOutcome::Success { target, .. } => target.to_xml_string().unwrap(),
            _ => panic!("应为 Success"),
        };
        let reference =
            match pipeline(TranslationMode::Reference).translate_bytes(VALID_DOC.as_bytes()) {
                TranslationOutcome::Success { target, .. } => target.to_xml_string().unwrap(),
                _ => panic!("应为 Success"),
            };

        assert_ne!(as_built, reference);
        assert!(reference.contains("<Mode>reference</Mode>"));
    }
}
