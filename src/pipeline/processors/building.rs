// ==========================================
// 建筑能耗模型转换系统 - Building 处理器
// ==========================================
// 阶段顺序: 第 1 阶段
// 职责: 建筑基本信息映射(类型/层数/年代/面积/朝向/人数)
//       并把楼面面积、层数写入派生值供后续阶段使用
// ==========================================

use crate::domain::document::{SourceDocument, TargetDocument};
use crate::domain::types::ErrorCategory;
use crate::mapping::MappingRegistry;
use crate::pipeline::error::{TranslationError, TranslationResult};
use crate::pipeline::processors::{map_document_field, Processor};
use crate::pipeline::state::ModelState;
use std::sync::Arc;
use tracing::debug;

/// 年代合理区间,超出只记警告
const YEAR_BUILT_RANGE: (i64, i64) = (1800, 2030);

/// 常见最大层数,超出只记警告
const MAX_TYPICAL_STOREYS: u32 = 4;

/// 人数缺失时的默认值
const DEFAULT_OCCUPANTS: i64 = 3;

pub struct BuildingProcessor {
    registry: Arc<MappingRegistry>,
}

impl BuildingProcessor {
    pub fn new(registry: Arc<MappingRegistry>) -> Self {
        Self { registry }
    }
}

impl Processor for BuildingProcessor {
    fn name(&self) -> &'static str {
        "building"
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Building
    }

    fn process(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        let category = self.category();
        let root = source.root();

        // === 建筑类型(必填,枚举映射) ===
        map_document_field(
            &self.registry,
            "building",
            "House/Specifications/BuildingType",
            root,
            target.root_mut(),
            state,
            category,
        )?;

        // === 层数 ===
        let storeys = map_document_field(
            &self.registry,
            "building",
            "House/Specifications/Storeys",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        if let Some(storeys) = storeys.as_deref().and_then(|s| s.parse::<u32>().ok()) {
            if storeys > MAX_TYPICAL_STOREYS {
                state.add_warning(
                    "UnusualStoreyCount",
                    format!("层数超出常见范围: {}", storeys),
                );
            }
            state.derived.storey_count = Some(storeys);
        }

        // === 建成年代(必填,区间外只记警告) ===
        let year = map_document_field(
            &self.registry,
            "building",
            "House/Specifications/YearBuilt",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        if let Some(year) = year.as_deref().and_then(|s| s.parse::<i64>().ok()) {
            if year < YEAR_BUILT_RANGE.0 || year > YEAR_BUILT_RANGE.1 {
                state.add_warning("YearBuiltOutOfRange", format!("建成年代异常: {}", year));
            }
        }

        // === 采暖楼面面积(可缺;缺失时由 Enclosure 阶段按基础占地推算) ===
        let floor_area = map_document_field(
            &self.registry,
            "building",
            "House/Specifications/HeatedFloorArea",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        match floor_area.as_deref().and_then(|s| s.parse::<f64>().ok()) {
            Some(area) if area <= 0.0 => {
                return Err(TranslationError::Validation {
                    error_type: "Validation_NonPositiveFloorArea".to_string(),
                    category,
                    message: format!("采暖楼面面积必须为正: {}", area),
                });
            }
            Some(area) => {
                state.derived.conditioned_floor_area_m2 = Some(area);
            }
            None => {
                state.add_warning(
                    "FloorAreaNotSpecified",
                    "源模型未声明采暖楼面面积,将由围护结构阶段推算",
                );
            }
        }

        // === 朝向(可缺,默认 south) ===
        map_document_field(
            &self.registry,
            "building",
            "House/Specifications/FrontOrientation",
            root,
            target.root_mut(),
            state,
            category,
        )?;

        // === 人数: 成人 + 儿童,映射表无法表达字段求和,处理器直接计算 ===
        let adults = root.i64_at("House/Occupancy/Adults");
        let children = root.i64_at("House/Occupancy/Children");
        let occupants = match (adults, children) {
            (None, None) => {
                state.add_warning(
                    "OccupancyDefaulted",
                    format!("源模型未声明人数,使用默认值 {}", DEFAULT_OCCUPANTS),
                );
                DEFAULT_OCCUPANTS
            }
            _ => adults.unwrap_or(0) + children.unwrap_or(0),
        };
        target
            .root_mut()
            .set_text_at("BuildingSummary/Occupants", occupants.to_string());

        debug!(
            storeys = ?state.derived.storey_count,
            floor_area = ?state.derived.conditioned_floor_area_m2,
            occupants,
            "建筑基本信息映射完成"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source_document;

    fn run_processor(xml: &str) -> (TranslationResult<()>, ModelState, TargetDocument) {
        let registry = Arc::new(MappingRegistry::load_embedded().unwrap());
        let source = parse_source_document(xml.as_bytes()).unwrap();
        let mut state = ModelState::new();
        let mut target = TargetDocument::new("SimulationModel");
        let result =
            BuildingProcessor::new(registry).process(&source, &mut state, &mut target);
        (result, state, target)
    }

    #[test]
    fn test_building_basic_mapping() {
        let xml = r#"<HomeEnergyModel>
            <House>
                <Specifications>
                    <BuildingType>SingleDetached</BuildingType>
                    <Storeys>2</Storeys>
                    <YearBuilt>1987</YearBuilt>
                    <HeatedFloorArea>186.5</HeatedFloorArea>
                    <FrontOrientation>Southwest</FrontOrientation>
                </Specifications>
                <Occupancy><Adults>2</Adults><Children>1</Children></Occupancy>
            </House>
        </HomeEnergyModel>"#;

        let (result, state, target) = run_processor(xml);
        result.unwrap();

        let root = target.root();
        assert_eq!(
            root.text_at("BuildingSummary/FacilityType"),
            Some("single-family detached")
        );
        assert_eq!(root.text_at("BuildingSummary/Storeys"), Some("2"));
        assert_eq!(root.text_at("BuildingSummary/Orientation"), Some("southwest"));
        assert_eq!(root.text_at("BuildingSummary/Occupants"), Some("3"));
        assert_eq!(state.derived.conditioned_floor_area_m2, Some(186.5));
        assert_eq!(state.derived.storey_count, Some(2));
    }

    #[test]
    fn test_missing_building_type_fails() {
        let xml = r#"<HomeEnergyModel>
            <House><Specifications><YearBuilt>1990</YearBuilt></Specifications></House>
        </HomeEnergyModel>"#;

        let (result, _, _) = run_processor(xml);
        assert!(matches!(
            result.unwrap_err(),
            TranslationError::MissingRequiredField { .. }
        ));
    }

    #[test]
    fn test_unknown_building_type_fails() {
        let xml = r#"<HomeEnergyModel>
            <House><Specifications>
                <BuildingType>Castle</BuildingType>
                <YearBuilt>1990</YearBuilt>
            </Specifications></House>
        </HomeEnergyModel>"#;

        let (result, _, _) = run_processor(xml);
        assert!(matches!(
            result.unwrap_err(),
            TranslationError::UnmappableEnum { .. }
        ));
    }

    #[test]
    fn test_year_out_of_range_is_warning_only() {
        let xml = r#"<HomeEnergyModel>
            <House><Specifications>
                <BuildingType>SingleDetached</BuildingType>
                <YearBuilt>1650</YearBuilt>
                <HeatedFloorArea>100</HeatedFloorArea>
            </Specifications></House>
        </HomeEnergyModel>"#;

        let (result, state, _) = run_processor(xml);
        result.unwrap();
        assert!(state.has_warning("YearBuiltOutOfRange"));
    }

    #[test]
    fn test_non_positive_floor_area_fails() {
        let xml = r#"<HomeEnergyModel>
            <House><Specifications>
                <BuildingType>SingleDetached</BuildingType>
                <YearBuilt>1990</YearBuilt>
                <HeatedFloorArea>-10</HeatedFloorArea>
            </Specifications></House>
        </HomeEnergyModel>"#;

        let (result, _, _) = run_processor(xml);
        let err = result.unwrap_err();
        assert_eq!(err.error_type(), "Validation_NonPositiveFloorArea");
    }

    #[test]
    fn test_missing_occupancy_defaults_with_warning() {
        let xml = r#"<HomeEnergyModel>
            <House><Specifications>
                <BuildingType>SingleDetached</BuildingType>
                <YearBuilt>1990</YearBuilt>
                <HeatedFloorArea>100</HeatedFloorArea>
            </Specifications></House>
        </HomeEnergyModel>"#;

        let (result, state, target) = run_processor(xml);
        result.unwrap();
        assert!(state.has_warning("OccupancyDefaulted"));
        assert_eq!(target.root().text_at("BuildingSummary/Occupants"), Some("3"));
    }
}
