// ==========================================
// 建筑能耗模型转换系统 - Weather 处理器
// ==========================================
// 阶段顺序: 第 2 阶段
// 职责: 气象区域/站点/坐标映射;缺失项按表默认值补齐并记警告
// ==========================================

use crate::domain::document::{SourceDocument, TargetDocument};
use crate::domain::types::ErrorCategory;
use crate::mapping::MappingRegistry;
use crate::pipeline::error::TranslationResult;
use crate::pipeline::processors::{map_document_field, Processor};
use crate::pipeline::state::ModelState;
use std::sync::Arc;
use tracing::debug;

pub struct WeatherProcessor {
    registry: Arc<MappingRegistry>,
}

impl WeatherProcessor {
    pub fn new(registry: Arc<MappingRegistry>) -> Self {
        Self { registry }
    }
}

impl Processor for WeatherProcessor {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Weather
    }

    fn process(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        let category = self.category();
        let root = source.root();

        // === 气象区域(必填) ===
        map_document_field(
            &self.registry,
            "weather",
            "Weather/Region",
            root,
            target.root_mut(),
            state,
            category,
        )?;

        // === 气象站(可缺,默认值) ===
        let station_missing = root.text_at("Weather/Station").is_none()
            && root.text_at("Weather/City").is_none();
        map_document_field(
            &self.registry,
            "weather",
            "Weather/Station",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        if station_missing {
            state.add_warning("WeatherStationDefaulted", "源模型未声明气象站,使用默认站点");
        }

        // === 坐标(可缺,默认值) ===
        let coords_missing = root.text_at("Weather/Latitude").is_none()
            || root.text_at("Weather/Longitude").is_none();
        map_document_field(
            &self.registry,
            "weather",
            "Weather/Latitude",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        map_document_field(
            &self.registry,
            "weather",
            "Weather/Longitude",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        if coords_missing {
            state.add_warning(
                "WeatherCoordinatesDefaulted",
                "源模型气象坐标不全,使用默认坐标",
            );
        }

        debug!("气象信息映射完成");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source_document;
    use crate::pipeline::error::TranslationError;

    fn run_processor(xml: &str) -> (TranslationResult<()>, ModelState, TargetDocument) {
        let registry = Arc::new(MappingRegistry::load_embedded().unwrap());
        let source = parse_source_document(xml.as_bytes()).unwrap();
        let mut state = ModelState::new();
        let mut target = TargetDocument::new("SimulationModel");
        let result = WeatherProcessor::new(registry).process(&source, &mut state, &mut target);
        (result, state, target)
    }

    #[test]
    fn test_weather_full_mapping() {
        let xml = r#"<HomeEnergyModel>
            <Weather>
                <Region>Ontario</Region>
                <Station>Toronto</Station>
                <Latitude>43.68</Latitude>
                <Longitude>-79.63</Longitude>
            </Weather>
        </HomeEnergyModel>"#;

        let (result, state, target) = run_processor(xml);
        result.unwrap();

        let root = target.root();
        assert_eq!(root.text_at("Site/WeatherRegion"), Some("Ontario"));
        assert_eq!(root.text_at("Site/WeatherStation"), Some("Toronto"));
        assert_eq!(root.text_at("Site/Latitude"), Some("43.68"));
        assert!(state.warnings().is_empty());
    }

    #[test]
    fn test_missing_region_fails() {
        let xml = r#"<HomeEnergyModel><Weather><Station>Toronto</Station></Weather></HomeEnergyModel>"#;
        let (result, _, _) = run_processor(xml);
        assert!(matches!(
            result.unwrap_err(),
            TranslationError::MissingRequiredField { .. }
        ));
    }

    #[test]
    fn test_missing_coordinates_defaulted_with_warning() {
        let xml = r#"<HomeEnergyModel><Weather><Region>Quebec</Region></Weather></HomeEnergyModel>"#;
        let (result, state, target) = run_processor(xml);
        result.unwrap();

        assert!(state.has_warning("WeatherStationDefaulted"));
        assert!(state.has_warning("WeatherCoordinatesDefaulted"));
        assert_eq!(target.root().text_at("Site/Latitude"), Some("45.0"));
        assert_eq!(target.root().text_at("Site/WeatherStation"), Some("Unknown"));
    }

    #[test]
    fn test_region_alias_province() {
        let xml = r#"<HomeEnergyModel><Weather><Province>Manitoba</Province></Weather></HomeEnergyModel>"#;
        let (result, _, target) = run_processor(xml);
        result.unwrap();
        assert_eq!(target.root().text_at("Site/WeatherRegion"), Some("Manitoba"));
    }
}
