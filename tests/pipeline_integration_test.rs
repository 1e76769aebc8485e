// ==========================================
// 转换管道集成测试
// ==========================================
// 测试目标: 单文件转换的端到端语义(场景用例 + 确定性 + 失败零落盘)
// ==========================================


use bem_translator::domain::TranslationOutcome;
use bem_translator::{
    logging, ErrorCategory, MappingRegistry, OutcomeStatus, TranslationMode, TranslationPipeline,
};
use std::sync::Arc;

fn pipeline(mode: TranslationMode) -> TranslationPipeline {
    let registry = Arc::new(MappingRegistry::load_embedded().expect("映射表应能加载"));
    TranslationPipeline::new(registry, mode)
}

#[test]
fn test_scenario_no_cooling_produces_warning_and_marker() {
    logging::init_test();

    let doc = test_helpers::document_without_cooling();
    let outcome = pipeline(TranslationMode::AsBuilt).translate_bytes(doc.as_bytes());

    assert_eq!(outcome.status(), OutcomeStatus::Success, "无制冷应转换成功");
    assert!(
        outcome.warnings().iter().any(|w| w.code == "NoCoolingSpecified"),
        "应记录 NoCoolingSpecified 警告: {:?}",
        outcome.warnings()
    );

    let TranslationOutcome::Success { target, .. } = outcome else {
        unreachable!()
    };
    assert_eq!(
        target.root().text_at("Systems/Cooling/Type"),
        Some("none"),
        "目标模型应含无制冷标记"
    );
}

#[test]
fn test_scenario_negative_rvalue_fails_with_enclosure_category() {
    logging::init_test();

    let doc = test_helpers::document_negative_rvalue();
    let outcome = pipeline(TranslationMode::AsBuilt).translate_bytes(doc.as_bytes());

    let TranslationOutcome::Failure {
        error_type,
        error_category,
        ..
    } = outcome
    else {
        panic!("负 R 值应转换失败");
    };
    assert_eq!(error_type, "Validation_NegativeRValue");
    assert_eq!(error_category, ErrorCategory::Enclosure);
}

#[test]
fn test_missing_required_field_fails_and_writes_nothing() {
    logging::init_test();

    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let doc_path = test_helpers::write_document(
        dir.path(),
        "missing_heating.xml",
        &test_helpers::document_missing_heating_type(),
    );
    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).expect("创建输出目录失败");

    let outcome = pipeline(TranslationMode::AsBuilt).translate_file(&doc_path);

    let TranslationOutcome::Failure { error_type, .. } = outcome else {
        panic!("缺少必填字段应转换失败");
    };
    assert_eq!(error_type, "Missing_RequiredField");

    // 失败路径不经过落盘,输出目录保持为空
    let entries: Vec<_> = std::fs::read_dir(&out_dir)
        .expect("读取输出目录失败")
        .collect();
    assert!(entries.is_empty(), "失败不应写出任何目标文件字节");
}

#[test]
fn test_repeated_translation_is_byte_identical() {
    logging::init_test();

    let doc = test_helpers::valid_document(7);
    let p = pipeline(TranslationMode::AsBuilt);

    let serialize = |outcome: TranslationOutcome| -> String {
        match outcome {
            TranslationOutcome::Success { target, .. } => {
                target.to_xml_string().expect("序列化失败")
            }
            TranslationOutcome::Failure { message, .. } => panic!("应转换成功: {}", message),
        }
    };

    let first = serialize(p.translate_bytes(doc.as_bytes()));
    let second = serialize(p.translate_bytes(doc.as_bytes()));
    let third = serialize(p.translate_bytes(doc.as_bytes()));

    assert_eq!(first, second, "重复转换必须字节级一致");
    assert_eq!(second, third, "重复转换必须字节级一致");
}

#[test]
fn test_warnings_preserved_in_failure_outcome() {
    logging::init_test();

    // 人数缺失(Building 阶段警告) + 采暖类型缺失(Systems 阶段失败)
    let outcome = pipeline(TranslationMode::AsBuilt)
        .translate_bytes(test_helpers::document_missing_heating_type().as_bytes());

    let TranslationOutcome::Failure { warnings, .. } = outcome else {
        panic!("应转换失败");
    };
    assert!(
        warnings.iter().any(|w| w.code == "OccupancyDefaulted"),
        "失败前累计的警告应保留: {:?}",
        warnings
    );
}

#[test]
fn test_mode_affects_output() {
    logging::init_test();

    let doc = test_helpers::valid_document(1);

    let as_built = match pipeline(TranslationMode::AsBuilt).translate_bytes(doc.as_bytes()) {
        TranslationOutcome::Success { target, .. } => target.to_xml_string().unwrap(),
        _ => panic!("应转换成功"),
    };
    let reference = match pipeline(TranslationMode::Reference).translate_bytes(doc.as_bytes()) {
        TranslationOutcome::Success { target, .. } => target.to_xml_string().unwrap(),
        _ => panic!("应转换成功"),
    };

    assert!(as_built.contains("<Mode>as-built</Mode>"));
    assert!(reference.contains("<Mode>reference</Mode>"));
    assert!(
        reference.contains("<AchNatural>0.4</AchNatural>"),
        "基准模式应覆盖气密性"
    );
}
