// ==========================================
// 建筑能耗模型转换系统 - 映射规则与转换函数
// ==========================================
// 职责: 单条字段映射规则 + 值转换实现
// 约束: 规则在注册表加载时完成枚举表解析,运行期转换不再查注册表
// ==========================================

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// RSI(米制热阻) → R-value(英制热阻) 换算系数
pub const RSI_TO_RVALUE_FACTOR: f64 = 5.678263337;

// ==========================================
// 表文件的序列化结构（仅加载期使用）
// ==========================================

/// 枚举表条目（数组形式,重复键可在构建时检出）
#[derive(Debug, Clone, Deserialize)]
pub struct EnumEntrySpec {
    pub key: String,
    pub value: String,
}

/// 枚举表定义
#[derive(Debug, Clone, Deserialize)]
pub struct EnumTableSpec {
    pub name: String,
    pub entries: Vec<EnumEntrySpec>,
}

/// 转换规则声明
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversionSpec {
    Identity,
    Scale { factor: f64 },
    Offset { delta: f64 },
    RsiToRvalue,
    Enum { table: String },
    BoolToFlag,
}

/// 单条映射规则声明
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub field: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub target: String,
    pub conversion: ConversionSpec,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// 域映射表文件结构
#[derive(Debug, Clone, Deserialize)]
pub struct DomainTableSpec {
    pub domain: String,
    #[serde(default)]
    pub enums: Vec<EnumTableSpec>,
    pub rules: Vec<RuleSpec>,
}

// ==========================================
// 运行期转换错误
// ==========================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("值不是数字: {value}")]
    NotNumeric { value: String },

    #[error("枚举键不存在 (枚举 {table}): {key}")]
    UnknownEnumKey { table: String, key: String },

    #[error("值不是布尔标志: {value}")]
    NotBoolean { value: String },
}

// ==========================================
// Conversion - 已解析的转换函数
// ==========================================
// 枚举表在加载期解析为自带映射,运行期转换无共享状态,可无锁并发调用
#[derive(Debug, Clone)]
pub enum Conversion {
    /// 原样透传
    Identity,
    /// 数值缩放（单位换算,如 m2 → ft2）
    Scale { factor: f64 },
    /// 数值平移
    Offset { delta: f64 },
    /// RSI → R-value 热阻换算
    RsiToRValue,
    /// 枚举表替换
    Enum {
        table: String,
        map: HashMap<String, String>,
    },
    /// "true"/"false"/"1"/"0"/"yes"/"no" → "true"/"false"
    BoolToFlag,
}

/// 数值输出格式: 最多保留 4 位小数,去除无意义尾零
///
/// 同一输入永远得到同一字符串,保证目标文档字节级确定性
pub(crate) fn format_number(v: f64) -> String {
    let rounded = (v * 10_000.0).round() / 10_000.0;
    let mut s = format!("{:.4}", rounded);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

impl Conversion {
    /// 应用转换
    pub fn apply(&self, raw: &str) -> Result<String, ConversionError> {
        let raw = raw.trim();
        match self {
            Conversion::Identity => Ok(raw.to_string()),
            Conversion::Scale { factor } => {
                let v: f64 = raw.parse().map_err(|_| ConversionError::NotNumeric {
                    value: raw.to_string(),
                })?;
                Ok(format_number(v * factor))
            }
            Conversion::Offset { delta } => {
                let v: f64 = raw.parse().map_err(|_| ConversionError::NotNumeric {
                    value: raw.to_string(),
                })?;
                Ok(format_number(v + delta))
            }
            Conversion::RsiToRValue => {
                let v: f64 = raw.parse().map_err(|_| ConversionError::NotNumeric {
                    value: raw.to_string(),
                })?;
                Ok(format_number(v * RSI_TO_RVALUE_FACTOR))
            }
            Conversion::Enum { table, map } => {
                map.get(raw)
                    .cloned()
                    .ok_or_else(|| ConversionError::UnknownEnumKey {
                        table: table.clone(),
                        key: raw.to_string(),
                    })
            }
            Conversion::BoolToFlag => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" => Ok("true".to_string()),
                "false" | "0" | "no" | "n" => Ok("false".to_string()),
                _ => Err(ConversionError::NotBoolean {
                    value: raw.to_string(),
                }),
            },
        }
    }
}

// ==========================================
// MappingRule - 已解析的映射规则
// ==========================================

#[derive(Debug, Clone)]
pub struct MappingRule {
    /// 源字段路径（主名）
    pub field: String,
    /// 源字段别名（上游不同版本的列名差异）
    pub aliases: Vec<String>,
    /// 目标字段路径
    pub target: String,
    /// 值转换函数
    pub conversion: Conversion,
    /// 源字段缺失时的默认值（已是目标口径,不再过转换）
    pub default: Option<String>,
    /// 目标单位（仅作记录,随表声明）
    pub unit: Option<String>,
    /// 必填: 源缺失且无默认值时转换失败
    pub required: bool,
}

impl MappingRule {
    /// 规则是否匹配给定源字段（主名优先,别名其次）
    pub fn matches(&self, field: &str) -> bool {
        self.field == field || self.aliases.iter().any(|a| a == field)
    }

    /// 应用转换
    pub fn convert(&self, raw: &str) -> Result<String, ConversionError> {
        self.conversion.apply(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_trims() {
        assert_eq!(Conversion::Identity.apply("  abc ").unwrap(), "abc");
    }

    #[test]
    fn test_scale() {
        let c = Conversion::Scale { factor: 2.0 };
        assert_eq!(c.apply("3.5").unwrap(), "7");
        assert!(c.apply("abc").is_err());
    }

    #[test]
    fn test_rsi_to_rvalue() {
        let c = Conversion::RsiToRValue;
        // RSI 1.0 → R 5.6783（4 位小数截断）
        assert_eq!(c.apply("1.0").unwrap(), "5.6783");
    }

    #[test]
    fn test_enum_lookup() {
        let mut map = HashMap::new();
        map.insert("SingleDetached".to_string(), "single-family detached".to_string());
        let c = Conversion::Enum {
            table: "facility_type".to_string(),
            map,
        };
        assert_eq!(c.apply("SingleDetached").unwrap(), "single-family detached");

        let err = c.apply("Castle").unwrap_err();
        assert!(matches!(err, ConversionError::UnknownEnumKey { .. }));
    }

    #[test]
    fn test_bool_to_flag() {
        let c = Conversion::BoolToFlag;
        assert_eq!(c.apply("Yes").unwrap(), "true");
        assert_eq!(c.apply("0").unwrap(), "false");
        assert!(c.apply("maybe").is_err());
    }

    #[test]
    fn test_format_number_strips_trailing_zeros() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(7.5000), "7.5");
        assert_eq!(format_number(0.12344), "0.1234");
    }

    #[test]
    fn test_rule_matches_alias() {
        let rule = MappingRule {
            field: "Weather/Region".to_string(),
            aliases: vec!["Weather/Province".to_string()],
            target: "Site/WeatherRegion".to_string(),
            conversion: Conversion::Identity,
            default: None,
            unit: None,
            required: false,
        };
        assert!(rule.matches("Weather/Region"));
        assert!(rule.matches("Weather/Province"));
        assert!(!rule.matches("Weather/Station"));
    }
}
