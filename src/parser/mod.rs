// ==========================================
// 建筑能耗模型转换系统 - 源模型解析层
// ==========================================
// 职责: 原始字节 → 内存文档树
// 校验范围: 只做最小根级校验(编码、良构、根元素名),深层结构由处理器负责
// 语义: 解析失败是单文件可恢复失败,不中断批处理
// ==========================================

pub mod error;

pub use error::{ParseError, ParseResult};

use crate::domain::document::{DocNode, SourceDocument};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

/// 源模型文档期望的根元素名
pub const EXPECTED_ROOT: &str = "HomeEnergyModel";

/// 解析源模型文件
///
/// # 参数
/// - path: 源模型文件路径
///
/// # 返回
/// - `Err(ParseError)`: 文件不存在/不可读/格式非法,单文件失败
pub fn parse_source_file(path: &Path) -> ParseResult<SourceDocument> {
    if !path.exists() {
        return Err(ParseError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    parse_source_document(&bytes)
}

/// 解析源模型字节流
///
/// # 流程
/// 1. UTF-8 校验
/// 2. quick-xml 事件流构建文档树
/// 3. 根元素名校验
pub fn parse_source_document(bytes: &[u8]) -> ParseResult<SourceDocument> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| ParseError::InvalidEncoding(e.to_string()))?;

    let root = build_tree(content)?;

    if root.name != EXPECTED_ROOT {
        return Err(ParseError::UnexpectedRoot {
            expected: EXPECTED_ROOT.to_string(),
            found: root.name,
        });
    }

    Ok(SourceDocument::new(root))
}

/// 由 Start/Empty 事件构建节点（含属性）
fn node_from_start(e: &BytesStart<'_>) -> ParseResult<DocNode> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut node = DocNode::new(name);

    for attr in e.attributes() {
        let attr = attr.map_err(|err| ParseError::Malformed(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| ParseError::Malformed(err.to_string()))?
            .into_owned();
        node.set_attr(key, value);
    }

    Ok(node)
}

/// 把完成的节点挂到父节点,栈空时挂为根
fn attach(
    stack: &mut Vec<DocNode>,
    root: &mut Option<DocNode>,
    node: DocNode,
) -> ParseResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
        }
        None => {
            if root.is_some() {
                return Err(ParseError::Malformed("存在多个根元素".to_string()));
            }
            *root = Some(node);
        }
    }
    Ok(())
}

/// quick-xml 事件流 → 文档树
fn build_tree(content: &str) -> ParseResult<DocNode> {
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<DocNode> = Vec::new();
    let mut root: Option<DocNode> = None;
    // quick-xml 把实体引用(如 &amp;)拆成独立的 GeneralRef 事件,文本被切成多段。
    // 用缓冲区累积一个连续文本段(Text + GeneralRef),遇到结构事件再冲刷。
    let mut text_run = String::new();

    loop {
        // 冲刷当前累积的文本段到栈顶元素(遇到结构事件前调用)
        macro_rules! flush_text {
            () => {{
                let trimmed = text_run.trim();
                if !trimmed.is_empty() {
                    if let Some(top) = stack.last_mut() {
                        top.text = Some(trimmed.to_string());
                    }
                }
                text_run.clear();
            }};
        }

        match reader.read_event() {
            Ok(Event::Start(e)) => {
                flush_text!();
                let node = node_from_start(&e)?;
                stack.push(node);
            }
            Ok(Event::Empty(e)) => {
                flush_text!();
                let node = node_from_start(&e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(e)) => {
                let decoded = e
                    .decode()
                    .map_err(|err| ParseError::Malformed(err.to_string()))?;
                text_run.push_str(&decoded);
            }
            Ok(Event::GeneralRef(e)) => {
                let raw = format!(
                    "&{};",
                    e.decode()
                        .map_err(|err| ParseError::Malformed(err.to_string()))?
                );
                let resolved = quick_xml::escape::unescape(&raw)
                    .map_err(|err| ParseError::Malformed(err.to_string()))?;
                text_run.push_str(&resolved);
            }
            Ok(Event::End(_)) => {
                flush_text!();
                // 标签闭合匹配由 quick-xml 自身校验
                let node = match stack.pop() {
                    Some(node) => node,
                    None => {
                        return Err(ParseError::Malformed("闭合标签多于开始标签".to_string()))
                    }
                };
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Eof) => break,
            // 声明/注释/CDATA/处理指令: 与转换无关,跳过
            Ok(_) => {}
            Err(e) => return Err(ParseError::Malformed(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(ParseError::Malformed("文档在元素闭合前结束".to_string()));
    }

    root.ok_or(ParseError::MissingRoot)
}
