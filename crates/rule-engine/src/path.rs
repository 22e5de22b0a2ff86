//! 路径寻址
//!
//! 解析 `order.items[].payload` 形式的路径表达式，在嵌套 JSON 中定位值，
//! 并以写时复制的方式重建整棵结构、替换目标位置的值。
//!
//! 路径只支持两种段：对象键，以及 `[]` 序列展开标记。不支持下标或过滤。

use crate::error::{Result, RuleError};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// 序列展开标记
pub const DESCENT_MARKER: &str = "[]";

/// 路径段
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// 对象键
    Key(String),
    /// 展开到序列的每个元素
    Each,
}

impl Segment {
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Each => write!(f, "{}", DESCENT_MARKER),
        }
    }
}

/// 已解析的路径
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// 解析路径表达式
    ///
    /// 先按 `[]` 切分，再把每组按 `.` 切分（去掉首尾的点、忽略空键），
    /// 组与组之间插入展开标记。末尾的展开标记被丢弃。
    ///
    /// ```
    /// use rule_engine::Path;
    ///
    /// assert_eq!(Path::parse("a.b").keys(), vec!["a", "b"]);
    /// assert_eq!(Path::parse("foo.bar[]"), Path::parse("foo.bar"));
    /// ```
    pub fn parse(expr: &str) -> Self {
        let groups: Vec<&str> = expr.split(DESCENT_MARKER).collect();
        let last = groups.len().saturating_sub(1);

        let mut segments = Vec::new();
        for (i, group) in groups.iter().enumerate() {
            let before = segments.len();
            segments.extend(
                group
                    .trim_matches('.')
                    .split('.')
                    .filter(|key| !key.is_empty())
                    .map(Segment::key),
            );
            if i < last {
                segments.push(Segment::Each);
            } else if segments.len() == before && segments.last() == Some(&Segment::Each) {
                // 最后一组没有键，说明表达式以 `[]` 结尾
                segments.pop();
            }
        }

        Self { segments }
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// 从配置值构建路径：字符串按表达式解析，字符串数组视为已结构化的路径
    /// （元素 `"[]"` 或空数组表示展开标记）
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(expr) => Some(Self::parse(expr)),
            Value::Array(parts) => parts
                .iter()
                .map(|part| match part {
                    Value::String(s) if s == DESCENT_MARKER => Some(Segment::Each),
                    Value::String(s) => Some(Segment::key(s.as_str())),
                    Value::Array(a) if a.is_empty() => Some(Segment::Each),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Self::from_segments),
            _ => None,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// 只包含对象键的视图
    pub fn keys(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Key(key) => Some(key.as_str()),
                Segment::Each => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                Segment::Each => f.write_str(DESCENT_MARKER)?,
            }
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Path {
    fn from(expr: &str) -> Self {
        Self::parse(expr)
    }
}

impl From<String> for Path {
    fn from(expr: String) -> Self {
        Self::parse(&expr)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self::from_segments(segments)
    }
}

/// 在数据中定位路径指向的值
///
/// 每个键段都要求当前层是包含该键的对象，否则返回 `PathNotFound`，
/// 错误中带有完整路径和缺失的段。展开标记要求当前层是序列，
/// 返回第一个能解析剩余路径的元素中的值。
pub fn resolve<'a>(data: &'a Value, path: &Path) -> Result<&'a Value> {
    resolve_segments(data, path.segments()).map_err(|segment| RuleError::PathNotFound {
        path: path.to_string(),
        segment: segment.to_string(),
    })
}

fn resolve_segments<'a, 'p>(
    data: &'a Value,
    segments: &'p [Segment],
) -> std::result::Result<&'a Value, &'p Segment> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(data);
    };

    match head {
        Segment::Key(key) => match data {
            Value::Object(map) => match map.get(key) {
                Some(child) => resolve_segments(child, rest),
                None => Err(head),
            },
            _ => Err(head),
        },
        Segment::Each => {
            let Value::Array(items) = data else {
                return Err(head);
            };

            let mut failure = head;
            for item in items {
                match resolve_segments(item, rest) {
                    Ok(found) => return Ok(found),
                    Err(segment) => failure = segment,
                }
            }
            Err(failure)
        }
    }
}

/// 按路径重写数据，返回新结构
///
/// 先确认路径存在，然后递归重建整棵树：每一层都分配新的容器，
/// 仅在遍历路径与目标路径相等处调用 `update`，其余节点原样复制。
/// 展开标记会让 `update` 作用于该处序列的每个元素。输入数据不会被修改。
pub fn set_at<F>(data: &Value, path: &Path, mut update: F) -> Result<Value>
where
    F: FnMut(Value) -> Value,
{
    resolve(data, path)?;

    let mut walked = Vec::with_capacity(path.len());
    Ok(rebuild(data, &mut walked, path.segments(), &mut update))
}

fn rebuild<F>(node: &Value, walked: &mut Vec<Segment>, target: &[Segment], update: &mut F) -> Value
where
    F: FnMut(Value) -> Value,
{
    let value = match node {
        Value::Object(map) => {
            let mut rebuilt = Map::with_capacity(map.len());
            for (key, child) in map {
                walked.push(Segment::key(key.as_str()));
                rebuilt.insert(key.clone(), rebuild(child, walked, target, update));
                walked.pop();
            }
            Value::Object(rebuilt)
        }
        Value::Array(items) => {
            walked.push(Segment::Each);
            let rebuilt = items
                .iter()
                .map(|item| rebuild(item, walked, target, update))
                .collect();
            walked.pop();
            Value::Array(rebuilt)
        }
        scalar => scalar.clone(),
    };

    if walked.as_slice() == target {
        update(value)
    } else {
        value
    }
}
