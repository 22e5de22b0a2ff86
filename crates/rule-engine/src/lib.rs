//! 规则引擎
//!
//! 按声明式配置评估结构化记录，并在匹配时按路径改写记录：
//! - 路径寻址与写时复制的结构改写
//! - 多操作符条件评估
//! - AND/OR 规则集聚合，规则集合按配置顺序首个匹配胜出
//! - 按路径执行的转换管道

pub mod compiler;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod operators;
pub mod path;
pub mod transform;

pub use compiler::RuleCompiler;
pub use engine::{BODY_KEY, RuleEngine, TRANSFORM_KEY};
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use models::{Outcome, RuleCollection, RuleItem, RuleSet};
pub use operators::{LogicalOperator, Operator};
pub use path::{Path, Segment};
pub use transform::{Instruction, Transformer};
