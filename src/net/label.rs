//! MPLS 标签与标签栈
//!
//! 标签栈是严格的 LIFO：只能在栈顶 push/pop。栈底标签的 BoS 位为 1，
//! 由 `LabelStack::push` 维护。

use crate::error::{Error, Result};

/// 每个标签在线路上占 4 字节
pub const MPLS_LABEL_BYTES: u32 = 4;
/// 20 位标签值的上限
pub const MAX_LABEL_VALUE: u32 = (1 << 20) - 1;
/// 0..=15 为保留标签
pub const MAX_RESERVED_LABEL: u32 = 15;
pub const DEFAULT_LABEL_TTL: u8 = 255;

/// 一个标签栈条目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label {
    /// 仿真内部给标签分配的编号
    pub id: u32,
    pub value: u32,
    /// Traffic class / EXP（3 位），携带 GoS 等级
    pub exp: u8,
    /// Bottom of stack
    pub bos: bool,
    pub ttl: u8,
}

impl Label {
    /// `value` 必须在 20 位以内
    pub fn new(id: u32, value: u32) -> Self {
        debug_assert!(value <= MAX_LABEL_VALUE, "label value {value} exceeds 20 bits");
        Self {
            id,
            value,
            exp: 0,
            bos: false,
            ttl: DEFAULT_LABEL_TTL,
        }
    }

    pub fn with_exp(mut self, exp: u8) -> Self {
        self.exp = exp & 0b111;
        self
    }

    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_reserved(&self) -> bool {
        self.value <= MAX_RESERVED_LABEL
    }
}

/// MPLS 标签栈（`labels` 的最后一个元素是栈顶）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelStack {
    labels: Vec<Label>,
}

impl LabelStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// 压栈；压入空栈的标签成为栈底，BoS 置 1，其余置 0。
    pub fn push(&mut self, mut label: Label) {
        label.bos = self.labels.is_empty();
        self.labels.push(label);
    }

    pub fn pop(&mut self) -> Option<Label> {
        self.labels.pop()
    }

    pub fn top(&self) -> Option<&Label> {
        self.labels.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Label> {
        self.labels.last_mut()
    }

    /// 交换栈顶标签值，返回旧值；空栈返回 None。
    pub fn swap_top(&mut self, value: u32) -> Option<u32> {
        debug_assert!(value <= MAX_LABEL_VALUE, "label value {value} exceeds 20 bits");
        let top = self.labels.last_mut()?;
        let old = top.value;
        top.value = value;
        Some(old)
    }

    /// 栈顶 TTL 减一，返回新的 TTL。
    pub fn decrement_top_ttl(&mut self) -> Option<u8> {
        let top = self.labels.last_mut()?;
        top.ttl = top.ttl.saturating_sub(1);
        Some(top.ttl)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    /// 从栈顶到栈底遍历
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Label> + ExactSizeIterator {
        self.labels.iter().rev()
    }

    pub fn size_bytes(&self) -> u32 {
        (self.labels.len() as u32).saturating_mul(MPLS_LABEL_BYTES)
    }
}

/// 顺序分配非保留的标签值，用完 20 位空间后报错而不是回绕。
#[derive(Debug, Clone)]
pub struct LabelAllocator {
    next: u32,
}

impl Default for LabelAllocator {
    fn default() -> Self {
        Self {
            next: MAX_RESERVED_LABEL + 1,
        }
    }
}

impl LabelAllocator {
    /// 从 `first` 开始分配；保留标签会被跳过
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: first.max(MAX_RESERVED_LABEL + 1),
        }
    }

    pub fn next_label(&mut self) -> Result<u32> {
        if self.next > MAX_LABEL_VALUE {
            return Err(Error::Config("MPLS label space exhausted".into()));
        }
        let label = self.next;
        self.next += 1;
        Ok(label)
    }
}
