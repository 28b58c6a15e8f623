//! 文档分块：固定大小、带重叠，优先在分隔符处断开（UTF-8 安全）

use serde::{Deserialize, Serialize};

/// 文档块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// 块 ID
    pub id: String,
    /// 原始文本
    pub text: String,
    /// 来源文档 ID
    pub source_id: String,
    /// 在原文档中的位置（字节偏移）
    pub offset: usize,
}

impl Chunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_id: source_id.into(),
            offset: 0,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// 分块策略
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// 目标块大小（字符数）
    pub chunk_size: usize,
    /// 块之间的重叠（字符数）
    pub chunk_overlap: usize,
    /// 分隔符优先级（从高到低）
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                ". ".to_string(),
                "! ".to_string(),
                "? ".to_string(),
                "。".to_string(),
                " ".to_string(),
            ],
        }
    }
}

/// 文档分块器
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// 将文档分割为块
    pub fn chunk(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let chunk_size = self.config.chunk_size.max(1);

        let mut current_idx = 0;
        let mut chunk_idx = 0;

        while current_idx < total_chars {
            let target_end = (current_idx + chunk_size).min(total_chars);
            let mut actual_end = target_end;

            // 不是文档末尾时，尝试在块后半段的分隔符处断开
            if target_end < total_chars {
                let slice: String = chars[current_idx..target_end].iter().collect();
                for sep in &self.config.separators {
                    if let Some(pos) = slice.rfind(sep.as_str()) {
                        let chars_to_sep = slice[..pos].chars().count() + sep.chars().count();
                        if chars_to_sep > chunk_size / 2 {
                            actual_end = current_idx + chars_to_sep;
                            break;
                        }
                    }
                }
            }

            let chunk_text: String = chars[current_idx..actual_end].iter().collect();
            let trimmed = chunk_text.trim();
            if !trimmed.is_empty() {
                let byte_offset: usize = chars[..current_idx].iter().map(|c| c.len_utf8()).sum();
                chunks.push(
                    Chunk::new(format!("{doc_id}_{chunk_idx}"), trimmed, doc_id).with_offset(byte_offset),
                );
                chunk_idx += 1;
            }

            if actual_end >= total_chars {
                break;
            }

            // 下一块回退 overlap 个字符，但必须前进
            let overlap = self.config.chunk_overlap.min(actual_end - current_idx);
            let next_start = actual_end - overlap;
            current_idx = if next_start > current_idx {
                next_start
            } else {
                actual_end
            };
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}
