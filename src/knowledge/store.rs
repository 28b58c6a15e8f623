//! 向量存储：保存 (块, 向量)，按余弦相似度检索，可持久化为 JSON 索引文件

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::knowledge::{Chunk, KnowledgeError};

/// 检索结果
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    /// 相似度分数
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// 内存向量存储
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStore {
    entries: Vec<IndexedChunk>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chunk: Chunk, embedding: Vec<f32>) {
        self.entries.push(IndexedChunk { chunk, embedding });
    }

    /// 检索与 query 向量最相近的 k 个块（仅返回正相关的结果）
    pub fn search(&self, query: &[f32], k: usize) -> Vec<RetrievalResult> {
        let mut scored: Vec<(f32, &Chunk)> = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(query, &e.embedding), &e.chunk))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(score, chunk)| RetrievalResult {
                chunk: chunk.clone(),
                score,
            })
            .collect()
    }

    /// 删除指定来源的所有块
    pub fn remove_by_source(&mut self, source_id: &str) {
        self.entries.retain(|e| e.chunk.source_id != source_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn save(&self, path: &Path) -> Result<(), KnowledgeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// 余弦相似度
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
