//! 知识库：文档分块 -> 向量化 -> 存入向量索引；对外提供 retrieve(query) 检索能力
//!
//! 由检索工具包装后绑定给专员使用，编排核心本身不依赖它。

pub mod chunker;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::llm::{EmbeddingProvider, LlmError};

pub use chunker::{Chunk, Chunker, ChunkingConfig};
pub use store::{RetrievalResult, VectorStore};

/// 知识库错误
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No document content found")]
    EmptyDocument,
    #[error("Embedding failed: {0}")]
    Embedding(#[from] LlmError),
    #[error("Index format error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// 知识库：分块器 + 嵌入 + 向量存储
pub struct KnowledgeBase {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: RwLock<VectorStore>,
}

impl KnowledgeBase {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, chunking: ChunkingConfig) -> Self {
        Self::with_store(embedder, chunking, VectorStore::new())
    }

    pub fn with_store(
        embedder: Arc<dyn EmbeddingProvider>,
        chunking: ChunkingConfig,
        store: VectorStore,
    ) -> Self {
        Self {
            chunker: Chunker::new(chunking),
            embedder,
            store: RwLock::new(store),
        }
    }

    /// 从索引文件恢复
    pub async fn open(
        embedder: Arc<dyn EmbeddingProvider>,
        chunking: ChunkingConfig,
        index_path: &Path,
    ) -> Result<Self, KnowledgeError> {
        let store = VectorStore::load(index_path).await?;
        info!(path = %index_path.display(), chunks = store.len(), "knowledge index loaded");
        Ok(Self::with_store(embedder, chunking, store))
    }

    /// 索引文档：先删除同一文档的旧块，再分块、向量化、写入；返回写入的块数
    pub async fn index_document(&self, doc_id: &str, text: &str) -> Result<usize, KnowledgeError> {
        let chunks = self.chunker.chunk(doc_id, text);
        if chunks.is_empty() {
            return Err(KnowledgeError::EmptyDocument);
        }

        // 先在锁外完成全部嵌入，失败时不改动现有索引
        let mut embedded = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = self.embedder.embed(&chunk.text).await?;
            if embedding.is_empty() {
                continue;
            }
            embedded.push((chunk, embedding));
        }

        let mut store = self.store.write().await;
        store.remove_by_source(doc_id);
        let added = embedded.len();
        for (chunk, embedding) in embedded {
            store.add(chunk, embedding);
        }
        info!(doc_id, chunks = added, "document indexed");
        Ok(added)
    }

    /// 读取本地文本文件并索引，文档 ID 为文件名
    pub async fn ingest_file(&self, path: &Path) -> Result<usize, KnowledgeError> {
        let text = tokio::fs::read_to_string(path).await?;
        let doc_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.index_document(&doc_id, &text).await
    }

    /// 检索与 query 最相关的 k 个块，按相关度降序
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>, KnowledgeError> {
        let query_embedding = self.embedder.embed(query).await?;
        if query_embedding.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.read().await.search(&query_embedding, k))
    }

    pub async fn save(&self, index_path: &Path) -> Result<(), KnowledgeError> {
        self.store.read().await.save(index_path).await
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}
