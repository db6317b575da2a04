use anyhow::Result;
use arrow_array::{Int32Array, RecordBatch, StringArray, TimestampMillisecondArray};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use advisor_core::traits::ChunkStore;
use advisor_core::types::{Chunk, ChunkRef};

use crate::schema::{build_chunks_schema, CHUNKS_TABLE};
use crate::table::{ensure_table, int32_column, open_db, single_batch_reader, sql_literal, string_column};

fn content_hash(s: &str) -> String { blake3::hash(s.as_bytes()).to_hex().to_string() }

fn chunks_from_batch(batch: &RecordBatch) -> Result<Vec<Chunk>> {
    let sources = string_column(batch, "source")?;
    let indices = int32_column(batch, "chunk_index")?;
    let contents = string_column(batch, "content")?;
    Ok((0..batch.num_rows()).map(|i| Chunk::new(sources.value(i), indices.value(i) as usize, contents.value(i))).collect())
}

/// Lance table of chunk records. Writes are insert-only: a chunk id that is
/// already present is never overwritten.
pub struct LanceChunkStore {
    conn: Connection,
    write_lock: Mutex<()>,
}

impl LanceChunkStore {
    pub async fn open(uri: &str) -> Result<Self> {
        let conn = open_db(uri).await?;
        ensure_table(&conn, CHUNKS_TABLE, build_chunks_schema()).await?;
        Ok(Self { conn, write_lock: Mutex::new(()) })
    }

    async fn table(&self) -> Result<Table> {
        Ok(self.conn.open_table(CHUNKS_TABLE).execute().await?)
    }

    fn to_record_batch(chunk: &Chunk) -> Result<RecordBatch> {
        Ok(RecordBatch::try_new(
            build_chunks_schema(),
            vec![
                Arc::new(StringArray::from(vec![chunk.chunk_ref().key()])),
                Arc::new(StringArray::from(vec![chunk.source.clone()])),
                Arc::new(Int32Array::from(vec![chunk.index as i32])),
                Arc::new(StringArray::from(vec![chunk.text.clone()])),
                Arc::new(StringArray::from(vec![content_hash(&chunk.text)])),
                Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
            ],
        )?)
    }
}

#[async_trait]
impl ChunkStore for LanceChunkStore {
    async fn contains(&self, chunk_ref: &ChunkRef) -> Result<bool> {
        let t = self.table().await?;
        let n = t.count_rows(Some(format!("id = {}", sql_literal(&chunk_ref.key())))).await?;
        Ok(n > 0)
    }

    async fn insert(&self, chunk: &Chunk) -> Result<bool> {
        let batch = Self::to_record_batch(chunk)?;
        let _guard = self.write_lock.lock().await;
        let t = self.table().await?;
        let mut mi = t.merge_insert(&["id"]);
        mi.when_not_matched_insert_all();
        let res = mi.execute(single_batch_reader(batch)).await?;
        if res.num_inserted_rows == 0 { debug!("chunk {} already recorded", chunk.chunk_ref()); }
        Ok(res.num_inserted_rows > 0)
    }

    async fn get_many(&self, refs: &[ChunkRef]) -> Result<Vec<Chunk>> {
        if refs.is_empty() { return Ok(Vec::new()); }
        let ids: Vec<String> = refs.iter().map(|r| sql_literal(&r.key())).collect();
        let t = self.table().await?;
        let mut stream = t.query().only_if(format!("id IN ({})", ids.join(", "))).execute().await?;
        let mut found: HashMap<ChunkRef, Chunk> = HashMap::new();
        while let Some(batch) = stream.try_next().await? {
            for chunk in chunks_from_batch(&batch)? {
                found.insert(chunk.chunk_ref(), chunk);
            }
        }
        Ok(refs.iter().filter_map(|r| found.remove(r)).collect())
    }

    async fn scan(&self) -> Result<Vec<Chunk>> {
        let t = self.table().await?;
        let mut stream = t.query().execute().await?;
        let mut all = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            all.extend(chunks_from_batch(&batch)?);
        }
        all.sort_by(|a, b| a.chunk_ref().cmp(&b.chunk_ref()));
        Ok(all)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table().await?.count_rows(None).await?)
    }
}
