use anyhow::{anyhow, bail, Result};
use arrow_array::{Float32Array, Int32Array, RecordBatch, StringArray, FixedSizeListArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use advisor_core::traits::{VectorMetadata, VectorStore};
use advisor_core::types::{Channel, ChunkRef, SearchHit};

use crate::schema::{build_vectors_schema, vector_dim, VECTORS_TABLE};
use crate::table::{ensure_table, int32_column, open_db, single_batch_reader, sql_literal, string_column};

/// Cosine-similarity vector store. The vector width is fixed when the table
/// is first created; opening it with a different width fails.
pub struct LanceVectorStore {
    conn: Connection,
    dim: usize,
    write_lock: Mutex<()>,
}

impl LanceVectorStore {
    pub async fn open(uri: &str, dim: usize) -> Result<Self> {
        let conn = open_db(uri).await?;
        ensure_table(&conn, VECTORS_TABLE, build_vectors_schema(dim as i32)).await?;
        let table = conn.open_table(VECTORS_TABLE).execute().await?;
        let schema = table.schema().await?;
        let existing = vector_dim(&schema);
        if existing != Some(dim as i32) {
            bail!("vector table at {} has dimension {:?}, embedder produces {}", uri, existing, dim);
        }
        Ok(Self { conn, dim, write_lock: Mutex::new(()) })
    }

    pub fn dim(&self) -> usize { self.dim }

    async fn table(&self) -> Result<Table> {
        Ok(self.conn.open_table(VECTORS_TABLE).execute().await?)
    }

    fn to_record_batch(&self, namespace: &str, key: &ChunkRef, vector: &[f32], metadata: &VectorMetadata) -> Result<RecordBatch> {
        let vectors = vec![Some(vector.iter().map(|&x| Some(x)).collect::<Vec<_>>())];
        Ok(RecordBatch::try_new(
            build_vectors_schema(self.dim as i32),
            vec![
                Arc::new(StringArray::from(vec![namespace.to_string()])),
                Arc::new(StringArray::from(vec![key.key()])),
                Arc::new(StringArray::from(vec![metadata.source.clone()])),
                Arc::new(Int32Array::from(vec![metadata.chunk_index as i32])),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), self.dim as i32)),
            ],
        )?)
    }
}

fn namespace_filter(namespace: &str) -> String {
    format!("namespace = {}", sql_literal(namespace))
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn upsert(&self, namespace: &str, key: &ChunkRef, vector: &[f32], metadata: &VectorMetadata) -> Result<bool> {
        if vector.len() != self.dim {
            bail!("vector for {} has dimension {}, store expects {}", key, vector.len(), self.dim);
        }
        let batch = self.to_record_batch(namespace, key, vector, metadata)?;
        let _guard = self.write_lock.lock().await;
        let t = self.table().await?;
        let mut mi = t.merge_insert(&["namespace", "key"]);
        mi.when_not_matched_insert_all();
        let res = mi.execute(single_batch_reader(batch)).await?;
        Ok(res.num_inserted_rows > 0)
    }

    async fn search(&self, namespace: &str, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query_vector.len() != self.dim {
            bail!("query vector has dimension {}, store expects {}", query_vector.len(), self.dim);
        }
        if k == 0 { return Ok(Vec::new()); }
        let t = self.table().await?;
        let filter = namespace_filter(namespace);
        if t.count_rows(Some(filter.clone())).await? == 0 { return Ok(Vec::new()); }
        let mut stream = t
            .vector_search(query_vector.to_vec())?
            .distance_type(DistanceType::Cosine)
            .only_if(filter)
            .limit(k)
            .execute()
            .await?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let keys = string_column(&batch, "key")?;
            let sources = string_column(&batch, "source")?;
            let indices = int32_column(&batch, "chunk_index")?;
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| anyhow!("vector search returned no _distance column"))?;
            for i in 0..batch.num_rows() {
                let chunk_ref = ChunkRef::parse_key(keys.value(i))
                    .unwrap_or_else(|| ChunkRef::new(sources.value(i), indices.value(i) as usize));
                hits.push(SearchHit { chunk_ref, score: 1.0 - distances.value(i), channel: Channel::Vector });
            }
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        debug!("vector search in '{}' -> {} hits", namespace, hits.len());
        Ok(hits)
    }

    async fn contains(&self, namespace: &str, key: &ChunkRef) -> Result<bool> {
        let filter = format!("{} AND key = {}", namespace_filter(namespace), sql_literal(&key.key()));
        Ok(self.table().await?.count_rows(Some(filter)).await? > 0)
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        Ok(self.table().await?.count_rows(Some(namespace_filter(namespace))).await?)
    }
}
