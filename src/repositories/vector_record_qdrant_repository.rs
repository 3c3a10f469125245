use std::collections::HashMap;

use qdrant_client::{
    prelude::QdrantClient,
    qdrant::{
        self, point_id::PointIdOptions, points_selector::PointsSelectorOneOf,
        vectors_config::Config, Condition, CreateCollection, Distance, Filter, PointId,
        PointStruct, PointsIdsList, PointsSelector, SearchPoints, VectorParams, VectorsConfig,
    },
};
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::vector_record::{VectorRecord, VectorRecordPayload};
use crate::helper::error_chain_fmt;

/// Repository for content vector records persisted in Qdrant
///
/// One collection holds every user's records; every query carries an exact
/// `owner_id` payload filter so one user's vectors are never served to another.
/// Errors are propagated, not absorbed: the callers own the dual-write policy
/// between the primary store and this index.
pub struct VectorRecordQdrantRepository {
    client: QdrantClient,
    collection_name: String,
}

/// A vector-search hit: the record id and its similarity score
#[derive(Debug, Clone)]
pub struct ScoredRecordId {
    pub id: Uuid,
    pub score: f32,
}

impl VectorRecordQdrantRepository {
    #[tracing::instrument(
        name = "Initializing Qdrant and the associated collection",
        skip(client)
    )]
    pub async fn try_new(
        client: QdrantClient,
        collection_name: &str,
        collection_distance: &str,
        collection_vector_size: u64,
    ) -> Result<Self, VectorRecordQdrantRepositoryError> {
        let collection_distance = Distance::from_str_name(collection_distance).ok_or(
            VectorRecordQdrantRepositoryError::QdrantConfigurationError(format!(
                "Invalid Qdrant distance from configuration: {}",
                collection_distance
            )),
        )?;

        // Collection creation is not idempotent on the Qdrant side, tolerate
        // the collection already existing from a previous run
        match client
            .create_collection(&CreateCollection {
                collection_name: collection_name.to_string(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: collection_vector_size,
                        distance: collection_distance as i32,
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
        {
            Ok(_) => info!("Created Qdrant collection {}", collection_name),
            Err(error) => {
                // Qdrant client only returns anyhow errors for now
                if !error.to_string().contains("already exists") {
                    return Err(VectorRecordQdrantRepositoryError::QdrantError(
                        error.to_string(),
                    ));
                }
            }
        };

        Ok(Self {
            client,
            collection_name: collection_name.to_string(),
        })
    }

    /// Inserts or replaces one vector record
    #[tracing::instrument(name = "Upserting vector record to Qdrant", skip(self, record), fields(record_id = %record.id))]
    pub async fn upsert_record(
        &self,
        record: VectorRecord,
    ) -> Result<(), VectorRecordQdrantRepositoryError> {
        self.client
            .upsert_points(&self.collection_name, vec![PointStruct::from(record)], None)
            .await
            .map_err(|e| VectorRecordQdrantRepositoryError::QdrantError(e.to_string()))?;

        info!("Saved vector record");
        Ok(())
    }

    /// Top-k nearest records by similarity, restricted to one owner
    #[tracing::instrument(name = "Querying nearest vector records", skip(self, vector))]
    pub async fn query_nearest(
        &self,
        vector: &[f32],
        top_k: u64,
        owner_id: Uuid,
    ) -> Result<Vec<ScoredRecordId>, VectorRecordQdrantRepositoryError> {
        let owner_filter = Filter::all([Condition::matches("owner_id", owner_id.to_string())]);

        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection_name.clone(),
                vector: vector.to_vec(),
                limit: top_k,
                filter: Some(owner_filter),
                with_payload: Some(true.into()),
                ..Default::default()
            })
            .await
            .map_err(|e| VectorRecordQdrantRepositoryError::QdrantError(e.to_string()))?;

        let hits = response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point.id.and_then(point_id_to_uuid)?;
                Some(ScoredRecordId {
                    id,
                    score: point.score,
                })
            })
            .collect();

        Ok(hits)
    }

    /// Removes one record; tolerant of the id not existing
    #[tracing::instrument(name = "Deleting vector record from Qdrant", skip(self))]
    pub async fn delete_record(
        &self,
        record_id: Uuid,
    ) -> Result<(), VectorRecordQdrantRepositoryError> {
        let selector = PointsSelector {
            points_selector_one_of: Some(PointsSelectorOneOf::Points(PointsIdsList {
                ids: vec![record_id.to_string().into()],
            })),
        };

        self.client
            .delete_points(&self.collection_name, &selector, None)
            .await
            .map_err(|e| VectorRecordQdrantRepositoryError::QdrantError(e.to_string()))?;

        info!("Deleted vector record");
        Ok(())
    }
}

fn point_id_to_uuid(point_id: PointId) -> Option<Uuid> {
    match point_id.point_id_options {
        Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(&id).ok(),
        _ => None,
    }
}

#[derive(thiserror::Error)]
pub enum VectorRecordQdrantRepositoryError {
    #[error("Error from Qdrant: {0}")]
    QdrantError(String),

    #[error("Error from Qdrant config: {0}")]
    QdrantConfigurationError(String),
}

impl std::fmt::Debug for VectorRecordQdrantRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<VectorRecord> for PointStruct {
    fn from(record: VectorRecord) -> Self {
        Self {
            id: Some(record.id.to_string().into()),
            vectors: Some(record.vector.into()),
            payload: record.payload.into(),
        }
    }
}

impl From<VectorRecordPayload> for HashMap<String, qdrant::Value> {
    fn from(payload: VectorRecordPayload) -> Self {
        HashMap::from([
            (
                "owner_id".into(),
                qdrant::Value::from(payload.owner_id.to_string()),
            ),
            ("title".into(), qdrant::Value::from(payload.title)),
            (
                "content_type".into(),
                qdrant::Value::from(payload.content_type),
            ),
            ("timestamp".into(), qdrant::Value::from(payload.timestamp)),
            ("snippet".into(), qdrant::Value::from(payload.snippet)),
            ("image_url".into(), qdrant::Value::from(payload.image_url)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_uuid_point_id_converts_back() {
        let id = Uuid::new_v4();
        let point_id = PointId::from(id.to_string());

        assert_eq!(point_id_to_uuid(point_id), Some(id));
    }

    #[test]
    fn a_numeric_point_id_is_not_a_record_id() {
        let point_id = PointId::from(42u64);

        assert_eq!(point_id_to_uuid(point_id), None);
    }

    #[test]
    fn the_payload_carries_every_metadata_field() {
        let payload = VectorRecordPayload {
            owner_id: Uuid::new_v4(),
            title: "t".into(),
            content_type: "url".into(),
            timestamp: "2024-01-01 00:00:00 UTC".into(),
            snippet: "s".into(),
            image_url: "".into(),
        };

        let map: HashMap<String, qdrant::Value> = payload.into();

        for key in [
            "owner_id",
            "title",
            "content_type",
            "timestamp",
            "snippet",
            "image_url",
        ] {
            assert!(map.contains_key(key), "missing payload key {}", key);
        }
    }
}
