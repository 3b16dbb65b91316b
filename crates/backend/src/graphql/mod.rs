use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, SimpleObject, ID};
use panorama_shared::{calc, models::Panorama};

use crate::storage::Storage;

// GraphQL output types

#[derive(SimpleObject)]
pub struct GqlPanorama {
    pub id: ID,
    pub title: String,
    pub image_url: String,
    pub north_offset: f64,
    /// Rotation of the sphere mesh about the vertical axis, in radians.
    pub sphere_rotation_radians: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Panorama> for GqlPanorama {
    fn from(p: Panorama) -> Self {
        GqlPanorama {
            id: ID(p.id.to_string()),
            sphere_rotation_radians: p.sphere_rotation(),
            title: p.title,
            image_url: p.image_url,
            north_offset: p.north_offset,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlStats {
    pub total_panoramas: u64,
    pub db_size_bytes: u64,
}

// Input types

#[derive(InputObject)]
pub struct CreatePanoramaInput {
    pub title: String,
    pub image_url: String,
    pub north_offset: Option<f64>,
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn panorama(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<GqlPanorama>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let panorama = storage.get_panorama(&id).map_err(async_graphql::Error::new)?;
        Ok(panorama.map(GqlPanorama::from))
    }

    async fn panoramas(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<GqlPanorama>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let panoramas = storage.list_panoramas().map_err(async_graphql::Error::new)?;
        Ok(panoramas.into_iter().map(GqlPanorama::from).collect())
    }

    async fn stats(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlStats> {
        let storage = ctx.data::<Arc<Storage>>()?;
        Ok(GqlStats {
            total_panoramas: storage.count_panoramas().map_err(async_graphql::Error::new)?,
            db_size_bytes: storage.db_size_bytes().map_err(async_graphql::Error::new)?,
        })
    }
}

// Mutation root

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_panorama(
        &self,
        ctx: &Context<'_>,
        input: CreatePanoramaInput,
    ) -> async_graphql::Result<GqlPanorama> {
        let storage = ctx.data::<Arc<Storage>>()?;
        if input.image_url.trim().is_empty() {
            return Err(async_graphql::Error::new("Image URL must not be empty"));
        }
        let north_offset = calc::validate_north_offset(input.north_offset.unwrap_or(0.0))
            .map_err(async_graphql::Error::new)?;

        let now = chrono::Utc::now().to_rfc3339();
        let mut panorama = Panorama::new(input.title, input.image_url, &now);
        panorama.north_offset = north_offset;

        storage
            .save_panorama(&panorama)
            .map_err(async_graphql::Error::new)?;
        tracing::info!(id = %panorama.id, "Created panorama");

        Ok(GqlPanorama::from(panorama))
    }

    /// Persist a calibrated north offset. `degrees` must already be in [0, 360).
    async fn set_north_offset(
        &self,
        ctx: &Context<'_>,
        id: ID,
        degrees: f64,
    ) -> async_graphql::Result<GqlPanorama> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let now = chrono::Utc::now().to_rfc3339();
        let panorama = storage
            .set_north_offset(&id, degrees, &now)
            .map_err(async_graphql::Error::new)?;
        Ok(GqlPanorama::from(panorama))
    }

    async fn delete_panorama(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let storage = ctx.data::<Arc<Storage>>()?;
        storage.delete_panorama(&id).map_err(async_graphql::Error::new)
    }
}

pub type Schema = async_graphql::Schema<QueryRoot, MutationRoot, async_graphql::EmptySubscription>;

pub fn build_schema(storage: Arc<Storage>) -> Schema {
    async_graphql::Schema::build(QueryRoot, MutationRoot, async_graphql::EmptySubscription)
        .data(storage)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_schema() -> (tempfile::TempDir, Arc<Storage>, Schema) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("gql.redb")).unwrap();
        let schema = build_schema(storage.clone());
        (dir, storage, schema)
    }

    async fn create(schema: &Schema, offset: Option<f64>) -> serde_json::Value {
        let offset = offset.map(|o| format!(", northOffset: {}", o)).unwrap_or_default();
        let query = format!(
            r#"mutation {{ createPanorama(input: {{ title: "Harbour", imageUrl: "/images/harbour.jpg"{} }}) {{ id northOffset sphereRotationRadians }} }}"#,
            offset
        );
        let resp = schema.execute(query).await;
        assert!(resp.errors.is_empty(), "{:?}", resp.errors);
        resp.data.into_json().unwrap()["createPanorama"].clone()
    }

    #[tokio::test]
    async fn test_create_defaults_offset_to_zero() {
        let (_dir, _storage, schema) = test_schema();
        let created = create(&schema, None).await;
        assert_eq!(created["northOffset"], 0.0);
        assert_eq!(created["sphereRotationRadians"], 0.0);
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range_offset() {
        let (_dir, storage, schema) = test_schema();
        let resp = schema
            .execute(r#"mutation { createPanorama(input: { title: "X", imageUrl: "/x.jpg", northOffset: 360.0 }) { id } }"#)
            .await;
        assert!(!resp.errors.is_empty());
        assert_eq!(storage.count_panoramas().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_north_offset_round_trip() {
        let (_dir, _storage, schema) = test_schema();
        let created = create(&schema, Some(40.0)).await;
        let id = created["id"].as_str().unwrap().to_string();

        let resp = schema
            .execute(format!(
                r#"mutation {{ setNorthOffset(id: "{}", degrees: 275.0) {{ northOffset }} }}"#,
                id
            ))
            .await;
        assert!(resp.errors.is_empty(), "{:?}", resp.errors);

        let resp = schema
            .execute(format!(r#"{{ panorama(id: "{}") {{ northOffset sphereRotationRadians }} }}"#, id))
            .await;
        let json = resp.data.into_json().unwrap();
        assert_eq!(json["panorama"]["northOffset"], 275.0);
        let rad = json["panorama"]["sphereRotationRadians"].as_f64().unwrap();
        assert!((rad - 275.0_f64.to_radians()).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_set_north_offset_surfaces_store_error() {
        let (_dir, _storage, schema) = test_schema();
        let created = create(&schema, None).await;
        let id = created["id"].as_str().unwrap().to_string();

        let resp = schema
            .execute(format!(
                r#"mutation {{ setNorthOffset(id: "{}", degrees: -5.0) {{ northOffset }} }}"#,
                id
            ))
            .await;
        assert_eq!(resp.errors.len(), 1);
        assert!(resp.errors[0].message.contains("[0, 360)"));
    }

    #[tokio::test]
    async fn test_missing_panorama_is_null() {
        let (_dir, _storage, schema) = test_schema();
        let resp = schema
            .execute(r#"{ panorama(id: "550e8400-e29b-41d4-a716-446655440000") { id } }"#)
            .await;
        assert!(resp.errors.is_empty());
        assert!(resp.data.into_json().unwrap()["panorama"].is_null());
    }

    #[tokio::test]
    async fn test_list_and_stats() {
        let (_dir, _storage, schema) = test_schema();
        create(&schema, None).await;
        create(&schema, Some(90.0)).await;

        let resp = schema
            .execute(r#"{ panoramas { id } stats { totalPanoramas dbSizeBytes } }"#)
            .await;
        let json = resp.data.into_json().unwrap();
        assert_eq!(json["panoramas"].as_array().unwrap().len(), 2);
        assert_eq!(json["stats"]["totalPanoramas"], 2);
    }

    #[tokio::test]
    async fn test_delete_panorama() {
        let (_dir, storage, schema) = test_schema();
        let created = create(&schema, None).await;
        let id = created["id"].as_str().unwrap().to_string();

        let resp = schema
            .execute(format!(r#"mutation {{ deletePanorama(id: "{}") }}"#, id))
            .await;
        assert_eq!(resp.data.into_json().unwrap()["deletePanorama"], true);
        assert_eq!(storage.count_panoramas().unwrap(), 0);
    }
}
