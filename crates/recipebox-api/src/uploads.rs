use std::path::Path;

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request, multipart::Field},
    http::header::CONTENT_TYPE,
};
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};
use uuid::Uuid;

use recipebox_types::api::RecipeInput;

use crate::error::ApiError;

/// 5 MB limit for recipe images
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Public URL prefix under which the upload directory is served.
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Multipart fields that carry JSON-encoded arrays.
const JSON_FIELDS: &[&str] = &["ingredients", "instructions", "tags"];
/// Multipart fields that carry whole numbers.
const NUMBER_FIELDS: &[&str] = &["prepTime", "cookTime", "servings"];

/// An accepted image that has not been written to disk yet.
pub struct ImageUpload {
    bytes: Bytes,
    extension: &'static str,
}

impl ImageUpload {
    /// Writes the image under a fresh name and returns its public path.
    pub async fn save(&self, dir: &Path) -> Result<String, ApiError> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            error!("Failed to create uploads directory {}: {}", dir.display(), e);
            ApiError::Internal(e.into())
        })?;

        let file_name = format!("{}.{}", Uuid::new_v4(), self.extension);
        let file_path = dir.join(&file_name);
        let mut file = tokio::fs::File::create(&file_path).await.map_err(|e| {
            error!("Failed to create file {}: {}", file_path.display(), e);
            ApiError::Internal(e.into())
        })?;
        file.write_all(&self.bytes).await.map_err(|e| {
            error!("Failed to write file {}: {}", file_path.display(), e);
            ApiError::Internal(e.into())
        })?;

        Ok(format!("{}/{}", UPLOADS_PREFIX, file_name))
    }
}

/// Removes a file previously returned by [`ImageUpload::save`]. Paths outside
/// the uploads prefix are left alone.
pub async fn discard(dir: &Path, public_path: &str) {
    let Some(file_name) = public_path
        .strip_prefix(UPLOADS_PREFIX)
        .and_then(|p| p.strip_prefix('/'))
        .filter(|name| !name.contains('/') && !name.contains(".."))
    else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(dir.join(file_name)).await {
        warn!("Failed to remove upload {}: {}", public_path, e);
    }
}

/// Recipe create/update body: either JSON or `multipart/form-data` with an
/// optional `image` file part.
pub struct RecipeForm {
    pub input: RecipeInput,
    pub image: Option<ImageUpload>,
}

impl<S> FromRequest<S> for RecipeForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation(e.body_text()))?;
            read_multipart(multipart).await
        } else {
            let Json(input) = Json::<RecipeInput>::from_request(req, state).await?;
            Ok(Self { input, image: None })
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<RecipeForm, ApiError> {
    let mut fields = Map::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "image" {
            match field.file_name() {
                // Browsers send an empty, nameless file part when nothing was picked.
                Some("") => continue,
                Some(_) => {
                    image = read_image(field).await?;
                    continue;
                }
                None => {}
            }
        }

        let text = field
            .text()
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        fields.insert(name.clone(), form_value(&name, text)?);
    }

    let input = serde_json::from_value(Value::Object(fields))
        .map_err(|e| ApiError::validation(format!("Invalid recipe form: {}", e)))?;
    Ok(RecipeForm { input, image })
}

async fn read_image(field: Field<'_>) -> Result<Option<ImageUpload>, ApiError> {
    let extension = match field.content_type() {
        Some("image/jpeg") => "jpg",
        Some("image/png") => "png",
        Some("image/gif") => "gif",
        Some("image/webp") => "webp",
        _ => return Err(ApiError::validation("Only image files are allowed")),
    };

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?;
    if bytes.is_empty() {
        return Ok(None);
    }
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::validation("Image cannot exceed 5 MB"));
    }

    Ok(Some(ImageUpload { bytes, extension }))
}

/// Converts one text form field into the JSON value the recipe input expects.
fn form_value(name: &str, text: String) -> Result<Value, ApiError> {
    if JSON_FIELDS.contains(&name) {
        return serde_json::from_str(&text)
            .map_err(|e| ApiError::validation(format!("Field '{}' must be a JSON array: {}", name, e)));
    }
    if NUMBER_FIELDS.contains(&name) {
        return text
            .trim()
            .parse::<u32>()
            .map(Value::from)
            .map_err(|_| ApiError::validation(format!("Field '{}' must be a whole number", name)));
    }
    Ok(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_values_are_typed_by_field() {
        assert_eq!(form_value("prepTime", " 15 ".into()).unwrap(), Value::from(15));
        assert_eq!(
            form_value("tags", r#"["quick","easy"]"#.into()).unwrap(),
            serde_json::json!(["quick", "easy"])
        );
        assert_eq!(form_value("title", "Soup".into()).unwrap(), Value::from("Soup"));
        assert!(form_value("servings", "four".into()).is_err());
        assert!(form_value("ingredients", "salt, pepper".into()).is_err());
    }

    #[tokio::test]
    async fn save_then_discard() {
        let dir = std::env::temp_dir().join(format!("recipebox-upload-{}", Uuid::new_v4()));
        let upload = ImageUpload { bytes: Bytes::from_static(b"\x89PNG"), extension: "png" };

        let path = upload.save(&dir).await.unwrap();
        assert!(path.starts_with("/uploads/") && path.ends_with(".png"));
        let on_disk = dir.join(path.trim_start_matches("/uploads/"));
        assert!(on_disk.exists());

        discard(&dir, &path).await;
        assert!(!on_disk.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
