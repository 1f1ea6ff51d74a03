use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// ── Records ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialCategory {
    Paint,
    Wood,
    Fabric,
    Tile,
    #[default]
    Other,
}

impl MaterialCategory {
    pub fn label(&self) -> &'static str {
        match self {
            MaterialCategory::Paint => "Paint",
            MaterialCategory::Wood => "Wood",
            MaterialCategory::Fabric => "Fabric",
            MaterialCategory::Tile => "Tile",
            MaterialCategory::Other => "Other",
        }
    }
}

/// Reference swatch the model can borrow a texture or colour from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,
    pub name: String,
    pub category: MaterialCategory,
    /// Data URL.
    pub image_base64: String,
    pub timestamp: u64,
}

impl Material {
    pub fn new(name: impl Into<String>, image_base64: String) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            category: MaterialCategory::Other,
            image_base64,
            timestamp: now_millis(),
        }
    }
}

/// One completed generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub original_image_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image_base64: Option<String>,
    pub prompt: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_material_id: Option<String>,
}

impl Project {
    /// Thumbnail source: the result when there is one, else the upload.
    pub fn preview_image(&self) -> &str {
        self.generated_image_base64
            .as_deref()
            .unwrap_or(&self.original_image_base64)
    }
}

/// Everything one generation request needs. Images are data URLs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub prompt: String,
    pub original_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_image: Option<String>,
}

// ── Helpers ─────────────────────────────────────────────────────────────────

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_uses_camel_case_and_skips_absent_fields() {
        let project = Project {
            id: "p1".into(),
            original_image_base64: "data:image/png;base64,AA==".into(),
            generated_image_base64: None,
            prompt: "Paint the walls sage green".into(),
            timestamp: 1_700_000_000_000,
            mask_image_base64: None,
            used_material_id: Some("m1".into()),
        };
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["originalImageBase64"], "data:image/png;base64,AA==");
        assert_eq!(json["usedMaterialId"], "m1");
        assert!(json.get("generatedImageBase64").is_none());
        assert!(json.get("maskImageBase64").is_none());
    }

    #[test]
    fn reads_records_written_by_the_web_app() {
        let json = r#"[{"id":"1712","name":"oak","category":"wood",
            "imageBase64":"data:image/jpeg;base64,/9j/","timestamp":1712}]"#;
        let materials: Vec<Material> = serde_json::from_str(json).unwrap();
        assert_eq!(materials[0].category, MaterialCategory::Wood);
        assert_eq!(materials[0].image_base64, "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn preview_prefers_generated_image() {
        let mut project = Project {
            id: new_id(),
            original_image_base64: "orig".into(),
            generated_image_base64: None,
            prompt: String::new(),
            timestamp: now_millis(),
            mask_image_base64: None,
            used_material_id: None,
        };
        assert_eq!(project.preview_image(), "orig");
        project.generated_image_base64 = Some("gen".into());
        assert_eq!(project.preview_image(), "gen");
    }

    #[test]
    fn new_material_defaults_to_other() {
        let m = Material::new("swatch", "data:image/png;base64,".into());
        assert_eq!(m.category, MaterialCategory::Other);
        assert_eq!(m.id.len(), 36);
    }
}
