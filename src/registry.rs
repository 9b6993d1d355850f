use serde::Serialize;

/// Static capability catalog advertised on `GET /models`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub supports_images: bool,
}

/// Model used when the caller does not pick one
pub const DEFAULT_MODEL_ID: &str = "llama-3.3-70b";

static MODELS: [ModelDescriptor; 4] = [
    ModelDescriptor {
        id: "llama-3.3-70b",
        name: "Llama 3.3 70B",
        supports_images: false,
    },
    ModelDescriptor {
        id: "xai-grok",
        name: "Grok",
        supports_images: false,
    },
    ModelDescriptor {
        id: "gemini-2.0-flash-exp",
        name: "Gemini 2.0 Flash",
        supports_images: true,
    },
    ModelDescriptor {
        id: "learnlm",
        name: "LearnLM Pro",
        supports_images: true,
    },
];

pub fn list_models() -> &'static [ModelDescriptor] {
    &MODELS
}

pub fn find_model(id: &str) -> Option<&'static ModelDescriptor> {
    MODELS.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_four_models() {
        assert_eq!(list_models().len(), 4);
    }

    #[test]
    fn test_default_model_is_text_only() {
        let model = find_model(DEFAULT_MODEL_ID).unwrap();
        assert!(!model.supports_images);
    }

    #[test]
    fn test_find_model_miss() {
        assert!(find_model("gpt-9").is_none());
    }

    #[test]
    fn test_image_capability_flags() {
        assert!(!find_model("xai-grok").unwrap().supports_images);
        assert!(find_model("gemini-2.0-flash-exp").unwrap().supports_images);
        assert!(find_model("learnlm").unwrap().supports_images);
    }

    #[test]
    fn test_descriptor_serializes_camel_case() {
        let value = serde_json::to_value(find_model("learnlm").unwrap()).unwrap();
        assert_eq!(value["id"], "learnlm");
        assert_eq!(value["name"], "LearnLM Pro");
        assert_eq!(value["supportsImages"], true);
    }
}
