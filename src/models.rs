/// An entry in the model picker. `id` is the identifier DashScope expects
/// in the request body; `name` is the human-facing label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
}

/// Model used when neither the config file nor the picker has chosen one.
pub const DEFAULT_MODEL: &str = "qwen-plus";

/// Fixed catalog of selectable Qwen models.
pub const AVAILABLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "qwen-turbo",
        name: "Qwen Turbo (快速)",
    },
    ModelInfo {
        id: "qwen-plus",
        name: "Qwen Plus (均衡)",
    },
    ModelInfo {
        id: "qwen-max",
        name: "Qwen Max (最强)",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_in_catalog() {
        assert!(AVAILABLE_MODELS.iter().any(|m| m.id == DEFAULT_MODEL));
    }

    #[test]
    fn catalog_ids_are_unique() {
        for (i, a) in AVAILABLE_MODELS.iter().enumerate() {
            for b in &AVAILABLE_MODELS[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }
}
