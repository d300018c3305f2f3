//! Well-known model ids served by local vLLM / Ollama deployments

use crate::protocol::Model;

/// DeepSeek R1 distilled, 7B
pub const DEEPSEEK_R1_7B: &str = "deepseek-r1:7b";

pub const QWEN2_5_LATEST: &str = "qwen2.5:latest";

pub const GEMMA3_LATEST: &str = "gemma3:latest";

/// All well-known models
pub fn known_models() -> Vec<Model> {
    [DEEPSEEK_R1_7B, QWEN2_5_LATEST, GEMMA3_LATEST]
        .into_iter()
        .map(Model::from)
        .collect()
}
