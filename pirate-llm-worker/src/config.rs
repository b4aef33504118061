/// Tunables for the validation retry loop, per the alignment contract.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentConfig {
    pub min_confidence: f64,
    pub retry_threshold: f64,
    pub max_retries: u32,
    pub max_tokens: u32,
    /// Capped at 0.4 regardless of what a caller requests.
    pub temperature: f32,
    pub validator_llm_enabled: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.85,
            retry_threshold: 0.5,
            max_retries: 5,
            max_tokens: 4096,
            temperature: 0.2,
            validator_llm_enabled: false,
        }
    }
}

impl AlignmentConfig {
    pub fn effective_temperature(&self) -> f32 {
        self.temperature.min(0.4)
    }
}
