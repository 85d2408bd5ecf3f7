use async_trait::async_trait;

/// A remote model that turns a classification prompt into raw text.
///
/// The caller owns prompt construction and output parsing; providers only
/// move text over the wire.
#[async_trait]
pub trait NluProvider: Send + Sync {
    /// Service name, e.g. "gemini".
    fn name(&self) -> &str;

    /// Model id, e.g. "gemini-2.0-flash".
    fn id(&self) -> &str;

    async fn classify_remote(&self, system: &str, prompt: &str) -> anyhow::Result<String>;
}
