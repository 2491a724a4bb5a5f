//! Readiness oracle for notebook source materials.

use async_trait::async_trait;

use crate::error::MaterialError;

/// Answers "which of these materials are fully processed?".
///
/// Implementations return the subset of `material_ids` that are ready, in
/// the caller's order. The plan builder treats any error as "all ready".
#[async_trait]
pub trait MaterialOracle: Send + Sync {
    async fn completed(
        &self,
        material_ids: &[String],
    ) -> std::result::Result<Vec<String>, MaterialError>;
}

/// An oracle that reports every material as ready.
pub struct AssumeAllReady;

#[async_trait]
impl MaterialOracle for AssumeAllReady {
    async fn completed(
        &self,
        material_ids: &[String],
    ) -> std::result::Result<Vec<String>, MaterialError> {
        Ok(material_ids.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn assume_all_ready_preserves_order() {
        let ids = vec!["m2".to_string(), "m1".to_string()];
        assert_eq!(AssumeAllReady.completed(&ids).await.unwrap(), ids);
    }
}
