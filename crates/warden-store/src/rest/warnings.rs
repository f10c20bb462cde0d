//! `WarningStore` over the remote `warnings` table.

use super::{eq_filter, RestStore, WARNINGS_TABLE};
use async_trait::async_trait;
use reqwest::Method;
use warden_core::{error::WardenError, traits::WarningStore, warning::WarningRecord};

#[async_trait]
impl WarningStore for RestStore {
    async fn get_warning(&self, user_id: &str) -> Result<Option<WarningRecord>, WardenError> {
        let query = format!(
            "select=user_id,warn_count,created_at,updated_at&{}",
            eq_filter("user_id", user_id)
        );
        let url = self.table_url(WARNINGS_TABLE, &query);
        let resp = self
            .send(self.request(Method::GET, &url), "warnings get")
            .await?;
        let rows: Vec<WarningRecord> = resp
            .json()
            .await
            .map_err(|e| WardenError::Store(format!("warnings get: failed to parse response: {e}")))?;
        Ok(rows.into_iter().next())
    }

    async fn save_warning(&self, record: &WarningRecord) -> Result<(), WardenError> {
        let url = self.table_url(WARNINGS_TABLE, "on_conflict=user_id");
        let builder = self
            .request(Method::POST, &url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(std::slice::from_ref(record));
        self.send(builder, "warnings save").await?;
        Ok(())
    }

    async fn delete_warning(&self, user_id: &str) -> Result<(), WardenError> {
        let url = self.table_url(WARNINGS_TABLE, &eq_filter("user_id", user_id));
        self.send(self.request(Method::DELETE, &url), "warnings delete")
            .await?;
        Ok(())
    }
}
