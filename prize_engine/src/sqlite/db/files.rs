use sqlx::SqliteConnection;

use crate::db_types::StorageFile;

pub async fn insert_file(path: &str, conn: &mut SqliteConnection) -> Result<StorageFile, sqlx::Error> {
    sqlx::query_as("INSERT INTO storage_files (path) VALUES ($1) RETURNING *").bind(path).fetch_one(conn).await
}

/// Files no competition points at. Candidates for cleanup in the storage bucket.
pub async fn unused_files(conn: &mut SqliteConnection) -> Result<Vec<StorageFile>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM storage_files
            WHERE id NOT IN (SELECT image_file_id FROM competitions WHERE image_file_id IS NOT NULL)
            ORDER BY id
        "#,
    )
    .fetch_all(conn)
    .await
}
